// Evaluates the asymmetric loss on a small demonstration batch.
//
//   asl-loss [config.json]
//
// The optional argument is an `AsymmetricLossConfig` JSON file; missing
// fields fall back to their defaults. Set RUST_LOG=debug for construction logs.
use asl_loss::{AsymmetricLossConfig, Loss, LossValue, Matrix, Result};
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("loading loss config from {path}");
            AsymmetricLossConfig::load_json(&path)?
        }
        None => AsymmetricLossConfig::default(),
    };
    let loss = config.build()?;

    let y_true = Matrix::from_data(vec![
        vec![1.0, 0.0, 0.0, 1.0],
        vec![0.0, 1.0, 0.0, 0.0],
    ])?;
    let y_pred = Matrix::from_data(vec![
        vec![0.9, 0.1, 0.3, 0.6],
        vec![0.2, 0.4, 0.02, 0.7],
    ])?;

    println!("{} {}", loss.name(), serde_json::Value::Object(loss.get_config()));
    let value = loss.evaluate(&y_true, &y_pred)?;
    let label = match value {
        LossValue::PerExample(_) => "example",
        LossValue::Scalar(_) => loss.reduction().as_str(),
    };
    for (i, v) in value.into_vec().iter().enumerate() {
        println!("{label} {i}: loss = {v:.6}");
    }

    Ok(())
}
