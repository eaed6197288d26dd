use asl_loss::{asymmetric_loss, AsymmetricLossConfig, Loss, LossRegistry, Matrix, Reduction};
use rand::{rngs::StdRng, SeedableRng};

fn main() -> asl_loss::Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let y_true = Matrix::random_labels(4, 6, 0.25, &mut rng);
    let y_pred = Matrix::random(4, 6, &mut rng);

    // Functional form
    let loss_fn = asymmetric_loss(4.0, 1.0, Some(0.05), Some(1e-8));
    for (i, v) in loss_fn(&y_true, &y_pred)?.iter().enumerate() {
        println!("example {i}: asl = {v:.6}");
    }

    // Object form, persisted and restored through the registry
    let loss = AsymmetricLossConfig { reduction: Reduction::Mean, ..Default::default() }.build()?;
    let persisted = loss.to_json();
    println!("persisted: {persisted}");

    let registry = LossRegistry::with_builtin();
    let restored = registry.deserialize(&persisted)?;
    println!("{} mean loss = {:?}", restored.name(), restored.evaluate(&y_true, &y_pred)?.as_scalar());

    let bce = registry.build("binary_crossentropy", Default::default())?;
    println!("{} per example = {:?}", bce.name(), bce.call(&y_true, &y_pred)?);

    Ok(())
}
