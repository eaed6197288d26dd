use approx::assert_abs_diff_eq;
use asl_loss::{
    asymmetric_loss, AsymmetricLossConfig, BinaryCrossEntropy, Loss, Matrix, SigmoidAsymmetricLoss,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Probabilities kept away from 0 and 1 so no epsilon floor is involved.
fn interior_predictions(rng: &mut StdRng, rows: usize, cols: usize) -> Matrix {
    Matrix::random(rows, cols, rng).map(|x| 0.02 + 0.96 * x)
}

#[test]
fn zero_gamma_without_clip_is_summed_bce() {
    let mut rng = StdRng::seed_from_u64(1);
    let y_true = Matrix::random_labels(8, 5, 0.4, &mut rng);
    let y_pred = interior_predictions(&mut rng, 8, 5);

    let asl = asymmetric_loss(0.0, 0.0, None, Some(1e-8));
    let bce = BinaryCrossEntropy::default();

    let asl_out = asl(&y_true, &y_pred).unwrap();
    let bce_out = bce.call(&y_true, &y_pred).unwrap();
    for (a, b) in asl_out.iter().zip(bce_out.iter()) {
        assert_abs_diff_eq!(*a, b * 5.0, epsilon = 1e-9);
    }
}

#[test]
fn confident_correct_predictions_vanish_faster_with_focusing() {
    let y_true = Matrix::from_data(vec![vec![1.0, 0.0, 1.0]]).unwrap();
    let y_pred = Matrix::from_data(vec![vec![0.95, 0.05, 0.9]]).unwrap();

    let plain = asymmetric_loss(0.0, 0.0, None, None)(&y_true, &y_pred).unwrap()[0];
    let mut previous = plain;
    for gamma in [1.0, 2.0, 4.0] {
        let focused = asymmetric_loss(gamma, gamma, None, None)(&y_true, &y_pred).unwrap()[0];
        assert!(focused > 0.0);
        assert!(focused < previous, "gamma {gamma}: {focused} >= {previous}");
        previous = focused;
    }
    assert!(previous < plain * 0.01);
}

#[test]
fn hard_examples_keep_full_weight() {
    // pt ≈ 0 for every label, so (1 - pt)^γ ≈ 1.
    let y_true = Matrix::from_data(vec![vec![1.0, 0.0]]).unwrap();
    let y_pred = Matrix::from_data(vec![vec![0.001, 0.999]]).unwrap();

    let plain = asymmetric_loss(0.0, 0.0, None, None)(&y_true, &y_pred).unwrap()[0];
    let focused = asymmetric_loss(4.0, 1.0, None, None)(&y_true, &y_pred).unwrap()[0];
    assert_abs_diff_eq!(focused / plain, 1.0, epsilon = 5e-3);
}

#[test]
fn repeated_calls_are_identical() {
    let mut rng = StdRng::seed_from_u64(2);
    let y_true = Matrix::random_labels(6, 10, 0.3, &mut rng);
    let y_pred = Matrix::random(6, 10, &mut rng);

    let loss = SigmoidAsymmetricLoss::default();
    let first = loss.call(&y_true, &y_pred).unwrap();
    let second = loss.call(&y_true, &y_pred).unwrap();
    assert_eq!(first, second);
}

#[test]
fn larger_clip_never_increases_negative_loss() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..20 {
        // Negative-leaning predictions on all-negative labels, with one entry
        // far enough from 0 that the shifted minimum stays below 1.
        let mut y_pred = Matrix::random(3, 4, &mut rng).map(|x| 0.4 * x);
        y_pred.data[0][0] = 0.45;
        let y_true = Matrix::zeros(3, 4);

        let mut previous = vec![f64::INFINITY; 3];
        for clip in [0.0, 0.01, 0.05, 0.1, 0.2, 0.4] {
            let out = asymmetric_loss(4.0, 1.0, Some(clip), None)(&y_true, &y_pred).unwrap();
            for (row, (now, before)) in out.iter().zip(previous.iter()).enumerate() {
                assert!(*now <= before + 1e-15, "clip {clip}, row {row}: {now} > {before}");
            }
            previous = out;
        }
    }
}

#[test]
fn label_polarity_symmetry() {
    let mut rng = StdRng::seed_from_u64(4);
    let y_true = Matrix::random_labels(5, 7, 0.5, &mut rng);
    let y_pred = interior_predictions(&mut rng, 5, 7);
    let (gamma_neg, gamma_pos) = (rng.gen_range(0.5..4.0), rng.gen_range(0.0..2.0));

    let original = asymmetric_loss(gamma_neg, gamma_pos, None, None)(&y_true, &y_pred).unwrap();
    let flipped = asymmetric_loss(gamma_pos, gamma_neg, None, None)(
        &y_true.map(|y| 1.0 - y),
        &y_pred.map(|p| 1.0 - p),
    )
    .unwrap();

    for (a, b) in original.iter().zip(flipped.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asl.json");

    let config = AsymmetricLossConfig { gamma_neg: 2.0, clip: None, from_logits: true, ..Default::default() };
    config.save_json(&path).unwrap();
    let loaded = AsymmetricLossConfig::load_json(&path).unwrap();

    assert_eq!(loaded.from_logits, config.from_logits);
    assert_eq!(loaded.clip, None);
    assert_eq!(loaded.reduction, config.reduction);
    assert_abs_diff_eq!(loaded.gamma_neg, 2.0);
    assert_abs_diff_eq!(loaded.epsilon, config.epsilon, epsilon = 1e-20);
}

#[test]
fn partial_config_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{"gamma_pos": 0.5, "reduction": "sum"}"#).unwrap();

    let loss = AsymmetricLossConfig::load_json(&path).unwrap().build().unwrap();
    assert_eq!(loss.params().gamma_neg, 4.0);
    assert_eq!(loss.params().gamma_pos, 0.5);
    assert_eq!(loss.reduction(), asl_loss::Reduction::Sum);
}
