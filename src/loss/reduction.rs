use serde::{Serialize, Deserialize};

/// How per-example losses are collapsed into the value a training step sees.
///
/// - `None` — keep one loss per example.
/// - `Sum`  — total over the batch.
/// - `Mean` — total divided by the batch size (`sum_over_batch_size` is
///   accepted as an alias when deserializing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    None,
    Sum,
    #[serde(alias = "sum_over_batch_size")]
    Mean,
}

impl Reduction {
    pub fn as_str(self) -> &'static str {
        match self {
            Reduction::None => "none",
            Reduction::Sum  => "sum",
            Reduction::Mean => "mean",
        }
    }

    pub fn apply(self, per_example: Vec<f64>) -> LossValue {
        match self {
            Reduction::None => LossValue::PerExample(per_example),
            Reduction::Sum  => LossValue::Scalar(per_example.iter().sum()),
            Reduction::Mean => {
                if per_example.is_empty() {
                    return LossValue::Scalar(0.0);
                }
                let n = per_example.len() as f64;
                LossValue::Scalar(per_example.iter().sum::<f64>() / n)
            }
        }
    }
}

/// Result of evaluating a loss under its reduction policy.
#[derive(Debug, Clone, PartialEq)]
pub enum LossValue {
    PerExample(Vec<f64>),
    Scalar(f64),
}

impl LossValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            LossValue::Scalar(v) => Some(*v),
            LossValue::PerExample(_) => None,
        }
    }

    /// Per-example values; a reduced result becomes a single-element vector.
    pub fn into_vec(self) -> Vec<f64> {
        match self {
            LossValue::PerExample(v) => v,
            LossValue::Scalar(v) => vec![v],
        }
    }
}
