use log::{debug, trace};
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::activation::activation::ActivationFunction;
use crate::error::Result;
use crate::loss::asymmetric::DEFAULT_EPSILON;
use crate::loss::reduction::Reduction;
use crate::loss::Loss;
use crate::math::matrix::{clip_by_value, Matrix};

/// Registry key of `BinaryCrossEntropy`.
pub const CLASS_NAME: &str = "binary_crossentropy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryCrossEntropyConfig {
    pub from_logits: bool,
    pub epsilon: f64,
    pub reduction: Reduction,
    pub name: Option<String>,
}

impl Default for BinaryCrossEntropyConfig {
    fn default() -> Self {
        BinaryCrossEntropyConfig {
            from_logits: false,
            epsilon: DEFAULT_EPSILON,
            reduction: Reduction::None,
            name: None,
        }
    }
}

/// Binary cross-entropy averaged over the label axis:
///   -mean(y·log(p) + (1-y)·log(1-p)),  p clamped to [ε, 1-ε]
#[derive(Debug, Clone, Default)]
pub struct BinaryCrossEntropy {
    config: BinaryCrossEntropyConfig,
}

impl BinaryCrossEntropy {
    pub fn new(config: BinaryCrossEntropyConfig) -> Self {
        debug!("built {} (epsilon={})", config.name.as_deref().unwrap_or(CLASS_NAME), config.epsilon);
        BinaryCrossEntropy { config }
    }

    pub fn from_config(config: Map<String, Value>) -> Result<BinaryCrossEntropy> {
        let config: BinaryCrossEntropyConfig = serde_json::from_value(Value::Object(config))?;
        Ok(BinaryCrossEntropy::new(config))
    }

    fn activation(&self) -> ActivationFunction {
        ActivationFunction::for_inputs(self.config.from_logits)
    }
}

impl Loss for BinaryCrossEntropy {
    fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    fn name(&self) -> &str {
        self.config.name.as_deref().unwrap_or(CLASS_NAME)
    }

    fn reduction(&self) -> Reduction {
        self.config.reduction
    }

    fn call(&self, y_true: &Matrix, y_pred: &Matrix) -> Result<Vec<f64>> {
        let eps = self.config.epsilon;
        let activation = self.activation();
        let elementwise = y_true.zip_map(y_pred, |y, x| {
            let p = clip_by_value(activation.function(x), eps, 1.0 - eps);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })?;

        trace!("{}: evaluated batch of {}x{}", self.name(), y_pred.rows, y_pred.cols);
        if elementwise.cols == 0 {
            return Ok(vec![0.0; elementwise.rows]);
        }
        let n = elementwise.cols as f64;
        Ok(elementwise.sum_rows().into_iter().map(|s| s / n).collect())
    }

    /// Per-output gradient: (p - y) / (p·(1 - p)) / n, zero where p was clamped.
    fn derivative(&self, y_true: &Matrix, y_pred: &Matrix) -> Result<Matrix> {
        let eps = self.config.epsilon;
        let activation = self.activation();
        let n = y_pred.cols as f64;
        y_true.zip_map(y_pred, |y, x| {
            let p = activation.function(x);
            if p < eps || p > 1.0 - eps {
                return 0.0;
            }
            (p - y) / (p * (1.0 - p)) / n * activation.derivative(x)
        })
    }

    fn get_config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("name".into(), self.config.name.clone().map_or(Value::Null, Value::from));
        config.insert("reduction".into(), Value::from(self.config.reduction.as_str()));
        config.insert("from_logits".into(), Value::from(self.config.from_logits));
        config.insert("epsilon".into(), Value::from(self.config.epsilon));
        config
    }
}
