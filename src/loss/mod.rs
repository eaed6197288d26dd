pub mod asymmetric;
pub mod bce;
pub mod reduction;
pub mod registry;

pub use asymmetric::{asymmetric_loss, AsymmetricLossConfig, AsymmetricParams, SigmoidAsymmetricLoss};
pub use bce::{BinaryCrossEntropy, BinaryCrossEntropyConfig};
pub use reduction::{LossValue, Reduction};
pub use registry::LossRegistry;

use log::trace;
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::math::matrix::Matrix;

/// Common interface for configured losses.
///
/// `y_true` and `y_pred` are `[batch, num_labels]` tensors of equal shape.
pub trait Loss: Send + Sync {
    /// Key under which the loss is registered in a `LossRegistry`.
    fn class_name(&self) -> &'static str;

    /// Display name of this configured instance.
    fn name(&self) -> &str;

    fn reduction(&self) -> Reduction;

    /// Unreduced loss, one value per example.
    fn call(&self, y_true: &Matrix, y_pred: &Matrix) -> Result<Vec<f64>>;

    /// Gradient of the unreduced loss with respect to every element of `y_pred`.
    fn derivative(&self, y_true: &Matrix, y_pred: &Matrix) -> Result<Matrix>;

    /// Every configuration field, enough to rebuild the loss through its factory.
    fn get_config(&self) -> Map<String, Value>;

    /// `call` followed by the reduction policy.
    fn evaluate(&self, y_true: &Matrix, y_pred: &Matrix) -> Result<LossValue> {
        let per_example = self.call(y_true, y_pred)?;
        trace!("{}: reducing {} example losses ({})", self.name(), per_example.len(), self.reduction().as_str());
        Ok(self.reduction().apply(per_example))
    }

    /// Persisted form read back by `LossRegistry::deserialize`.
    fn to_json(&self) -> Value {
        json!({
            "class_name": self.class_name(),
            "config": Value::Object(self.get_config()),
        })
    }
}
