pub mod math;
pub mod activation;
pub mod error;
pub mod loss;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use error::{AslError, Result};
pub use loss::{
    asymmetric_loss, AsymmetricLossConfig, AsymmetricParams, BinaryCrossEntropy,
    BinaryCrossEntropyConfig, Loss, LossRegistry, LossValue, Reduction, SigmoidAsymmetricLoss,
};
