use serde::{Serialize, Deserialize};
use std::f64::consts::E;

/// Maps raw model outputs onto the probability scale the losses consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    Identity,
}

impl ActivationFunction {
    /// `Sigmoid` when the inputs are logits, `Identity` when they are
    /// already probabilities.
    pub fn for_inputs(from_logits: bool) -> Self {
        if from_logits { ActivationFunction::Sigmoid } else { ActivationFunction::Identity }
    }

    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::Identity => x,
        }
    }

    /// Element-wise derivative of the activation.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            },
            ActivationFunction::Identity => 1.0,
        }
    }
}
