//! Asymmetric loss (ASL) for multi-label classification.
//!
//! ASL reweights binary cross-entropy so that easy negatives are suppressed
//! harder than easy positives:
//!
//! ```text
//!   xs_pos = p
//!   xs_neg = clip_by_value(1 - p + m, min(1 - p + m), 1)      (when m > 0)
//!   L      = -Σ_labels [y·ln(xs_pos) + (1-y)·ln(xs_neg)] · (1 - pt)^γ
//!   pt     = y·xs_pos + (1-y)·xs_neg
//!   γ      = γ+·y + γ-·(1-y)
//! ```
//!
//! Both probabilities are floored at ε before the logarithm. The clamp
//! bounds taken from the tensor itself (`min(...)` above and the `max`
//! ceilings of the ε floor) are kept for parity with the reference numbers.
//! The ceilings never bind; the `min` floor binds only when every shifted
//! negative in the batch exceeds 1, in which case all of them land on it and
//! the gradient flows to the entry holding the minimum.

use std::path::Path;

use log::{debug, trace};
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::activation::activation::ActivationFunction;
use crate::error::{AslError, Result};
use crate::loss::reduction::Reduction;
use crate::loss::Loss;
use crate::math::matrix::Matrix;

/// Registry key of `SigmoidAsymmetricLoss`.
pub const CLASS_NAME: &str = "Addons>SigmoidAsymmetricLoss";

/// Instance name used when none is configured.
pub const DEFAULT_NAME: &str = "sigmoid_asymmetric_loss";

/// Floor substituted when ε is configured as `0` or left out.
pub const DEFAULT_EPSILON: f64 = 1e-7;

/// Focusing and clipping parameters shared by the functional and object forms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsymmetricParams {
    pub gamma_neg: f64,
    pub gamma_pos: f64,
    /// Probability margin added to `1 - p`; `None` or `<= 0` disables it.
    pub clip: Option<f64>,
    pub epsilon: f64,
}

/// `xs_pos`/`xs_neg` after clipping and flooring, plus their local
/// derivatives with respect to `p` (zero wherever a bound was active).
struct ClippedProbabilities {
    pos: Matrix,
    neg: Matrix,
    dpos: Matrix,
    dneg: Matrix,
    /// Entries holding the shifted minimum when that minimum exceeds 1.
    /// Every `xs_neg` then equals it, so they all depend on these entries.
    floor_argmin: Vec<(usize, usize)>,
}

impl AsymmetricParams {
    pub fn new(gamma_neg: f64, gamma_pos: f64, clip: Option<f64>, epsilon: Option<f64>) -> Self {
        AsymmetricParams {
            gamma_neg,
            gamma_pos,
            clip,
            epsilon: resolve_epsilon(epsilon),
        }
    }

    fn focusing(&self) -> bool {
        self.gamma_pos > 0.0 || self.gamma_neg > 0.0
    }

    fn clip_margin(&self) -> Option<f64> {
        self.clip.filter(|&m| m > 0.0)
    }

    fn clip_probabilities(&self, probs: &Matrix) -> ClippedProbabilities {
        let eps = self.epsilon;
        let (rows, cols) = probs.shape();

        let mut neg = probs.map(|p| 1.0 - p);
        let mut dneg = Matrix::filled(rows, cols, -1.0);
        let mut floor_argmin = Vec::new();

        if let Some(margin) = self.clip_margin() {
            let shifted = neg.map(|x| x + margin);
            let lo = shifted.min();
            dneg = shifted.map(|x| if x >= lo && x <= 1.0 { -1.0 } else { 0.0 });
            if lo > 1.0 {
                for i in 0..rows {
                    for j in 0..cols {
                        if shifted.data[i][j] == lo {
                            floor_argmin.push((i, j));
                        }
                    }
                }
            }
            neg = shifted.clip_by_value(lo, 1.0);
        }

        let pos_max = probs.max();
        let dpos = probs.map(|x| if x >= eps && x <= pos_max { 1.0 } else { 0.0 });
        let pos = probs.clip_by_value(eps, pos_max);

        let neg_max = neg.max();
        for i in 0..rows {
            for j in 0..cols {
                let x = neg.data[i][j];
                if x < eps || x > neg_max {
                    dneg.data[i][j] = 0.0;
                }
            }
        }
        let neg = neg.clip_by_value(eps, neg_max);

        ClippedProbabilities { pos, neg, dpos, dneg, floor_argmin }
    }

    /// Per-example loss for probabilities `probs` in [0, 1].
    pub fn loss(&self, y_true: &Matrix, probs: &Matrix) -> Result<Vec<f64>> {
        y_true.ensure_same_shape(probs)?;
        let ClippedProbabilities { pos, neg, .. } = self.clip_probabilities(probs);

        let mut loss = Matrix::zeros(probs.rows, probs.cols);
        for i in 0..probs.rows {
            for j in 0..probs.cols {
                let y = y_true.data[i][j];
                let (xp, xn) = (pos.data[i][j], neg.data[i][j]);
                let mut l = y * xp.ln() + (1.0 - y) * xn.ln();

                if self.focusing() {
                    let pt = xp * y + xn * (1.0 - y);
                    let gamma = self.gamma_pos * y + self.gamma_neg * (1.0 - y);
                    l *= (1.0 - pt).powf(gamma);
                }

                loss.data[i][j] = l;
            }
        }

        Ok(loss.sum_rows().into_iter().map(|s| -s).collect())
    }

    /// Gradient of the summed per-example losses with respect to each
    /// probability. Rows are independent except when the shifted-minimum
    /// floor binds: every negative then takes the arg-min entry's value, and
    /// the whole batch's sensitivity to it is routed to that entry (split
    /// evenly between ties).
    pub fn derivative(&self, y_true: &Matrix, probs: &Matrix) -> Result<Matrix> {
        y_true.ensure_same_shape(probs)?;
        let ClippedProbabilities { pos, neg, dpos, dneg, floor_argmin } = self.clip_probabilities(probs);

        let mut grad = Matrix::zeros(probs.rows, probs.cols);
        let mut floor_total = 0.0;
        for i in 0..probs.rows {
            for j in 0..probs.cols {
                let y = y_true.data[i][j];
                let (xp, xn) = (pos.data[i][j], neg.data[i][j]);

                let ce = y * xp.ln() + (1.0 - y) * xn.ln();

                // ∂w/∂pt; the weight is flat in pt at base = 0 (pt = 1),
                // where ce = 0 as well.
                let (w, dw_dpt) = if self.focusing() {
                    let pt = xp * y + xn * (1.0 - y);
                    let gamma = self.gamma_pos * y + self.gamma_neg * (1.0 - y);
                    let base = 1.0 - pt;
                    let dw_dpt = if gamma == 0.0 || base == 0.0 {
                        0.0
                    } else {
                        -gamma * base.powf(gamma - 1.0)
                    };
                    (base.powf(gamma), dw_dpt)
                } else {
                    (1.0, 0.0)
                };

                let dl_dxp = -(y / xp * w + ce * dw_dpt * y);
                let dl_dxn = -((1.0 - y) / xn * w + ce * dw_dpt * (1.0 - y));

                grad.data[i][j] = dl_dxp * dpos.data[i][j] + dl_dxn * dneg.data[i][j];
                if !floor_argmin.is_empty() {
                    floor_total += dl_dxn;
                }
            }
        }

        if !floor_argmin.is_empty() {
            // shifted = 1 - p + m, so d(shifted)/dp = -1.
            let share = -floor_total / floor_argmin.len() as f64;
            for &(i, j) in &floor_argmin {
                grad.data[i][j] += share;
            }
        }

        Ok(grad)
    }
}

impl Default for AsymmetricParams {
    fn default() -> Self {
        AsymmetricParams::new(4.0, 1.0, Some(0.05), Some(1e-8))
    }
}

fn resolve_epsilon(epsilon: Option<f64>) -> f64 {
    match epsilon {
        Some(e) if e != 0.0 => e,
        _ => DEFAULT_EPSILON,
    }
}

/// Functional form: fixes the parameters and returns a `(y_true, y_pred)`
/// closure producing one loss per example. `y_pred` must hold probabilities.
pub fn asymmetric_loss(
    gamma_neg: f64,
    gamma_pos: f64,
    clip: Option<f64>,
    epsilon: Option<f64>,
) -> impl Fn(&Matrix, &Matrix) -> Result<Vec<f64>> + Clone + Send + Sync {
    let params = AsymmetricParams::new(gamma_neg, gamma_pos, clip, epsilon);
    move |y_true: &Matrix, y_pred: &Matrix| params.loss(y_true, y_pred)
}

/// Serializable configuration of a `SigmoidAsymmetricLoss`.
///
/// Missing fields take their defaults when deserializing, so a partial JSON
/// object such as `{"gamma_neg": 2.0}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsymmetricLossConfig {
    /// Apply a sigmoid to `y_pred` before the loss.
    pub from_logits: bool,
    pub gamma_neg: f64,
    pub gamma_pos: f64,
    pub clip: Option<f64>,
    pub epsilon: f64,
    pub reduction: Reduction,
    pub name: Option<String>,
}

impl Default for AsymmetricLossConfig {
    fn default() -> Self {
        AsymmetricLossConfig {
            from_logits: false,
            gamma_neg: 4.0,
            gamma_pos: 1.0,
            clip: Some(0.05),
            epsilon: 1e-8,
            reduction: Reduction::None,
            name: None,
        }
    }
}

impl AsymmetricLossConfig {
    /// Validates the configuration and builds the loss.
    ///
    /// Every float must be finite. Negative gammas and margins outside
    /// [0, 1] are accepted; their results are the caller's concern.
    pub fn build(mut self) -> Result<SigmoidAsymmetricLoss> {
        ensure_finite("gamma_neg", self.gamma_neg)?;
        ensure_finite("gamma_pos", self.gamma_pos)?;
        ensure_finite("epsilon", self.epsilon)?;
        if let Some(clip) = self.clip {
            ensure_finite("clip", clip)?;
        }

        self.epsilon = resolve_epsilon(Some(self.epsilon));
        let params = AsymmetricParams {
            gamma_neg: self.gamma_neg,
            gamma_pos: self.gamma_pos,
            clip: self.clip,
            epsilon: self.epsilon,
        };
        let activation = ActivationFunction::for_inputs(self.from_logits);

        debug!(
            "built {} (gamma_neg={}, gamma_pos={}, clip={:?}, epsilon={}, reduction={})",
            self.name.as_deref().unwrap_or(DEFAULT_NAME),
            self.gamma_neg,
            self.gamma_pos,
            self.clip,
            self.epsilon,
            self.reduction.as_str(),
        );

        Ok(SigmoidAsymmetricLoss { config: self, params, activation })
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Reads a config previously written by `save_json` (or any partial JSON object).
    pub fn load_json(path: impl AsRef<Path>) -> Result<AsymmetricLossConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn ensure_finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AslError::InvalidConfig { field, reason: format!("expected a finite number, got {value}") })
    }
}

/// Object form of the asymmetric loss, with `from_logits`, a reduction
/// policy and a name on top of the focusing parameters.
#[derive(Debug, Clone)]
pub struct SigmoidAsymmetricLoss {
    config: AsymmetricLossConfig,
    params: AsymmetricParams,
    activation: ActivationFunction,
}

impl SigmoidAsymmetricLoss {
    /// Rebuilds a loss from the map returned by `get_config`.
    pub fn from_config(config: Map<String, Value>) -> Result<SigmoidAsymmetricLoss> {
        let config: AsymmetricLossConfig = serde_json::from_value(Value::Object(config))?;
        config.build()
    }

    pub fn config(&self) -> &AsymmetricLossConfig {
        &self.config
    }

    pub fn params(&self) -> AsymmetricParams {
        self.params
    }
}

impl Default for SigmoidAsymmetricLoss {
    fn default() -> Self {
        let config = AsymmetricLossConfig::default();
        let params = AsymmetricParams::new(config.gamma_neg, config.gamma_pos, config.clip, Some(config.epsilon));
        let activation = ActivationFunction::for_inputs(config.from_logits);
        SigmoidAsymmetricLoss { config, params, activation }
    }
}

impl Loss for SigmoidAsymmetricLoss {
    fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    fn name(&self) -> &str {
        self.config.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    fn reduction(&self) -> Reduction {
        self.config.reduction
    }

    fn call(&self, y_true: &Matrix, y_pred: &Matrix) -> Result<Vec<f64>> {
        let probs = y_pred.map(|x| self.activation.function(x));
        let losses = self.params.loss(y_true, &probs)?;
        trace!("{}: evaluated batch of {}x{}", self.name(), y_pred.rows, y_pred.cols);
        Ok(losses)
    }

    fn derivative(&self, y_true: &Matrix, y_pred: &Matrix) -> Result<Matrix> {
        let probs = y_pred.map(|x| self.activation.function(x));
        let grad = self.params.derivative(y_true, &probs)?;
        grad.zip_map(y_pred, |g, x| g * self.activation.derivative(x))
    }

    fn get_config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("name".into(), self.config.name.clone().map_or(Value::Null, Value::from));
        config.insert("reduction".into(), Value::from(self.config.reduction.as_str()));
        config.insert("from_logits".into(), Value::from(self.config.from_logits));
        config.insert("gamma_neg".into(), Value::from(self.config.gamma_neg));
        config.insert("gamma_pos".into(), Value::from(self.config.gamma_pos));
        config.insert("clip".into(), self.config.clip.map_or(Value::Null, Value::from));
        config.insert("epsilon".into(), Value::from(self.config.epsilon));
        config
    }
}
