use thiserror::Error;

#[derive(Debug, Error)]
pub enum AslError {
    #[error("shape mismatch: y_true is {true_rows}x{true_cols}, y_pred is {pred_rows}x{pred_cols}")]
    ShapeMismatch {
        true_rows: usize,
        true_cols: usize,
        pred_rows: usize,
        pred_cols: usize,
    },
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRows { row: usize, expected: usize, found: usize },
    #[error("invalid value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("no loss registered under `{0}`")]
    UnknownLoss(String),
    #[error("a loss is already registered under `{0}`")]
    DuplicateLoss(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AslError>;
