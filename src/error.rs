use thiserror::Error;

/// Errors raised while validating inputs to the softmax loss.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SoftmaxError {
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid label {label} at example {index}: must be below {classes}")]
    InvalidLabel {
        index: usize,
        label: usize,
        classes: usize,
    },
    #[error("Regularization strength must be finite and non-negative, got {0}")]
    InvalidRegularization(f64),
    #[error("Batch contains no examples")]
    EmptyBatch,
    #[error("Scores of example {index} underflowed to zero after the max shift")]
    Underflow { index: usize },
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
}

pub type Result<T> = std::result::Result<T, SoftmaxError>;
