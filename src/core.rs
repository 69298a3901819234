// Core error types shared by every space kind.

use crate::spaces::DType;

/// Recoverable errors across the space APIs.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SpaceError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
    #[error("Invalid dtype: expected {expected}, got {found}")]
    InvalidDType { expected: DType, found: DType },
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Unknown key: {0}")]
    UnknownKey(String),
    #[error("Composite space requires at least one component")]
    EmptyComposite,
    #[error("Unsupported space: {0}")]
    UnsupportedSpace(String),
    #[error("Image spaces require bounds of exactly [0, 255], got [{low}, {high}]")]
    ImageBounds { low: f64, high: f64 },
    /// An optional tensor backend was asked for but is not installed.
    #[error("Backend not installed: {0}")]
    BackendUnavailable(&'static str),
}

/// Convenience alias for results using SpaceError.
pub type Result<T> = std::result::Result<T, SpaceError>;
