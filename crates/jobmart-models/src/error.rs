//! Model validation errors.

use thiserror::Error;

use crate::JobStatus;

/// Result type for model construction and validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or validating model values.
///
/// None of these ever reach the store: they are detected during construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The input is well-formed but asks for something not built yet.
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Transition {from} -> {to} is not implemented")]
    NotImplemented { from: JobStatus, to: JobStatus },

    #[error("Transition {from} -> {to} is not allowed")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

impl ModelError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for malformed or missing input (as opposed to unsupported features).
    pub fn is_validation(&self) -> bool {
        matches!(self, ModelError::MissingParameter(_) | ModelError::InvalidArgument(_))
    }
}
