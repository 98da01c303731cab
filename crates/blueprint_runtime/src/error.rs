//! Error types for the blueprint runtime.

use blueprint_types::FunctionValidationError;

/// Errors that abort a whole blueprint run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No blueprint loaded")]
    NoBlueprintLoaded,
}

/// Errors raised by a single node's `execute`.
///
/// The engine never propagates these; they become a `NodeResult::Error`
/// for the failing node and end that branch.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("{0}")]
    Execution(String),

    #[error("Node panicked: {0}")]
    Panicked(String),

    #[error("{0} not available")]
    ServiceUnavailable(&'static str),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error(transparent)]
    InvalidFunction(#[from] FunctionValidationError),

    #[error("Function call depth limit ({0}) reached")]
    CallDepthExceeded(usize),

    #[error("Invalid input '{pin}': {reason}")]
    InvalidInput { pin: String, reason: String },

    #[error(transparent)]
    Point(#[from] PointError),
}

impl NodeError {
    pub fn execution(message: impl Into<String>) -> Self {
        NodeError::Execution(message.into())
    }

    pub fn invalid_input(pin: &str, reason: impl Into<String>) -> Self {
        NodeError::InvalidInput {
            pin: pin.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur when accessing point values.
#[derive(Debug, thiserror::Error)]
pub enum PointError {
    #[error("Point not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
