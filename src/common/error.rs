//! Error handling for the aggregate engine

use thiserror::Error;

/// Main error type for aggregate and window-function evaluation
#[derive(Error, Debug)]
pub enum PrismAggError {
    #[error("Unknown aggregate function: {0}")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), {actual} given")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("{function}() {message}")]
    Semantic { function: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid DISTINCT set: {0}")]
    InvalidDistinctSet(String),

    #[error("Invalid list: {0}")]
    InvalidList(String),

    #[error("{function}() internal missing or invalid window attachment: {detail}")]
    InvalidWindowAttachment { function: String, detail: String },

    #[error("{function}() does not support {operation}")]
    UnsupportedOperation { function: String, operation: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of errors, used by callers deciding how to report them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Driver and engine disagree about the protocol; never retried
    ContractViolation,
    /// A user-supplied argument failed validation
    ArgumentValidation,
    /// Partials that should be well-typed were not
    InternalConsistency,
    /// Clause or argument legality rejected before evaluation
    Semantic,
    /// Operand expression failed to evaluate
    Evaluation,
    /// Configuration, files and serialization
    Environment,
}

impl PrismAggError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrismAggError::InvalidDistinctSet(_)
            | PrismAggError::InvalidList(_)
            | PrismAggError::InvalidWindowAttachment { .. }
            | PrismAggError::UnsupportedOperation { .. } => ErrorKind::ContractViolation,
            PrismAggError::InvalidArgument(_) => ErrorKind::ArgumentValidation,
            PrismAggError::Internal(_) => ErrorKind::InternalConsistency,
            PrismAggError::UnknownFunction(_)
            | PrismAggError::ArgumentCount { .. }
            | PrismAggError::Semantic { .. } => ErrorKind::Semantic,
            PrismAggError::Evaluation(_) => ErrorKind::Evaluation,
            PrismAggError::Config(_) | PrismAggError::Io(_) | PrismAggError::Json(_) => {
                ErrorKind::Environment
            }
        }
    }

    pub fn unsupported(function: &str, operation: &str) -> Self {
        PrismAggError::UnsupportedOperation {
            function: function.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn window_attachment(function: &str, detail: impl Into<String>) -> Self {
        PrismAggError::InvalidWindowAttachment {
            function: function.to_string(),
            detail: detail.into(),
        }
    }

    pub fn semantic(function: &str, message: impl Into<String>) -> Self {
        PrismAggError::Semantic {
            function: function.to_uppercase(),
            message: message.into(),
        }
    }
}

/// Result type alias for aggregate operations
pub type PrismAggResult<T> = std::result::Result<T, PrismAggError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_err {
    ($msg:expr) => {
        $crate::common::error::PrismAggError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::PrismAggError::Internal(format!($fmt, $($arg)*))
    };
}
