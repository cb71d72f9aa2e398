//! Error types for Drummer.

use thiserror::Error;

/// Primary error type for all Drummer operations.
#[derive(Error, Debug)]
pub enum DrummerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model call error ({model}): {message}")]
    Model { model: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Canceled")]
    Canceled,

    #[error("Tool execution error ({tool_name}): {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl DrummerError {
    /// Create a model-call error.
    pub fn model(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    ///
    /// Cancellation is its own category so the record keeper never counts
    /// a canceled turn as a generic failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Model { .. } => ErrorCategory::Model,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Canceled => ErrorCategory::Canceled,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }
}

/// Coarse error category, used as the record keeper's `error_type` and as
/// the machine-readable category on wire error frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Model,
    Serialization,
    Timeout,
    Canceled,
    ToolExecution,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Model => "model",
            Self::Serialization => "serialization",
            Self::Timeout => "timeout",
            Self::Canceled => "canceled",
            Self::ToolExecution => "tool_execution",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DrummerError>;
