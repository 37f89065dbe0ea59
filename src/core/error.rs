//! Fatal errors raised while compiling a schema into a resource document.

use thiserror::Error;

/// Result alias for the compilation core.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Compilation failures. All of these abort the run before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Malformed or unsupported schema construct
    #[error("schema error{}: {message}", line.map(|l| format!(" (line {})", l)).unwrap_or_default())]
    Schema { message: String, line: Option<usize> },

    /// Two contributions claimed the same logical ID
    #[error("logical ID '{id}' contributed by both '{first}' and '{second}'")]
    Collision {
        id: String,
        first: String,
        second: String,
    },

    /// Stage list violates a requires/provides or ordering contract
    #[error("invalid transformer pipeline: {0}")]
    Pipeline(String),

    /// A stage tried to amend a resource that is not in the document yet
    #[error("stage '{stage}' amends unknown resource '{target}'")]
    Amendment { stage: String, target: String },
}

impl TransformError {
    /// Schema error without a source position.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            line: None,
        }
    }

    /// Schema error at a source line.
    pub fn schema_at(line: usize, message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            line: Some(line),
        }
    }
}
