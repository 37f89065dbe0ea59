//! Crate-level error type for the compile pipeline and CLI.

use crate::core::error::TransformError;
use crate::reconcile::capability::CapabilityError;
use crate::reconcile::prompt::PromptError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the pipeline and CLI.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("generated output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid settings file {}: {message}", path.display())]
    Settings { path: PathBuf, message: String },

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("{0}")]
    Usage(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
