use std::fmt::Display;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {what}: {value:?}")]
    InvalidArgument { what: &'static str, value: String },

    #[error("unsupported file type: {kind:?}")]
    UnsupportedFormat { kind: String },

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable { collaborator: &'static str, message: String },

    #[error("corrupt state at {}: {message}", path.display())]
    CorruptState { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid(what: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidArgument { what, value: value.into() }
    }

    /// Wrap a failure reported by an external collaborator (vector store,
    /// embedder, graph backend, generator).
    pub fn collaborator(collaborator: &'static str, err: impl Display) -> Self {
        Self::CollaboratorUnavailable { collaborator, message: err.to_string() }
    }

    /// True when the caller sent something we refuse; false when a backend
    /// or the local environment failed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::UnsupportedFormat { .. } | Self::PayloadTooLarge { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
