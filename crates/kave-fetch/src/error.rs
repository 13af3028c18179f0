//! Error types for kave-fetch.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Why a single task did not complete. Never aborts sibling tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error(transparent)]
    Write(#[from] kave_fs::Error),

    #[error(transparent)]
    Hash(#[from] kave_verify::VerifyError),

    #[error("'{0}' is a directory, not overwriting")]
    DirectoryConflict(PathBuf),

    #[error("worker failed: {0}")]
    Worker(String),
}
