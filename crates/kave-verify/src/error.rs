use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid digest '{value}': {reason}")]
    InvalidDigest { value: String, reason: &'static str },

    #[error("failed to hash '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, VerifyError>;
