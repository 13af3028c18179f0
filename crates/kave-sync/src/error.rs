use std::path::PathBuf;

use kave_fetch::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The manifest or root document could not be retrieved. Aborts the run.
    #[error("cannot retrieve {url}: {source}")]
    Precondition { url: String, source: FetchError },

    #[error("malformed manifest entry on line {line}: {reason}")]
    MalformedEntry { line: usize, reason: String },

    #[error("path '{0}' escapes the destination root")]
    PathEscapes(String),

    #[error("cannot build URL for '{path}': {reason}")]
    InvalidUrl { path: String, reason: String },

    #[error("failed to write '{path}': {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("'{0}' is a directory where a file is expected")]
    DirectoryConflict(PathBuf),

    #[error("cannot hash '{path}': {source}")]
    Hash {
        path:   PathBuf,
        source: kave_verify::VerifyError,
    },

    #[error("invalid configuration in '{path}': {reason}")]
    Config { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
