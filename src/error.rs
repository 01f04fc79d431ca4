use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while inspecting repositories and archives.
///
/// Repository precondition failures render fixed, path-interpolated
/// messages so downstream tooling can match on the literal wording.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Couldn't list commits, {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Couldn't list commits, {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Couldn't list commits, {} is not a git repo", .0.display())]
    NotARepository(PathBuf),

    #[error("Repository {} has no commits to evaluate", .0.display())]
    EmptyHistory(PathBuf),

    #[error("Malformed git log output for {}: {reason}", .path.display())]
    MalformedLog { path: PathBuf, reason: String },

    #[error("git {command} failed for {} ({status}): {stderr}", .path.display())]
    GitCommand {
        path: PathBuf,
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Couldn't open archive {}: {source}", .path.display())]
    ArchiveOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed archive {}: {reason}", .path.display())]
    MalformedArchive { path: PathBuf, reason: String },

    #[error("Couldn't read entry {entry} of {}: {reason}", .path.display())]
    EntryReadFailure {
        path: PathBuf,
        entry: String,
        reason: String,
    },

    #[error("Requested {requested} characters of a {length} character hash")]
    OutOfRange { requested: usize, length: usize },

    #[error("Invalid commit hash '{0}'")]
    InvalidCommitHash(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Initialization error: {0}")]
    InitializationError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<openssl::error::ErrorStack> for Error {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Error::Signature(err.to_string())
    }
}
