use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading the local repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not a git repository (searched upward from {path})")]
    NotAGitRepository { path: PathBuf },

    #[error("HEAD is detached; check out a branch first")]
    DetachedHead,

    #[error("Untracked file {path} is not valid UTF-8")]
    FileDecode { path: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] git2::Error),
}

/// A single file-level diff entry that could not be turned into a change.
/// Always recovered by skipping the entry.
#[derive(Debug, Error)]
pub enum DiffEntryError {
    #[error("unsupported delta status {0:?}")]
    UnsupportedStatus(git2::Delta),

    #[error("diff entry has no path")]
    MissingPath,

    #[error(transparent)]
    Git(#[from] git2::Error),
}

/// The `target..current` walk could not be computed.
/// Recovered by listing recent commits on the current branch.
#[derive(Debug, Error)]
#[error("Branch comparison failed: {0}")]
pub struct BranchComparisonFailed(#[from] pub git2::Error);

/// Failures talking to the language model or interpreting its reply.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Empty response from the model API")]
    EmptyResponse,

    #[error("Could not extract valid JSON from the model response")]
    UnparseableResponse,

    #[error("Model API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Model API error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl ModelError {
    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Transport(e) => e.is_timeout() || e.is_connect(),
            ModelError::Api { status, .. } => *status == 429 || *status >= 500,
            ModelError::EmptyResponse | ModelError::UnparseableResponse => false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("GEMINI_API_KEY environment variable is not set")]
    MissingApiKey,

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
