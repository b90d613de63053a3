use crate::model::RepoId;
use thiserror::Error;

/// Failures the watch core recovers from locally. None of these escape a
/// running session; they are turned into notices instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WatchError {
    /// The request never completed: connection refused, timeout, unreadable body.
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("sync already running for repo {repo}")]
    AlreadyRunning { repo: RepoId },

    /// A push event whose payload does not match its declared type.
    #[error("malformed `{kind}` event: {detail}")]
    MalformedEvent { kind: String, detail: String },
}

impl WatchError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        WatchError::Transport(err.to_string())
    }

    /// Whether a user re-triggering the same action could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WatchError::Transport(_) => true,
            WatchError::Rejected { status, .. } => *status == 429 || *status >= 500,
            WatchError::AlreadyRunning { .. } => true,
            WatchError::MalformedEvent { .. } => false,
        }
    }
}
