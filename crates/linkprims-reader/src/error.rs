use std::time::Duration;

use linkprims_link::LinkError;

/// Errors that can occur in reader operations.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Link-level error.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// The worker thread could not be started.
    #[error("failed to spawn reader worker: {0}")]
    Spawn(std::io::Error),

    /// Collection parameters are unusable.
    #[error("invalid collect request: {0}")]
    InvalidRequest(String),

    /// The worker did not confirm it stopped within the bounded wait.
    /// It may still be blocked inside a link read.
    #[error("reader worker not confirmed stopped after {waited:?}")]
    NotStopped { waited: Duration },

    /// The worker thread panicked.
    #[error("reader worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, ReaderError>;
