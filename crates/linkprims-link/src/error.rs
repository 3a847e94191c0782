/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Failed to open the named endpoint.
    #[error("failed to open {name}: {source}")]
    Open {
        name: String,
        source: std::io::Error,
    },

    /// The link is closed. Readers treat this as a normal end of stream.
    #[error("link closed")]
    Closed,

    /// An I/O error occurred on the underlying medium.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Returns true if this error only reports that the link went away.
    pub fn is_closed(&self) -> bool {
        matches!(self, LinkError::Closed)
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
