use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Default bounded wait for a single read on a link.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// A bidirectional byte link with bounded reads.
///
/// Implementations use interior mutability so a single handle can be shared
/// between a background reader and a foreground writer. `read` must return
/// promptly: if nothing arrives within the link's short internal wait it
/// returns `Ok(0)` rather than blocking indefinitely.
pub trait Link: Send + Sync {
    /// Read up to `buf.len()` bytes, waiting at most the link's read timeout.
    ///
    /// Returns `Err(LinkError::Closed)` once the link is closed.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Write bytes, returning how many were accepted.
    fn write(&self, data: &[u8]) -> Result<usize>;

    /// Flush buffered output to the medium.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Close the link. Idempotent.
    fn close(&self);

    /// Whether the link is currently open.
    fn is_open(&self) -> bool;

    /// Link name for diagnostics.
    fn name(&self) -> &str;
}

/// Shared, non-owning handle to a link.
pub type LinkHandle = Arc<dyn Link>;

