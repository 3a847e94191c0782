use std::time::Duration;

use crate::error::{ReaderError, Result};

/// Default bytes requested from the link per read.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default size budget for a collection.
pub const DEFAULT_MAX_BYTES: usize = 512;

/// Reader worker and collector tuning.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Maximum bytes requested from the link per read. Default: 1024.
    pub chunk_size: usize,
    /// Pause after an empty read while the link is open. Default: 1 ms.
    pub idle_backoff: Duration,
    /// Maximum sleep between collector polls. Default: 10 ms.
    pub poll_interval: Duration,
    /// Interval between stop-confirmation checks. Default: 20 ms.
    pub stop_poll_interval: Duration,
    /// Number of stop-confirmation checks. Default: 50 (about one second).
    pub stop_poll_attempts: u32,
    /// Name of the worker thread.
    pub thread_name: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            idle_backoff: Duration::from_millis(1),
            poll_interval: Duration::from_millis(10),
            stop_poll_interval: Duration::from_millis(20),
            stop_poll_attempts: 50,
            thread_name: "link-reader".to_string(),
        }
    }
}

impl ReaderConfig {
    /// Total bounded wait used by `shutdown`.
    pub fn stop_timeout(&self) -> Duration {
        self.stop_poll_interval * self.stop_poll_attempts
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ReaderError::InvalidRequest(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.stop_poll_interval.is_zero() {
            return Err(ReaderError::InvalidRequest(
                "stop_poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Termination conditions for one collection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRequest {
    /// Wall-clock budget. Default: 1 s.
    pub timeout: Duration,
    /// Size budget. The result is not truncated to it. Default: 512.
    pub max_bytes: usize,
    /// Stop as soon as this byte arrives. Default: none.
    pub delimiter: Option<u8>,
}

impl Default for CollectRequest {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            max_bytes: DEFAULT_MAX_BYTES,
            delimiter: None,
        }
    }
}

impl CollectRequest {
    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the size budget.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Stop on `delimiter`.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_bytes == 0 {
            return Err(ReaderError::InvalidRequest(
                "max_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
