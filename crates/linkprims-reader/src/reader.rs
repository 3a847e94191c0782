use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use linkprims_link::LinkHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::collect::{Collected, Collection};
use crate::config::{CollectRequest, ReaderConfig};
use crate::error::{ReaderError, Result};
use crate::state::WorkerState;
use crate::worker::{Shared, Worker, WorkerExit};

/// Drains a link on a background thread and hands accumulated bytes to the
/// controller on demand.
///
/// Reads are only issued while a [`collect`](Self::collect) call is in
/// progress. Bytes that arrive between the end of one collection and the
/// reset at the start of the next are reported in [`Collected::discarded`].
pub struct LinkReader {
    link: LinkHandle,
    shared: Arc<Shared>,
    stop: CancellationToken,
    config: ReaderConfig,
    handle: Option<JoinHandle<WorkerExit>>,
    last_returned: Option<usize>,
}

impl LinkReader {
    /// Start a reader with default configuration.
    pub fn spawn(link: LinkHandle) -> Result<Self> {
        Self::spawn_with_config(link, ReaderConfig::default())
    }

    /// Start a reader with explicit configuration.
    pub fn spawn_with_config(link: LinkHandle, config: ReaderConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared::new());
        let stop = CancellationToken::new();
        let worker = Worker {
            link: Arc::clone(&link),
            shared: Arc::clone(&shared),
            stop: stop.clone(),
            chunk_size: config.chunk_size,
            idle_backoff: config.idle_backoff,
        };

        let handle = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker.run())
            .map_err(ReaderError::Spawn)?;

        debug!(link = link.name(), thread = %config.thread_name, "spawned link reader");
        Ok(Self {
            link,
            shared,
            stop,
            config,
            handle: Some(handle),
            last_returned: None,
        })
    }

    /// Collect bytes until the delimiter, the size budget or the timeout.
    ///
    /// Blocks the calling thread for at most `timeout` plus one poll interval
    /// (plus one in-flight read). Returns an empty snapshot if nothing arrived.
    pub fn collect(&mut self, request: &CollectRequest) -> Result<Collected> {
        request.validate()?;
        let mut collection = Collection::begin(
            &self.shared,
            request,
            self.config.poll_interval,
            self.last_returned,
        );
        let reason = loop {
            if let Some(reason) = collection.poll() {
                break reason;
            }
            collection.wait();
        };
        let collected = collection.finish(reason);
        self.last_returned = Some(collected.len());
        Ok(collected)
    }

    /// Ask the worker to exit at its next loop boundary. Idempotent.
    pub fn request_stop(&self) {
        if !self.stop.is_cancelled() {
            debug!(link = self.link.name(), "stop requested");
            self.stop.cancel();
        }
    }

    /// Poll for the worker to stop, up to `max_wait`.
    ///
    /// Returns false if the worker was not observed stopped; it may still be
    /// blocked inside a link read.
    pub fn wait_stopped(&self, max_wait: Duration) -> bool {
        let interval = self.config.stop_poll_interval;
        let attempts = max_wait.as_nanos().div_ceil(interval.as_nanos()).max(1);
        for _ in 0..attempts {
            if self.is_stopped() {
                return true;
            }
            std::thread::sleep(interval);
        }
        let stopped = self.is_stopped();
        if !stopped {
            warn!(link = self.link.name(), ?max_wait, "reader worker not confirmed stopped");
        }
        stopped
    }

    /// Request a stop, wait the configured bound, and join the worker.
    pub fn shutdown(mut self) -> Result<WorkerExit> {
        self.request_stop();
        let waited = self.config.stop_timeout();
        if !self.wait_stopped(waited) {
            return Err(ReaderError::NotStopped { waited });
        }
        let handle = self.handle.take().ok_or(ReaderError::WorkerPanicked)?;
        handle.join().map_err(|_| ReaderError::WorkerPanicked)
    }

    /// Whether the worker has exited.
    pub fn is_stopped(&self) -> bool {
        self.state() == WorkerState::Stopped
    }

    /// Current worker state.
    pub fn state(&self) -> WorkerState {
        self.shared.state.load()
    }

    /// Bytes currently in the receive buffer.
    pub fn buffered(&self) -> usize {
        self.shared.buffer.len()
    }

    /// A token that stops the worker when cancelled.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// The link being drained.
    pub fn link(&self) -> &LinkHandle {
        &self.link
    }

    /// Reader configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    #[cfg(feature = "async")]
    pub(crate) fn parts(&self) -> (&Shared, Duration, Option<usize>) {
        (&self.shared, self.config.poll_interval, self.last_returned)
    }

    #[cfg(feature = "async")]
    pub(crate) fn set_last_returned(&mut self, len: usize) {
        self.last_returned = Some(len);
    }
}

impl Drop for LinkReader {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.request_stop();
        }
    }
}

impl std::fmt::Debug for LinkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkReader")
            .field("link", &self.link.name())
            .field("state", &self.state())
            .field("last_returned", &self.last_returned)
            .finish()
    }
}
