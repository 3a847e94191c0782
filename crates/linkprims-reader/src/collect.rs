use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::config::CollectRequest;
use crate::state::WorkerState;
use crate::worker::Shared;

/// Which termination condition ended a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The delimiter byte arrived.
    Delimiter,
    /// The buffer reached the size budget.
    Size,
    /// The timeout elapsed.
    Timeout,
    /// The worker exited (link closed or stop requested), nothing more can arrive.
    WorkerStopped,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Delimiter => "delimiter",
            StopReason::Size => "size",
            StopReason::Timeout => "timeout",
            StopReason::WorkerStopped => "worker-stopped",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned by a collection call.
#[derive(Debug, Clone)]
pub struct Collected {
    /// Bytes received since the reset, in arrival order. May exceed
    /// `max_bytes` by up to one read chunk.
    pub bytes: Bytes,
    /// Why the collection stopped.
    pub reason: StopReason,
    /// Bytes that arrived after the previous snapshot and were dropped by
    /// this call's reset.
    pub discarded: usize,
    /// Bytes examined for the delimiter (zero without a delimiter).
    pub scanned: usize,
    /// Time spent collecting.
    pub elapsed: Duration,
}

impl Collected {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One in-progress collection: reset and arm, poll, then pause and snapshot.
pub(crate) struct Collection<'a> {
    shared: &'a Shared,
    request: &'a CollectRequest,
    poll_interval: Duration,
    start: Instant,
    cursor: usize,
    seen: usize,
    discarded: usize,
}

impl<'a> Collection<'a> {
    pub(crate) fn begin(
        shared: &'a Shared,
        request: &'a CollectRequest,
        poll_interval: Duration,
        last_returned: Option<usize>,
    ) -> Self {
        let received = shared.buffer.reset();
        let discarded = match last_returned {
            Some(returned) if returned != received => {
                warn!(
                    received,
                    returned,
                    discarded = received.saturating_sub(returned),
                    "discarding bytes that arrived after the previous collection"
                );
                received.saturating_sub(returned)
            }
            _ => 0,
        };

        if !shared.state.arm() {
            debug!("reader worker already stopped; collecting nothing");
        }

        Self {
            shared,
            request,
            poll_interval,
            start: Instant::now(),
            cursor: 0,
            seen: 0,
            discarded,
        }
    }

    /// Check the termination conditions once.
    pub(crate) fn poll(&mut self) -> Option<StopReason> {
        // Read before scanning: once stopped, the scan sees every final append.
        let stopped = self.shared.state.load() == WorkerState::Stopped;

        let (len, found) = self
            .shared
            .buffer
            .scan(&mut self.cursor, self.request.delimiter);
        self.seen = len;

        if found {
            return Some(StopReason::Delimiter);
        }
        if len >= self.request.max_bytes {
            return Some(StopReason::Size);
        }
        if self.start.elapsed() >= self.request.timeout {
            return Some(StopReason::Timeout);
        }
        if stopped {
            return Some(StopReason::WorkerStopped);
        }
        None
    }

    /// How long to sleep before the next poll.
    pub(crate) fn next_wait(&self) -> Duration {
        let remaining = self.request.timeout.saturating_sub(self.start.elapsed());
        self.poll_interval.min(remaining)
    }

    /// Block until new bytes arrive or the next poll is due.
    pub(crate) fn wait(&self) {
        self.shared
            .buffer
            .wait_for_growth(self.seen, self.next_wait());
    }

    pub(crate) fn finish(self, reason: StopReason) -> Collected {
        self.shared.state.pause();
        let bytes = self.shared.buffer.snapshot();
        let collected = Collected {
            bytes,
            reason,
            discarded: self.discarded,
            scanned: self.cursor,
            elapsed: self.start.elapsed(),
        };
        debug!(
            reason = %reason,
            len = collected.len(),
            scanned = collected.scanned,
            elapsed_ms = collected.elapsed.as_millis() as u64,
            "collection finished"
        );
        collected
    }
}
