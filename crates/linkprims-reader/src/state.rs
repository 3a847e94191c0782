use std::sync::atomic::{AtomicU8, Ordering};

/// Reader worker state.
///
/// The worker is running in both `Paused` and `Armed`; it only appends to
/// the receive buffer while `Armed`. The controller moves between `Paused`
/// and `Armed`, only the worker sets `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Running, reads disabled.
    Paused = 0,
    /// Running, reads enabled.
    Armed = 1,
    /// Exited.
    Stopped = 2,
}

impl WorkerState {
    /// Whether the worker is still running.
    pub fn is_running(self) -> bool {
        self != WorkerState::Stopped
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Paused,
            1 => WorkerState::Armed,
            _ => WorkerState::Stopped,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Paused as u8))
    }

    pub(crate) fn load(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Paused -> Armed. Returns false if the worker already stopped.
    pub(crate) fn arm(&self) -> bool {
        self.transition(WorkerState::Paused, WorkerState::Armed)
    }

    /// Armed -> Paused. A stopped worker stays stopped.
    pub(crate) fn pause(&self) {
        self.transition(WorkerState::Armed, WorkerState::Paused);
    }

    pub(crate) fn mark_stopped(&self) {
        self.0.store(WorkerState::Stopped as u8, Ordering::SeqCst);
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        match self
            .0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => true,
            Err(current) => WorkerState::from_u8(current) == to,
        }
    }
}
