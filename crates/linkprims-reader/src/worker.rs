use std::sync::Arc;
use std::time::Duration;

use linkprims_link::{LinkError, LinkHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::buffer::ReceiveBuffer;
use crate::state::{StateCell, WorkerState};

/// State shared between the worker and the controller.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) buffer: ReceiveBuffer,
    pub(crate) state: StateCell,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            buffer: ReceiveBuffer::new(),
            state: StateCell::new(),
        }
    }
}

/// Why the reader worker exited.
#[derive(Debug)]
pub enum WorkerExit {
    /// A stop was requested.
    StopRequested,
    /// The link reported closed. Not a fault.
    LinkClosed,
    /// A read failed with something other than "closed".
    Failed(LinkError),
}

pub(crate) struct Worker {
    pub(crate) link: LinkHandle,
    pub(crate) shared: Arc<Shared>,
    pub(crate) stop: CancellationToken,
    pub(crate) chunk_size: usize,
    pub(crate) idle_backoff: Duration,
}

impl Worker {
    /// Drain the link until a stop request or the link closes.
    pub(crate) fn run(self) -> WorkerExit {
        let link = self.link.as_ref();
        let mut chunk = vec![0u8; self.chunk_size];
        debug!(link = link.name(), chunk = self.chunk_size, "reader worker started");

        let exit = loop {
            if self.stop.is_cancelled() {
                break WorkerExit::StopRequested;
            }

            let mut read = 0;
            if self.shared.state.load() == WorkerState::Armed {
                match link.read(&mut chunk) {
                    Ok(n) => read = n,
                    Err(err) if err.is_closed() => break WorkerExit::LinkClosed,
                    Err(err) => break WorkerExit::Failed(err),
                }
            }

            if read > 0 {
                self.shared.buffer.append(&chunk[..read]);
                trace!(bytes = read, "appended to receive buffer");
            } else if link.is_open() {
                std::thread::sleep(self.idle_backoff);
            } else {
                break WorkerExit::LinkClosed;
            }
        };

        self.shared.state.mark_stopped();
        self.shared.buffer.notify();

        match &exit {
            WorkerExit::Failed(err) => {
                error!(link = link.name(), error = %err, "reader worker failed")
            }
            other => debug!(link = link.name(), exit = ?other, "reader worker stopped"),
        }
        exit
    }
}
