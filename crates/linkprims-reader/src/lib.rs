//! Background link draining with multi-condition collection.
//!
//! A [`LinkReader`] owns a worker thread that pulls bytes from a
//! [`Link`](linkprims_link::Link) into a shared receive buffer while a
//! collection is armed. The controlling thread calls
//! [`LinkReader::collect`] to wait for a delimiter, a size budget or a
//! timeout and gets back a snapshot of everything received since the call
//! started.
//!
//! Stopping is cooperative: [`LinkReader::request_stop`] is observed between
//! link reads, and [`LinkReader::wait_stopped`] reports whether the worker
//! actually exited within a bounded wait.

mod buffer;
pub mod collect;
pub mod config;
pub mod error;
#[cfg(feature = "async")]
mod nonblocking;
pub mod reader;
pub mod state;
mod worker;

pub use collect::{Collected, StopReason};
pub use config::{CollectRequest, ReaderConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_BYTES};
pub use error::{ReaderError, Result};
pub use reader::LinkReader;
pub use state::WorkerState;
pub use tokio_util::sync::CancellationToken;
pub use worker::WorkerExit;
