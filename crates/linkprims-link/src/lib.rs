//! Byte-link abstraction with bounded reads.
//!
//! A [`Link`] is the external endpoint the rest of linkprims drains and
//! writes to:
//! - [`LoopbackLink`]: in-memory echo device (tests, dry runs)
//! - [`StreamLink`]: connected Unix domain socket
//! - [`SerialLink`]: serial port (behind the `serial` feature)
//!
//! This is the lowest layer of linkprims. Discovering which port to open is
//! left to the caller.

pub mod error;
pub mod loopback;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;
#[cfg(unix)]
pub mod stream;

pub use error::{LinkError, Result};
pub use loopback::{LoopbackConfig, LoopbackLink};
pub use traits::{Link, LinkHandle, DEFAULT_READ_TIMEOUT};

#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialLink};
#[cfg(unix)]
pub use stream::StreamLink;
