use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::error::{LinkError, Result};
use crate::traits::{Link, DEFAULT_READ_TIMEOUT};

/// Link over a connected Unix domain socket.
///
/// Useful for device bridges that expose a socket, and for tests that need a
/// real OS-level stream (`UnixStream::pair`). End of stream closes the link.
pub struct StreamLink {
    stream: UnixStream,
    name: String,
    open: AtomicBool,
}

impl StreamLink {
    /// Connect to a listening socket path.
    pub fn connect(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| LinkError::Open {
            name: path.display().to_string(),
            source: e,
        })?;
        Self::from_stream(stream, path.display().to_string(), DEFAULT_READ_TIMEOUT)
    }

    /// Wrap an already connected stream, applying the bounded read timeout.
    pub fn from_stream(
        stream: UnixStream,
        name: impl Into<String>,
        read_timeout: Duration,
    ) -> Result<Self> {
        let name = name.into();
        stream
            .set_read_timeout(Some(read_timeout))
            .map_err(|e| LinkError::Open {
                name: name.clone(),
                source: e,
            })?;
        debug!(%name, ?read_timeout, "opened stream link");
        Ok(Self {
            stream,
            name,
            open: AtomicBool::new(true),
        })
    }

    /// Create a connected pair of links.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair()?;
        Ok((
            Self::from_stream(left, "pair-left", DEFAULT_READ_TIMEOUT)?,
            Self::from_stream(right, "pair-right", DEFAULT_READ_TIMEOUT)?,
        ))
    }

    fn mark_closed(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            debug!(name = %self.name, "stream link closed");
        }
    }
}

impl Link for StreamLink {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if !self.is_open() {
            return Err(LinkError::Closed);
        }
        loop {
            match (&self.stream).read(buf) {
                Ok(0) if !buf.is_empty() => {
                    self.mark_closed();
                    return Err(LinkError::Closed);
                }
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(0)
                }
                Err(err) => return Err(LinkError::Io(err)),
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        if !self.is_open() {
            return Err(LinkError::Closed);
        }
        match (&self.stream).write(data) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                self.mark_closed();
                Err(LinkError::Closed)
            }
            Err(err) => Err(LinkError::Io(err)),
        }
    }

    fn flush(&self) -> Result<()> {
        (&self.stream).flush().map_err(Into::into)
    }

    fn close(&self) {
        self.mark_closed();
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for StreamLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamLink")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}
