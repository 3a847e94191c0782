use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::traits::{Link, DEFAULT_READ_TIMEOUT};

/// Configuration for an in-memory [`LoopbackLink`].
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Bounded wait for a read when no bytes are pending.
    pub read_timeout: Duration,
    /// Cap on bytes returned by a single read, emulating a slow device.
    pub max_read: Option<usize>,
    /// Whether written bytes are echoed back as inbound bytes.
    pub echo: bool,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_read: None,
            echo: true,
        }
    }
}

#[derive(Debug)]
struct LoopbackState {
    inbound: BytesMut,
    written: BytesMut,
    open: bool,
}

/// In-memory link standing in for a device.
///
/// With `echo` enabled every write is queued for reading, which is how a
/// firmware echo test behaves. Tests can also [`inject`](Self::inject)
/// inbound bytes directly.
#[derive(Debug)]
pub struct LoopbackLink {
    name: String,
    config: LoopbackConfig,
    state: Mutex<LoopbackState>,
    readable: Condvar,
}

impl LoopbackLink {
    /// Create an open echoing loopback link.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, LoopbackConfig::default())
    }

    /// Create an open loopback link with explicit configuration.
    pub fn with_config(name: impl Into<String>, config: LoopbackConfig) -> Self {
        let name = name.into();
        debug!(%name, ?config, "opened loopback link");
        Self {
            name,
            config,
            state: Mutex::new(LoopbackState {
                inbound: BytesMut::new(),
                written: BytesMut::new(),
                open: true,
            }),
            readable: Condvar::new(),
        }
    }

    /// Queue inbound bytes as if the device had sent them.
    pub fn inject(&self, data: &[u8]) {
        let mut state = self.lock();
        state.inbound.extend_from_slice(data);
        drop(state);
        self.readable.notify_all();
    }

    /// Drain everything written to the link so far.
    pub fn take_written(&self) -> Bytes {
        self.lock().written.split().freeze()
    }

    /// Number of inbound bytes not yet read.
    pub fn pending(&self) -> usize {
        self.lock().inbound.len()
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        // A poisoned lock only means a test thread panicked mid-append.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Link for LoopbackLink {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let state = self.lock();
        let (mut state, _) = self
            .readable
            .wait_timeout_while(state, self.config.read_timeout, |s| {
                s.open && s.inbound.is_empty()
            })
            .unwrap_or_else(|e| e.into_inner());

        if !state.open {
            return Err(LinkError::Closed);
        }

        let mut n = buf.len().min(state.inbound.len());
        if let Some(cap) = self.config.max_read {
            n = n.min(cap);
        }
        buf[..n].copy_from_slice(&state.inbound[..n]);
        state.inbound.advance(n);
        Ok(n)
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        let mut state = self.lock();
        if !state.open {
            return Err(LinkError::Closed);
        }
        state.written.extend_from_slice(data);
        if self.config.echo {
            state.inbound.extend_from_slice(data);
        }
        drop(state);
        self.readable.notify_all();
        Ok(data.len())
    }

    fn close(&self) {
        let mut state = self.lock();
        if state.open {
            state.open = false;
            debug!(name = %self.name, "closed loopback link");
        }
        drop(state);
        self.readable.notify_all();
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn echo_returns_written_bytes() {
        let link = LoopbackLink::new("loop0");
        assert_eq!(link.write(b"hello").unwrap(), 5);

        let mut buf = [0u8; 16];
        let n = link.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(link.take_written().as_ref(), b"hello");
    }

    #[test]
    fn read_times_out_with_zero_bytes() {
        let link = LoopbackLink::new("loop0");
        let start = Instant::now();
        let mut buf = [0u8; 16];
        assert_eq!(link.read(&mut buf).unwrap(), 0);
        assert!(start.elapsed() >= DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn max_read_caps_each_read() {
        let link = LoopbackLink::with_config(
            "slow",
            LoopbackConfig {
                max_read: Some(3),
                ..LoopbackConfig::default()
            },
        );
        link.inject(b"abcdefg");

        let mut buf = [0u8; 16];
        assert_eq!(link.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(link.pending(), 4);
    }

    #[test]
    fn without_echo_writes_are_only_recorded() {
        let link = LoopbackLink::with_config(
            "sink",
            LoopbackConfig {
                echo: false,
                ..LoopbackConfig::default()
            },
        );
        link.write(b"out").unwrap();
        assert_eq!(link.pending(), 0);
        assert_eq!(link.take_written().as_ref(), b"out");
    }

    #[test]
    fn close_wakes_blocked_reader() {
        let link = Arc::new(LoopbackLink::with_config(
            "loop0",
            LoopbackConfig {
                read_timeout: Duration::from_secs(5),
                ..LoopbackConfig::default()
            },
        ));

        let reader = {
            let link = Arc::clone(&link);
            std::thread::spawn(move || {
                let mut buf = [0u8; 4];
                link.read(&mut buf)
            })
        };

        std::thread::sleep(Duration::from_millis(20));
        link.close();

        let result = reader.join().unwrap();
        assert!(matches!(result, Err(LinkError::Closed)));
        assert!(!link.is_open());
        assert!(matches!(link.write(b"x"), Err(LinkError::Closed)));
    }
}
