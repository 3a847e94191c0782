use std::io::{ErrorKind, Read as _, Write as _};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::traits::{Link, DEFAULT_READ_TIMEOUT};

/// Serial port settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate. Default: 115200.
    pub baud_rate: u32,
    /// Bounded wait for a single read.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

type Port = Box<dyn SerialPort>;

/// Link over a serial port (8N1, no flow control).
///
/// Reads and writes go through separate cloned handles so a writer is never
/// held up behind a reader's bounded wait.
pub struct SerialLink {
    name: String,
    reader: Mutex<Option<Port>>,
    writer: Mutex<Option<Port>>,
}

impl SerialLink {
    /// Open a serial port by name (e.g. `/dev/ttyACM0`, `COM6`).
    pub fn open(port_name: &str, config: &SerialConfig) -> Result<Self> {
        let open_err = |e: serialport::Error| LinkError::Open {
            name: port_name.to_string(),
            source: e.into(),
        };

        let reader = serialport::new(port_name, config.baud_rate)
            .timeout(config.read_timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .map_err(open_err)?;
        let writer = reader.try_clone().map_err(open_err)?;

        debug!(port = port_name, baud = config.baud_rate, "opened serial link");
        Ok(Self {
            name: port_name.to_string(),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
        })
    }
}

fn lock(port: &Mutex<Option<Port>>) -> MutexGuard<'_, Option<Port>> {
    port.lock().unwrap_or_else(|e| e.into_inner())
}

impl Link for SerialLink {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = lock(&self.reader);
        let Some(port) = guard.as_mut() else {
            return Err(LinkError::Closed);
        };
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                Ok(0)
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) => Err(LinkError::Io(err)),
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        let mut guard = lock(&self.writer);
        let Some(port) = guard.as_mut() else {
            return Err(LinkError::Closed);
        };
        port.write(data).map_err(Into::into)
    }

    fn flush(&self) -> Result<()> {
        let mut guard = lock(&self.writer);
        let Some(port) = guard.as_mut() else {
            return Err(LinkError::Closed);
        };
        port.flush().map_err(Into::into)
    }

    fn close(&self) {
        let had_writer = lock(&self.writer).take().is_some();
        let had_reader = lock(&self.reader).take().is_some();
        if had_writer || had_reader {
            debug!(port = %self.name, "closed serial link");
        }
    }

    fn is_open(&self) -> bool {
        lock(&self.reader).is_some()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_115200_with_short_timeout() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.read_timeout, Duration::from_millis(10));
    }

    #[test]
    fn open_missing_port_fails_with_open() {
        let err = SerialLink::open("/dev/linkprims-does-not-exist", &SerialConfig::default())
            .unwrap_err();
        assert!(matches!(err, LinkError::Open { .. }));
    }
}
