use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use bytes::{Bytes, BytesMut};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Append-only byte buffer shared by the worker (appends) and the
/// collector (reset, scan, snapshot).
///
/// Between two resets the length never decreases.
#[derive(Debug)]
pub(crate) struct ReceiveBuffer {
    bytes: Mutex<BytesMut>,
    changed: Condvar,
}

impl ReceiveBuffer {
    pub(crate) fn new() -> Self {
        Self {
            bytes: Mutex::new(BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY)),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BytesMut> {
        // Appends are a single extend; a poisoned guard still holds whole chunks.
        self.bytes.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn append(&self, data: &[u8]) {
        self.lock().extend_from_slice(data);
        self.changed.notify_all();
    }

    /// Wake a collector blocked in [`wait_for_growth`](Self::wait_for_growth).
    pub(crate) fn notify(&self) {
        self.changed.notify_all();
    }

    /// Empty the buffer, returning its length before the reset.
    pub(crate) fn reset(&self) -> usize {
        let mut bytes = self.lock();
        let len = bytes.len();
        bytes.clear();
        len
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Advance `cursor` over bytes appended since the last scan.
    ///
    /// Returns the current length and whether `delimiter` was found. The
    /// cursor stops just past the delimiter, so no byte is examined twice.
    pub(crate) fn scan(&self, cursor: &mut usize, delimiter: Option<u8>) -> (usize, bool) {
        let bytes = self.lock();
        let len = bytes.len();
        let Some(delimiter) = delimiter else {
            return (len, false);
        };
        while *cursor < len {
            let byte = bytes[*cursor];
            *cursor += 1;
            if byte == delimiter {
                return (len, true);
            }
        }
        (len, false)
    }

    pub(crate) fn snapshot(&self) -> Bytes {
        let bytes = self.lock();
        Bytes::copy_from_slice(&bytes[..])
    }

    /// Block until the length differs from `seen`, a notify, or `timeout`.
    pub(crate) fn wait_for_growth(&self, seen: usize, timeout: Duration) {
        let guard = self.lock();
        if guard.len() != seen || timeout.is_zero() {
            return;
        }
        let _ = self.changed.wait_timeout(guard, timeout);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    #[test]
    fn scan_stops_past_delimiter_and_resumes() {
        let buf = ReceiveBuffer::new();
        buf.append(b"ab\ncd\n");

        let mut cursor = 0;
        assert_eq!(buf.scan(&mut cursor, Some(b'\n')), (6, true));
        assert_eq!(cursor, 3);
        assert_eq!(buf.scan(&mut cursor, Some(b'\n')), (6, true));
        assert_eq!(cursor, 6);
        assert_eq!(buf.scan(&mut cursor, Some(b'\n')), (6, false));
        assert_eq!(cursor, 6);
    }

    #[test]
    fn scan_without_delimiter_examines_nothing() {
        let buf = ReceiveBuffer::new();
        buf.append(b"abc");
        let mut cursor = 0;
        assert_eq!(buf.scan(&mut cursor, None), (3, false));
        assert_eq!(cursor, 0);
    }

    #[test]
    fn reset_reports_previous_length() {
        let buf = ReceiveBuffer::new();
        buf.append(b"12345");
        assert_eq!(buf.reset(), 5);
        assert_eq!(buf.len(), 0);
        assert!(buf.snapshot().is_empty());
    }

    #[test]
    fn wait_wakes_on_append() {
        let buf = Arc::new(ReceiveBuffer::new());
        let appender = {
            let buf = Arc::clone(&buf);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                buf.append(b"x");
            })
        };

        let start = Instant::now();
        while buf.len() == 0 && start.elapsed() < Duration::from_secs(5) {
            buf.wait_for_growth(0, Duration::from_secs(5));
        }
        assert_eq!(buf.len(), 1);
        assert!(start.elapsed() < Duration::from_secs(5));
        appender.join().unwrap();
    }
}
