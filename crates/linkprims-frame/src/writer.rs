use bytes::BytesMut;
use linkprims_link::{Link, LinkError};
use tracing::trace;

use crate::codec::encode_frame;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes SLIP-encoded frames to a [`Link`].
///
/// The encode buffer is reused across sends.
#[derive(Debug)]
pub struct FrameWriter {
    buf: BytesMut,
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameWriter {
    /// Create a new frame writer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode `payload` and write it to `link` (blocking until fully written).
    ///
    /// Returns the number of wire bytes written.
    pub fn send(&mut self, link: &dyn Link, payload: &[u8]) -> Result<usize> {
        self.buf.clear();
        encode_frame(payload, &mut self.buf);
        write_all(link, &self.buf)?;
        trace!(
            link = link.name(),
            payload = payload.len(),
            wire = self.buf.len(),
            "sent frame"
        );
        Ok(self.buf.len())
    }
}

/// Write every byte of `data` to `link`, then flush.
pub fn write_all(link: &dyn Link, data: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < data.len() {
        match link.write(&data[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(LinkError::Io(err)) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    link.flush().map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use linkprims_link::{LoopbackConfig, LoopbackLink};

    use super::*;
    use crate::codec::{END, ESC, ESC_END};
    use crate::extract::extract_frames;

    fn sink() -> LoopbackLink {
        LoopbackLink::with_config(
            "sink",
            LoopbackConfig {
                echo: false,
                ..LoopbackConfig::default()
            },
        )
    }

    #[test]
    fn send_writes_encoded_frame() {
        let link = sink();
        let mut writer = FrameWriter::new();

        let n = writer.send(&link, &[0x01, END]).unwrap();
        assert_eq!(n, 5);
        assert_eq!(link.take_written().as_ref(), &[END, 0x01, ESC, ESC_END, END]);
    }

    #[test]
    fn sent_frames_extract_back() {
        let link = sink();
        let mut writer = FrameWriter::new();
        writer.send(&link, b"alpha").unwrap();
        writer.send(&link, b"beta").unwrap();

        let wire = link.take_written();
        let out = extract_frames(&wire);
        let payloads: Vec<_> = out.payloads().map(|p| p.to_vec()).collect();
        assert_eq!(payloads, vec![b"alpha".to_vec(), b"beta".to_vec()]);
    }

    #[test]
    fn send_on_closed_link_fails() {
        let link = sink();
        link.close();
        let err = FrameWriter::new().send(&link, b"x").unwrap_err();
        assert!(matches!(err, FrameError::Link(LinkError::Closed)));
    }

    struct OneByteLink(LoopbackLink);

    impl Link for OneByteLink {
        fn read(&self, buf: &mut [u8]) -> linkprims_link::Result<usize> {
            self.0.read(buf)
        }
        fn write(&self, data: &[u8]) -> linkprims_link::Result<usize> {
            self.0.write(&data[..data.len().min(1)])
        }
        fn close(&self) {
            self.0.close()
        }
        fn is_open(&self) -> bool {
            self.0.is_open()
        }
        fn name(&self) -> &str {
            self.0.name()
        }
    }

    #[test]
    fn partial_writes_are_completed() {
        let link = OneByteLink(sink());
        write_all(&link, b"slow link").unwrap();
        assert_eq!(link.0.take_written().as_ref(), b"slow link");
    }
}
