use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame boundary marker.
pub const END: u8 = 0xC0;

/// Escape byte.
pub const ESC: u8 = 0xDB;

/// Follows ESC to encode a literal END.
pub const ESC_END: u8 = 0xDC;

/// Follows ESC to encode a literal ESC.
pub const ESC_ESC: u8 = 0xDD;

/// A decoded frame located within a byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Offset of the first raw byte within the scanned range.
    pub offset: usize,
    /// Raw escaped bytes, including the closing END marker.
    pub raw: Bytes,
    /// Unescaped payload.
    pub payload: Bytes,
}

impl Frame {
    /// The number of bytes this frame occupied on the wire.
    pub fn wire_size(&self) -> usize {
        self.raw.len()
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────────────────┬──────┐
/// │ END  │ payload, END -> ESC ESC_END           │ END  │
/// │ 0xC0 │          ESC -> ESC ESC_ESC           │ 0xC0 │
/// └──────┴──────────────────────────────────────┴──────┘
/// ```
///
/// The leading END flushes any line noise accumulated on the receiver.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(encoded_len(payload));
    dst.put_u8(END);
    for &byte in payload {
        match byte {
            END => dst.put_slice(&[ESC, ESC_END]),
            ESC => dst.put_slice(&[ESC, ESC_ESC]),
            other => dst.put_u8(other),
        }
    }
    dst.put_u8(END);
}

/// Exact encoded size of `payload`, markers included.
pub fn encoded_len(payload: &[u8]) -> usize {
    2 + payload.len() + payload.iter().filter(|&&b| b == END || b == ESC).count()
}

/// Returns true if `raw` is a well-formed frame.
///
/// A frame is well formed when it contains no END bytes other than leading
/// or trailing ones, and every ESC is followed by ESC_END or ESC_ESC.
pub fn is_valid(raw: &[u8]) -> bool {
    unescape(raw, |_| {}).is_ok()
}

/// Decode a raw frame (leading/trailing END markers optional) into its payload.
pub fn decode_frame(raw: &[u8]) -> Result<Bytes> {
    let mut out = BytesMut::with_capacity(raw.len());
    unescape(raw, |b| out.put_u8(b))?;
    Ok(out.freeze())
}

fn unescape(raw: &[u8], mut emit: impl FnMut(u8)) -> Result<()> {
    let start = raw.iter().position(|&b| b != END).unwrap_or(raw.len());
    let end = raw.iter().rposition(|&b| b != END).map_or(start, |i| i + 1);
    let body = &raw[..end];

    let mut i = start;
    while i < end {
        match body[i] {
            END => return Err(FrameError::UnexpectedEnd { offset: i }),
            ESC => {
                let next = *body.get(i + 1).ok_or(FrameError::TrailingEscape)?;
                match next {
                    ESC_END => emit(END),
                    ESC_ESC => emit(ESC),
                    byte => return Err(FrameError::InvalidEscape { offset: i, byte }),
                }
                i += 2;
            }
            byte => {
                emit(byte);
                i += 1;
            }
        }
    }
    Ok(())
}
