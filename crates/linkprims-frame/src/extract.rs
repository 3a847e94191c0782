use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::{decode_frame, Frame, END};
use crate::error::FrameError;

/// Default cap on bytes carried between extraction passes.
pub const DEFAULT_MAX_CARRY: usize = 64 * 1024;

/// A candidate frame that failed validation.
#[derive(Debug)]
pub struct MalformedFrame {
    /// Offset of the first raw byte within the scanned range.
    pub offset: usize,
    /// Raw candidate bytes, including the closing END marker.
    pub raw: Bytes,
    /// Why the candidate was rejected.
    pub error: FrameError,
}

/// Result of one extraction pass.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Decoded frames, in stream order.
    pub frames: Vec<Frame>,
    /// Rejected candidates, in stream order.
    pub malformed: Vec<MalformedFrame>,
    /// Bytes after the last END marker (an incomplete frame).
    pub trailing: Bytes,
    /// END markers that closed no payload (leading or back-to-back markers).
    pub empty_boundaries: usize,
}

impl Extraction {
    /// Payloads of the decoded frames.
    pub fn payloads(&self) -> impl Iterator<Item = &Bytes> {
        self.frames.iter().map(|f| &f.payload)
    }

    /// True if nothing was found at all.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.malformed.is_empty() && self.trailing.is_empty()
    }
}

/// Scan `bytes` for END-delimited frames.
///
/// Each candidate runs from the cursor through the next END marker. Valid
/// candidates are decoded, invalid ones are reported in
/// [`Extraction::malformed`] and scanning continues after their marker.
/// Bytes after the last marker are reported in [`Extraction::trailing`] and
/// not decoded. Single pass, no byte before the cursor is revisited.
pub fn extract_frames(bytes: &[u8]) -> Extraction {
    let mut out = Extraction::default();
    let mut cursor = 0usize;

    while cursor < bytes.len() {
        let Some(rel) = bytes[cursor..].iter().position(|&b| b == END) else {
            out.trailing = Bytes::copy_from_slice(&bytes[cursor..]);
            warn!(
                offset = cursor,
                len = out.trailing.len(),
                "dropping incomplete trailing frame"
            );
            break;
        };
        let marker = cursor + rel;

        if marker == cursor {
            out.empty_boundaries += 1;
        } else {
            let candidate = &bytes[cursor..=marker];
            match decode_frame(candidate) {
                Ok(payload) => out.frames.push(Frame {
                    offset: cursor,
                    raw: Bytes::copy_from_slice(candidate),
                    payload,
                }),
                Err(error) => {
                    warn!(
                        offset = cursor,
                        len = candidate.len(),
                        %error,
                        "malformed frame"
                    );
                    out.malformed.push(MalformedFrame {
                        offset: cursor,
                        raw: Bytes::copy_from_slice(candidate),
                        error,
                    });
                }
            }
        }

        cursor = marker + 1;
    }

    debug!(
        scanned = bytes.len(),
        frames = out.frames.len(),
        malformed = out.malformed.len(),
        trailing = out.trailing.len(),
        "frame extraction pass"
    );
    out
}

/// What happens to an incomplete trailing frame between passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemainderPolicy {
    /// Report and discard it. A frame split across two passes is lost.
    #[default]
    Drop,
    /// Keep it and prepend it to the next pass.
    CarryOver,
}

/// Extraction across successive byte ranges (e.g. one per collection call).
///
/// With [`RemainderPolicy::CarryOver`], frame offsets in an [`Extraction`]
/// are relative to the carried bytes followed by the new input.
#[derive(Debug)]
pub struct FrameExtractor {
    policy: RemainderPolicy,
    carry: BytesMut,
    max_carry: usize,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(RemainderPolicy::default())
    }
}

impl FrameExtractor {
    /// Create an extractor with the given remainder policy.
    pub fn new(policy: RemainderPolicy) -> Self {
        Self {
            policy,
            carry: BytesMut::new(),
            max_carry: DEFAULT_MAX_CARRY,
        }
    }

    /// Override the cap on carried bytes.
    pub fn with_max_carry(mut self, max_carry: usize) -> Self {
        self.max_carry = max_carry;
        self
    }

    /// Run one extraction pass over `bytes`.
    pub fn push(&mut self, bytes: &[u8]) -> Extraction {
        if self.policy == RemainderPolicy::Drop {
            return extract_frames(bytes);
        }

        let extraction = if self.carry.is_empty() {
            extract_frames(bytes)
        } else {
            self.carry.extend_from_slice(bytes);
            let input = self.carry.split().freeze();
            extract_frames(&input)
        };

        if extraction.trailing.len() > self.max_carry {
            warn!(
                len = extraction.trailing.len(),
                max = self.max_carry,
                "remainder exceeds carry limit; dropping"
            );
        } else {
            self.carry.extend_from_slice(&extraction.trailing);
        }
        extraction
    }

    /// Bytes currently held for the next pass.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Drop any carried bytes.
    pub fn reset(&mut self) {
        self.carry.clear();
    }

    /// The configured remainder policy.
    pub fn policy(&self) -> RemainderPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, ESC, ESC_END, ESC_ESC};

    fn encoded(payloads: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for p in payloads {
            encode_frame(p, &mut buf);
        }
        buf.to_vec()
    }

    #[test]
    fn payload_with_marker_and_escape_survives() {
        let original = [0x01, END, 0x02, ESC, 0x03, 0x00, 0xFF];
        let wire = encoded(&[&original]);

        let out = extract_frames(&wire);
        assert_eq!(out.frames.len(), 1);
        assert_eq!(out.frames[0].payload.as_ref(), &original);
        assert!(out.malformed.is_empty());
        assert!(out.trailing.is_empty());
    }

    #[test]
    fn two_frames_then_partial_third() {
        let mut wire = encoded(&[b"first", b"second"]);
        wire.extend_from_slice(&[END, b'p', b'a', b'r']);

        let out = extract_frames(&wire);
        let payloads: Vec<_> = out.payloads().map(|p| p.to_vec()).collect();
        assert_eq!(payloads, vec![b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(out.trailing.as_ref(), b"par");
        assert!(out.malformed.is_empty());
    }

    #[test]
    fn trailing_escape_is_reported_and_scan_continues() {
        let mut wire = vec![b'a', ESC, END];
        wire.extend_from_slice(&encoded(&[b"next"]));

        let out = extract_frames(&wire);
        assert_eq!(out.malformed.len(), 1);
        assert_eq!(out.malformed[0].offset, 0);
        assert_eq!(out.malformed[0].raw.as_ref(), &[b'a', ESC, END]);
        assert!(matches!(out.malformed[0].error, FrameError::TrailingEscape));

        assert_eq!(out.frames.len(), 1);
        assert_eq!(out.frames[0].payload.as_ref(), b"next");
    }

    #[test]
    fn bad_escape_between_good_frames() {
        let mut wire = encoded(&[b"one"]);
        wire.extend_from_slice(&[b'x', ESC, 0x10, b'y', END]);
        wire.extend_from_slice(&encoded(&[b"two"]));

        let out = extract_frames(&wire);
        assert_eq!(out.frames.len(), 2);
        assert_eq!(out.malformed.len(), 1);
        assert!(out.frames[0].offset < out.malformed[0].offset);
        assert!(out.malformed[0].offset < out.frames[1].offset);
    }

    #[test]
    fn unframed_bytes_are_all_trailing() {
        let out = extract_frames(b"no markers here");
        assert!(out.frames.is_empty());
        assert_eq!(out.trailing.as_ref(), b"no markers here");
    }

    #[test]
    fn leading_bytes_before_first_marker_form_a_frame() {
        let out = extract_frames(&[b'h', b'i', END]);
        assert_eq!(out.frames.len(), 1);
        assert_eq!(out.frames[0].payload.as_ref(), b"hi");
        assert_eq!(out.frames[0].wire_size(), 3);
    }

    #[test]
    fn back_to_back_markers_count_as_empty_boundaries() {
        let out = extract_frames(&[END, END, END]);
        assert!(out.is_empty());
        assert_eq!(out.empty_boundaries, 3);
    }

    #[test]
    fn empty_input() {
        let out = extract_frames(&[]);
        assert!(out.is_empty());
        assert_eq!(out.empty_boundaries, 0);
    }

    #[test]
    fn escaped_sequences_decode_inside_stream() {
        let wire = [END, ESC, ESC_END, ESC, ESC_ESC, END];
        let out = extract_frames(&wire);
        assert_eq!(out.frames[0].payload.as_ref(), &[END, ESC]);
    }

    #[test]
    fn drop_policy_loses_split_frame() {
        let wire = encoded(&[b"straddle"]);
        let (head, tail) = wire.split_at(4);

        let mut extractor = FrameExtractor::default();
        let first = extractor.push(head);
        assert!(first.frames.is_empty());
        assert_eq!(first.trailing.len(), 3);
        assert_eq!(extractor.pending(), 0);

        let second = extractor.push(tail);
        assert_eq!(second.frames.len(), 1);
        assert_ne!(second.frames[0].payload.as_ref(), b"straddle");
    }

    #[test]
    fn carry_over_policy_rejoins_split_frame() {
        let wire = encoded(&[b"straddle"]);
        let (head, tail) = wire.split_at(4);

        let mut extractor = FrameExtractor::new(RemainderPolicy::CarryOver);
        let first = extractor.push(head);
        assert!(first.frames.is_empty());
        assert_eq!(extractor.pending(), 3);

        let second = extractor.push(tail);
        assert_eq!(second.frames.len(), 1);
        assert_eq!(second.frames[0].payload.as_ref(), b"straddle");
        assert_eq!(extractor.pending(), 0);
    }

    #[test]
    fn carry_over_respects_limit() {
        let mut extractor = FrameExtractor::new(RemainderPolicy::CarryOver).with_max_carry(4);
        extractor.push(b"way too long to carry");
        assert_eq!(extractor.pending(), 0);

        extractor.push(b"abc");
        assert_eq!(extractor.pending(), 3);
        extractor.reset();
        assert_eq!(extractor.pending(), 0);
    }
}
