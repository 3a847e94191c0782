//! SLIP framing over byte links.
//!
//! Frames are delimited by an END marker (0xC0). Inside a frame END and ESC
//! (0xDB) are replaced by two-byte escape sequences, so a receiver can find
//! boundaries without any length prefix.
//!
//! Extraction never aborts on bad input: malformed candidates and the
//! incomplete remainder are reported alongside the decoded frames.

pub mod codec;
pub mod error;
pub mod extract;
pub mod writer;

pub use codec::{decode_frame, encode_frame, encoded_len, is_valid, Frame, END, ESC, ESC_END, ESC_ESC};
pub use error::{FrameError, Result};
pub use extract::{
    extract_frames, Extraction, FrameExtractor, MalformedFrame, RemainderPolicy, DEFAULT_MAX_CARRY,
};
pub use writer::{write_all, FrameWriter};
