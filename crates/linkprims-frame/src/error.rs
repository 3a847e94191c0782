use linkprims_link::LinkError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An ESC byte was followed by something other than ESC_END or ESC_ESC.
    #[error("invalid escape sequence at offset {offset}: ESC followed by 0x{byte:02X}")]
    InvalidEscape { offset: usize, byte: u8 },

    /// The frame ended while an ESC byte was still pending.
    #[error("frame ends with a dangling ESC byte")]
    TrailingEscape,

    /// An END byte appeared inside the frame body.
    #[error("unexpected END byte at offset {offset}")]
    UnexpectedEnd { offset: usize },

    /// A link error occurred while writing frames.
    #[error("frame link error: {0}")]
    Link(#[from] LinkError),

    /// The link accepted zero bytes before the frame was fully written.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
