//! Drain a byte link in the background, collect what arrived under
//! delimiter/size/timeout conditions, and split it into SLIP frames.
//!
//! # Crate Structure
//!
//! - [`link`]: Link abstraction and adapters (loopback, Unix socket, serial behind `serial`)
//! - [`frame`]: SLIP encoding and streaming frame extraction
//! - [`reader`]: Background reader worker, collector and stop coordination

/// Re-export link types.
pub mod link {
    pub use linkprims_link::*;
}

/// Re-export frame types.
pub mod frame {
    pub use linkprims_frame::*;
}

/// Re-export reader types.
pub mod reader {
    pub use linkprims_reader::*;
}
