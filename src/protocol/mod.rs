//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the SysEx framing used by the module:
//! - start/end markers and the static command layout table
//! - frame buffer for extracting frames from a fragmented byte stream
//! - decoded frame struct with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_request, Frame};
pub use frame_buffer::{FrameBuffer, DEFAULT_MAX_FRAME_LEN};
pub use wire_format::{
    is_data_byte, Command, Encoding, Layout, ACTIVE_SEQUENCE, COMMANDS, DATA_MASK,
    FRAME_OVERHEAD, SYSEX_END, SYSEX_START,
};
