//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` to collect a SysEx message until its end marker
//! arrives. Implements a state machine for fragmented input:
//! - `WaitingForStart`: bytes outside a frame are discarded
//! - `InFrame`: collecting bytes until `0xF7`
//! - `Discarding`: skipping the rest of a frame that outgrew the limit
//!
//! MIDI real-time bytes (`0xF8..=0xFF`) may legally interleave with a SysEx
//! message and are skipped. Any other status byte aborts the frame in progress.
//!
//! # Example
//!
//! ```
//! use punck_link::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//! assert!(buffer.push(&[0xF0, 0x20, 1]).is_empty());
//! let frames = buffer.push(&[2, 0, 3, 0xF7]);
//! assert_eq!(&frames[0][..], &[0xF0, 0x20, 1, 2, 0, 3, 0xF7]);
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{SYSEX_END, SYSEX_START};

/// Default upper bound on a single frame, markers included.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

/// State machine for frame extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Outside any frame.
    WaitingForStart,
    /// Start marker seen, collecting until the end marker.
    InFrame,
    /// Inside a frame that outgrew the limit, skipping until it ends.
    Discarding,
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Bytes of the frame being collected (start marker included).
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed frame size.
    max_frame_len: usize,
    /// Frames dropped for exceeding the limit.
    oversized: u64,
}

impl FrameBuffer {
    /// Create a new frame buffer with the default frame limit.
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Create a new frame buffer with a custom frame limit.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_frame_len),
            state: State::WaitingForStart,
            max_frame_len,
            oversized: 0,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Each returned frame starts with `0xF0` and ends with `0xF7`.
    /// Partial data is kept for the next push. A frame that grows beyond the
    /// frame limit is dropped on its own; frames before and after it in the
    /// same chunk are still returned.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        data.iter()
            .filter_map(|&byte| self.push_byte(byte))
            .collect()
    }

    /// Number of frames dropped so far for exceeding the frame limit.
    pub fn oversized_count(&self) -> u64 {
        self.oversized
    }

    fn start_frame(&mut self) {
        self.buffer.clear();
        self.buffer.extend_from_slice(&[SYSEX_START]);
        self.state = State::InFrame;
    }

    fn push_byte(&mut self, byte: u8) -> Option<Bytes> {
        match self.state {
            State::WaitingForStart => {
                if byte == SYSEX_START {
                    self.start_frame();
                }
                None
            }

            State::Discarding => {
                match byte {
                    SYSEX_START => self.start_frame(),
                    SYSEX_END | 0x80..=0xF6 => self.state = State::WaitingForStart,
                    _ => {}
                }
                None
            }

            State::InFrame => match byte {
                SYSEX_END => {
                    self.buffer.extend_from_slice(&[byte]);
                    self.state = State::WaitingForStart;
                    Some(self.buffer.split().freeze())
                }
                SYSEX_START => {
                    tracing::warn!(
                        "Discarding unterminated frame of {} bytes",
                        self.buffer.len()
                    );
                    self.start_frame();
                    None
                }
                0xF8..=0xFF => None,
                0x80..=0xF6 => {
                    tracing::warn!(
                        "Status byte {:#04x} aborted frame of {} bytes",
                        byte,
                        self.buffer.len()
                    );
                    self.clear();
                    None
                }
                _ => {
                    if self.buffer.len() + 1 >= self.max_frame_len {
                        tracing::warn!(
                            "Discarding frame exceeding maximum {} bytes",
                            self.max_frame_len
                        );
                        self.oversized += 1;
                        self.buffer.clear();
                        self.state = State::Discarding;
                        return None;
                    }
                    self.buffer.extend_from_slice(&[byte]);
                    None
                }
            },
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForStart;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForStart => "WaitingForStart",
            State::InFrame => "InFrame",
            State::Discarding => "Discarding",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
