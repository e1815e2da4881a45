//! Decoded frame with typed accessors.
//!
//! A [`Frame`] is what remains of a SysEx message once the markers are
//! stripped and the payload is decoded: the command, the direct header
//! fields, and the raw payload bytes.
//!
//! # Example
//!
//! ```
//! use punck_link::protocol::{Command, Frame};
//! use bytes::Bytes;
//!
//! let frame = Frame::new(
//!     Command::GetSamples,
//!     Bytes::from_static(&[1]),
//!     Bytes::from_static(b"KICK    "),
//! );
//! assert_eq!(frame.field(0), Some(1));
//! assert_eq!(frame.payload_len(), 8);
//! ```

use bytes::Bytes;

use super::wire_format::{Command, Encoding};
use crate::codec::FrameCodec;

/// A complete, decoded protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command tag.
    pub command: Command,
    /// Direct header fields following the command byte.
    pub fields: Bytes,
    /// Payload bytes after decoding (nibbles already recombined).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(command: Command, fields: Bytes, payload: Bytes) -> Self {
        Self {
            command,
            fields,
            payload,
        }
    }

    /// Create a frame from slices (copies data).
    pub fn from_parts(command: Command, fields: &[u8], payload: &[u8]) -> Self {
        Self {
            command,
            fields: Bytes::copy_from_slice(fields),
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Header field at `index`, if present.
    #[inline]
    pub fn field(&self, index: usize) -> Option<u8> {
        self.fields.get(index).copied()
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Encode for the wire using the command's static layout.
    pub fn encode(&self) -> Bytes {
        match self.command.layout().encoding {
            Encoding::Direct => {
                let mut body = Vec::with_capacity(self.fields.len() + self.payload.len());
                body.extend_from_slice(&self.fields);
                body.extend_from_slice(&self.payload);
                FrameCodec::encode_direct(self.command, &body)
            }
            Encoding::NibblePacked => {
                FrameCodec::encode_nibble_packed(self.command, &self.fields, &self.payload)
            }
        }
    }
}

/// Build a short direct request frame (`Get*`, `StartStop`, `SaveConfig`).
///
/// # Example
///
/// ```
/// use punck_link::protocol::{build_request, Command};
///
/// let bytes = build_request(Command::GetSequence, &[2, 0]);
/// assert_eq!(&bytes[..], &[0xF0, 0x1B, 2, 0, 0xF7]);
/// ```
pub fn build_request(command: Command, selectors: &[u8]) -> Bytes {
    FrameCodec::encode_direct(command, selectors)
}
