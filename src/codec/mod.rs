//! Codec module - frame encoding and decoding.
//!
//! This module provides the two payload encodings and the frame codec that
//! wraps them:
//!
//! - [`DirectCodec`] - 7-bit bytes carried unchanged
//! - [`NibbleCodec`] - each 8-bit byte split into two nibbles
//! - [`FrameCodec`] - adds the start/end markers and strips them again
//!
//! # Design
//!
//! Codecs are marker structs with static methods. The encoding of a frame is
//! never inferred from its contents: callers pass it explicitly, or use
//! [`FrameCodec::decode_frame`] which reads it from the static layout table.
//!
//! # Example
//!
//! ```
//! use punck_link::codec::FrameCodec;
//! use punck_link::protocol::{Command, Encoding};
//!
//! let bytes = FrameCodec::encode_nibble_packed(Command::SetVoiceConfig, &[1], &[0xFF]);
//! assert_eq!(&bytes[..], &[0xF0, 0x1E, 1, 0x0F, 0x0F, 0xF7]);
//!
//! let frame = FrameCodec::decode(&bytes, Encoding::NibblePacked, 3).unwrap();
//! assert_eq!(frame.field(0), Some(1));
//! assert_eq!(frame.payload(), &[0xFF]);
//! ```

mod direct;
mod nibble;

pub use direct::DirectCodec;
pub use nibble::NibbleCodec;

use bytes::Bytes;

use crate::error::{PunckError, Result};
use crate::protocol::{Command, Encoding, Frame, SYSEX_END, SYSEX_START};

/// Frame codec: markers plus one of the payload encodings.
pub struct FrameCodec;

impl FrameCodec {
    /// Wrap bytes unchanged between the start and end markers.
    ///
    /// Every byte must be below 0x80. This is not checked.
    pub fn encode_direct(command: Command, data: &[u8]) -> Bytes {
        let mut buf = Vec::with_capacity(data.len() + 3);
        buf.push(SYSEX_START);
        buf.push(command.code());
        DirectCodec::encode_into(data, &mut buf);
        buf.push(SYSEX_END);
        Bytes::from(buf)
    }

    /// Wrap direct header fields followed by a nibble-packed payload.
    ///
    /// The payload occupies `2 * data.len()` transport bytes.
    pub fn encode_nibble_packed(command: Command, fields: &[u8], data: &[u8]) -> Bytes {
        let mut buf = Vec::with_capacity(fields.len() + data.len() * 2 + 3);
        buf.push(SYSEX_START);
        buf.push(command.code());
        DirectCodec::encode_into(fields, &mut buf);
        NibbleCodec::pack_into(data, &mut buf);
        buf.push(SYSEX_END);
        Bytes::from(buf)
    }

    /// Decode a complete frame with a caller-supplied encoding and header length.
    ///
    /// `header_len` counts the start marker and the command byte.
    ///
    /// # Errors
    ///
    /// - [`PunckError::FrameTooShort`] if the frame is shorter than `header_len + 1`
    /// - [`PunckError::Protocol`] if either marker is missing
    /// - [`PunckError::UnknownCommand`] if the command byte is not recognised
    pub fn decode(raw: &[u8], encoding: Encoding, header_len: usize) -> Result<Frame> {
        let min = header_len.max(2) + 1;
        if raw.len() < min {
            return Err(PunckError::FrameTooShort {
                len: raw.len(),
                min,
            });
        }
        if raw[0] != SYSEX_START {
            return Err(PunckError::Protocol(format!(
                "Missing start marker, got {:#04x}",
                raw[0]
            )));
        }
        let last = raw[raw.len() - 1];
        if last != SYSEX_END {
            return Err(PunckError::Protocol(format!(
                "Missing end marker, got {:#04x}",
                last
            )));
        }

        let command = Command::try_from_code(raw[1])?;
        let header_len = header_len.max(2);
        let fields = &raw[2..header_len];
        let body = &raw[header_len..raw.len() - 1];

        let payload = match encoding {
            Encoding::Direct => Bytes::copy_from_slice(DirectCodec::decode(body)),
            Encoding::NibblePacked => Bytes::from(NibbleCodec::unpack(body)),
        };

        Ok(Frame::new(command, Bytes::copy_from_slice(fields), payload))
    }

    /// Decode a frame using the static layout of its command byte.
    pub fn decode_frame(raw: &[u8]) -> Result<Frame> {
        if raw.len() < 2 {
            return Err(PunckError::FrameTooShort {
                len: raw.len(),
                min: 3,
            });
        }
        let layout = Command::try_from_code(raw[1])?.layout();
        Self::decode(raw, layout.encoding, layout.header_len)
    }
}
