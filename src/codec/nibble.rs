//! Nibble-packed codec for full 8-bit payloads.
//!
//! SysEx data bytes cannot carry the high bit, so every byte is sent as two
//! transport bytes: the low nibble first, then the high nibble. Output is
//! always twice the input length and every transport byte is below 16.
//!
//! # Example
//!
//! ```
//! use punck_link::codec::NibbleCodec;
//!
//! let packed = NibbleCodec::pack(&[0xAB, 0x07]);
//! assert_eq!(packed, vec![0x0B, 0x0A, 0x07, 0x00]);
//! assert_eq!(NibbleCodec::unpack(&packed), vec![0xAB, 0x07]);
//! ```

/// Codec splitting bytes into 4-bit halves.
pub struct NibbleCodec;

impl NibbleCodec {
    /// Split one byte into `[low, high]` nibbles.
    #[inline]
    pub fn pack_byte(byte: u8) -> [u8; 2] {
        [byte & 0x0F, byte >> 4]
    }

    /// Recombine a low and a high nibble.
    #[inline]
    pub fn unpack_byte(low: u8, high: u8) -> u8 {
        (low & 0x0F) | ((high & 0x0F) << 4)
    }

    /// Pack a byte slice into nibbles.
    pub fn pack(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() * 2);
        Self::pack_into(data, &mut out);
        out
    }

    /// Pack a byte slice, appending to an existing buffer.
    pub fn pack_into(data: &[u8], out: &mut Vec<u8>) {
        for &byte in data {
            out.extend_from_slice(&Self::pack_byte(byte));
        }
    }

    /// Recombine nibble pairs into bytes.
    ///
    /// An odd trailing nibble becomes a byte holding only that low nibble.
    pub fn unpack(nibbles: &[u8]) -> Vec<u8> {
        nibbles
            .chunks(2)
            .map(|pair| Self::unpack_byte(pair[0], pair.get(1).copied().unwrap_or(0)))
            .collect()
    }
}
