//! Direct codec - 7-bit bytes carried as-is.
//!
//! Used where every value is known to fit in 7 bits: sequence grid cells
//! (level and variation are 0-127), sample names, status fields and the
//! short selector bytes of requests.
//!
//! The codec does not mask or reject bytes with the high bit set. Such a
//! byte would be read as a status byte by the receiving side and break the
//! frame; keeping inputs below 0x80 is the caller's responsibility.
//!
//! # Example
//!
//! ```
//! use punck_link::codec::DirectCodec;
//!
//! assert!(DirectCodec::is_transportable(&[0, 64, 127]));
//! assert!(!DirectCodec::is_transportable(&[0x80]));
//! ```

use crate::protocol::is_data_byte;

/// Codec that passes bytes through without transformation.
pub struct DirectCodec;

impl DirectCodec {
    /// Append bytes unchanged.
    #[inline]
    pub fn encode_into(data: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(data);
    }

    /// Decode - returns the input unchanged.
    #[inline]
    pub fn decode(data: &[u8]) -> &[u8] {
        data
    }

    /// Check whether every byte can travel without breaking the frame.
    pub fn is_transportable(data: &[u8]) -> bool {
        data.iter().all(|&b| is_data_byte(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_unchanged() {
        let mut out = vec![0xF0];
        DirectCodec::encode_into(&[1, 2, 127], &mut out);
        assert_eq!(out, vec![0xF0, 1, 2, 127]);
    }

    #[test]
    fn test_decode_is_identity() {
        let data = [9u8, 8, 7];
        assert_eq!(DirectCodec::decode(&data), &data);
    }

    #[test]
    fn test_high_bit_passes_through_unmasked() {
        let mut out = Vec::new();
        DirectCodec::encode_into(&[0x80, 0xFF], &mut out);
        assert_eq!(out, vec![0x80, 0xFF]);
        assert!(!DirectCodec::is_transportable(&out));
    }
}
