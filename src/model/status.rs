//! Playback status reported by the device.

use crate::error::{PunckError, Result};

/// Snapshot of the device transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    pub playing: bool,
    pub active_sequence: u8,
    pub active_bar: u8,
    pub active_beat: u8,
    /// Audio buffer underruns, on firmware that reports them.
    pub underrun_count: Option<u16>,
}

impl PlaybackStatus {
    /// Minimum status payload: playing, sequence, bar, beat.
    pub const MIN_LEN: usize = 4;

    /// Decode a status payload.
    ///
    /// The underrun counter follows as two 7-bit groups, low group first.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::MIN_LEN {
            return Err(PunckError::PayloadTooShort {
                expected: Self::MIN_LEN,
                actual: payload.len(),
            });
        }
        let underrun_count = match payload.get(4..6) {
            Some(&[low, high]) => Some((low & 0x7F) as u16 | ((high & 0x7F) as u16) << 7),
            _ => None,
        };
        Ok(Self {
            playing: payload[0] != 0,
            active_sequence: payload[1],
            active_bar: payload[2],
            active_beat: payload[3],
            underrun_count,
        })
    }
}
