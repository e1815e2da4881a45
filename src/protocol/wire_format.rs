//! Wire format constants and the static command layout table.
//!
//! Every frame on the wire has the shape:
//! ```text
//! ┌───────┬─────────┬────────────────┬──────────────────┬─────┐
//! │ START │ Command │ Header fields  │ Payload          │ END │
//! │ 0xF0  │ 1 byte  │ direct, 7-bit  │ direct | nibbles │ 0xF7│
//! └───────┴─────────┴────────────────┴──────────────────┴─────┘
//! ```
//!
//! The frame does not describe its own encoding. Which encoding the payload
//! uses, and how many bytes precede it, is fixed per command by [`Command::layout`].

use crate::error::{PunckError, Result};

/// SysEx start marker.
pub const SYSEX_START: u8 = 0xF0;

/// SysEx end marker.
pub const SYSEX_END: u8 = 0xF7;

/// Mask of the bits a transported data byte may carry.
pub const DATA_MASK: u8 = 0x7F;

/// Sequence id asking the device for whichever sequence it is playing.
pub const ACTIVE_SEQUENCE: u8 = 127;

/// Bytes of framing overhead (START + command + END).
pub const FRAME_OVERHEAD: usize = 3;

/// Payload encoding used after the header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Bytes carried as-is; every byte must already be below 0x80.
    Direct,
    /// Each byte split into a low nibble then a high nibble.
    NibblePacked,
}

/// Static framing of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Payload encoding.
    pub encoding: Encoding,
    /// Bytes before the payload, counting START and the command byte.
    pub header_len: usize,
}

impl Layout {
    const fn new(encoding: Encoding, header_len: usize) -> Self {
        Self {
            encoding,
            header_len,
        }
    }

    /// Number of direct header fields between the command byte and the payload.
    #[inline]
    pub fn field_count(&self) -> usize {
        self.header_len - 2
    }
}

/// SysEx command tags understood by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    StartStop = 0x1A,
    GetSequence = 0x1B,
    SetSequence = 0x1C,
    GetVoiceConfig = 0x1D,
    SetVoiceConfig = 0x1E,
    GetSamples = 0x1F,
    GetStatus = 0x20,
    SaveConfig = 0x21,
    GetReverbConfig = 0x22,
    SetReverbConfig = 0x23,
    GetAdc = 0x24,
    SetAdc = 0x25,
}

/// Every command, in code order.
pub const COMMANDS: [Command; 12] = [
    Command::StartStop,
    Command::GetSequence,
    Command::SetSequence,
    Command::GetVoiceConfig,
    Command::SetVoiceConfig,
    Command::GetSamples,
    Command::GetStatus,
    Command::SaveConfig,
    Command::GetReverbConfig,
    Command::SetReverbConfig,
    Command::GetAdc,
    Command::SetAdc,
];

impl Command {
    /// Wire code of this command.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a command by its wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        COMMANDS.iter().copied().find(|c| c.code() == code)
    }

    /// Like [`Command::from_code`] but returns an error for unknown codes.
    pub fn try_from_code(code: u8) -> Result<Self> {
        Self::from_code(code).ok_or(PunckError::UnknownCommand(code))
    }

    /// Static layout of payload-bearing frames for this command.
    ///
    /// Applies to device responses and to outbound `Set*` frames. Outbound
    /// `Get*` requests are short direct selector frames instead.
    pub fn layout(self) -> Layout {
        use Encoding::*;
        match self {
            Command::StartStop => Layout::new(Direct, 2),
            Command::GetSequence | Command::SetSequence => Layout::new(Direct, 6),
            Command::GetVoiceConfig | Command::SetVoiceConfig => Layout::new(NibblePacked, 3),
            Command::GetSamples => Layout::new(Direct, 3),
            Command::GetStatus => Layout::new(Direct, 2),
            Command::SaveConfig => Layout::new(Direct, 2),
            Command::GetReverbConfig | Command::SetReverbConfig => Layout::new(NibblePacked, 2),
            Command::GetAdc | Command::SetAdc => Layout::new(NibblePacked, 2),
        }
    }
}

/// Check that a byte can travel inside a frame.
#[inline]
pub fn is_data_byte(byte: u8) -> bool {
    byte & !DATA_MASK == 0
}
