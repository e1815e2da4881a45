//! Outputs of the sequencer.

use std::time::Duration;

use bytes::Bytes;

use crate::catalog::Voice;
use crate::model::PlaybackStatus;

/// Transport availability as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Model change notification for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    SampleBankUpdated(u8),
    /// Grid replaced by an empty one of these dimensions.
    GridReallocated { seq: u8, beats_per_bar: u8, bars: u8 },
    BarUpdated { seq: u8, bar: u8 },
    VoiceConfigUpdated(Voice),
    AdcUpdated,
    ReverbUpdated,
    StatusUpdated(PlaybackStatus),
    /// Every bar of a sequence has been fetched.
    SequenceLoaded(u8),
    /// Every configurable voice has been fetched.
    ConfigLoaded,
    Connection(ConnectionState),
}

/// Something the sequencer's owner must do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write one encoded frame to the transport.
    Send(Bytes),
    /// Replace the status timer deadline.
    ArmStatusPoll(Duration),
    Notify(SyncEvent),
}

impl Effect {
    /// Frame bytes, if this is a send.
    pub fn sent(&self) -> Option<&Bytes> {
        match self {
            Effect::Send(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Collect the frames sent by a batch of effects.
pub fn sent_frames(effects: &[Effect]) -> Vec<Bytes> {
    effects.iter().filter_map(Effect::sent).cloned().collect()
}
