//! Local mirror of the device state.
//!
//! [`DeviceModel`] aggregates everything the editor displays. It is owned
//! by the [`SyncSequencer`](crate::sync::SyncSequencer), which applies
//! device responses to it; edits go through
//! [`EditPublisher`](crate::publish::EditPublisher).

mod grid;
mod samples;
mod status;

pub use grid::{Cell, SequenceGrid, MAX_CELL_VALUE};
pub use samples::SampleBank;
pub use status::PlaybackStatus;

use std::collections::BTreeMap;

use crate::catalog::{ResourceCatalog, Voice};
use crate::error::{PunckError, Result};
use crate::params::ParameterBlock;

/// Beats per bar of a freshly created grid.
pub const DEFAULT_BEATS_PER_BAR: u8 = 16;

/// Editable and displayed device state.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceModel {
    /// Grid of the displayed sequence.
    pub grid: SequenceGrid,
    /// Parameter block per configurable voice.
    pub voices: BTreeMap<Voice, ParameterBlock>,
    pub adc: ParameterBlock,
    pub reverb: ParameterBlock,
    /// Sample names keyed by bank id.
    pub sample_banks: BTreeMap<u8, SampleBank>,
    /// Last reported playback status.
    pub status: Option<PlaybackStatus>,
}

impl DeviceModel {
    /// Model with a one-bar empty grid and zeroed parameter blocks.
    pub fn new(catalog: &ResourceCatalog) -> Self {
        let voices = catalog
            .config_voices
            .iter()
            .filter_map(|&voice| {
                catalog
                    .voice_schema(voice)
                    .ok()
                    .map(|schema| (voice, ParameterBlock::zeroed(schema)))
            })
            .collect();

        Self {
            grid: SequenceGrid::new(0, DEFAULT_BEATS_PER_BAR, 1, catalog.grid_voice_count()),
            voices,
            adc: ParameterBlock::zeroed(catalog.adc),
            reverb: ParameterBlock::zeroed(catalog.reverb),
            sample_banks: BTreeMap::new(),
            status: None,
        }
    }

    /// Parameter block of a voice.
    pub fn voice(&self, voice: Voice) -> Result<&ParameterBlock> {
        self.voices
            .get(&voice)
            .ok_or(PunckError::NoParameterBlock(voice.label()))
    }

    /// Mutable parameter block of a voice.
    pub fn voice_mut(&mut self, voice: Voice) -> Result<&mut ParameterBlock> {
        self.voices
            .get_mut(&voice)
            .ok_or(PunckError::NoParameterBlock(voice.label()))
    }

    /// Sequence id currently displayed.
    #[inline]
    pub fn displayed_sequence(&self) -> u8 {
        self.grid.seq()
    }

    /// Whether the last status reported playback running.
    pub fn is_playing(&self) -> bool {
        self.status.map(|s| s.playing).unwrap_or(false)
    }
}
