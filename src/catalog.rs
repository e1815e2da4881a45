//! Static catalog of addressable device resources.
//!
//! Every ordering the device relies on is spelled out here as an explicit
//! list: the voice order of grid cells on the wire, the order of the
//! config sweep, and the sample bank ids. Nothing is derived from enum
//! discriminants or map iteration order.
//!
//! # Example
//!
//! ```
//! use punck_link::catalog::{ResourceCatalog, Voice};
//!
//! let catalog = &ResourceCatalog::PUNCK;
//! assert_eq!(catalog.config_voices[1], Voice::Toms);
//! assert_eq!(catalog.grid_index(Voice::Claps), Some(6));
//! assert_eq!(catalog.voice_schema(Voice::HiHat).unwrap().byte_len(), 22 * 4 + 6);
//! ```

use crate::error::{PunckError, Result};
use crate::params::{Field, Schema};

/// A sound-generating voice on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Voice {
    Kick,
    Snare,
    HiHat,
    SamplerA,
    SamplerB,
    Toms,
    Claps,
}

impl Voice {
    /// Device id of this voice.
    pub fn id(self) -> u8 {
        match self {
            Voice::Kick => 0,
            Voice::Snare => 1,
            Voice::HiHat => 2,
            Voice::SamplerA => 3,
            Voice::SamplerB => 4,
            Voice::Toms => 5,
            Voice::Claps => 6,
        }
    }

    /// Look up a voice by device id.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Voice::Kick),
            1 => Some(Voice::Snare),
            2 => Some(Voice::HiHat),
            3 => Some(Voice::SamplerA),
            4 => Some(Voice::SamplerB),
            5 => Some(Voice::Toms),
            6 => Some(Voice::Claps),
            _ => None,
        }
    }

    /// Look up a voice by device id, failing with [`PunckError::UnknownVoice`].
    pub fn try_from_id(id: u8) -> Result<Self> {
        Self::from_id(id).ok_or(PunckError::UnknownVoice(id))
    }

    /// Label used in sequence files.
    pub fn label(self) -> &'static str {
        match self {
            Voice::Kick => "Kick",
            Voice::Snare => "Snare",
            Voice::HiHat => "HiHat",
            Voice::SamplerA => "Sampler_A",
            Voice::SamplerB => "Sampler_B",
            Voice::Toms => "Toms",
            Voice::Claps => "Claps",
        }
    }

    /// Look up a voice by its sequence file label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Kick" => Some(Voice::Kick),
            "Snare" => Some(Voice::Snare),
            "HiHat" => Some(Voice::HiHat),
            "Sampler_A" => Some(Voice::SamplerA),
            "Sampler_B" => Some(Voice::SamplerB),
            "Toms" => Some(Voice::Toms),
            "Claps" => Some(Voice::Claps),
            _ => None,
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub const KICK_SCHEMA: Schema = Schema {
    name: "Kick",
    fields: &[
        Field::f32("Ramp 1 Inc"),
        Field::f32("Ramp 2 Inc"),
        Field::f32("Ramp 3 Inc"),
        Field::f32("Fast Sine Freq"),
        Field::f32("Slow Sine Freq"),
        Field::f32("Sine Slow Down Rate"),
    ],
};

pub const TOMS_SCHEMA: Schema = Schema {
    name: "Toms",
    fields: &[
        Field::f32("Decay Partial 1"),
        Field::f32("Decay Partial 2"),
        Field::f32("Ramp Inc"),
        Field::f32("Init Sine Freq"),
        Field::f32("Sine 1 Freq Scale"),
        Field::f32("Sine 2 Freq Scale"),
        Field::f32("Sine 1 Level"),
        Field::f32("Sine 2 Level"),
        Field::f32("Sine Slow Down Rate"),
    ],
};

pub const SNARE_SCHEMA: Schema = Schema {
    name: "Snare",
    fields: &[
        Field::f32("Noise Level"),
        Field::f32("Noise Decay"),
        Field::f32("Base Frequency"),
        Field::f32("Base Start Position"),
        Field::f32("Partial Decay"),
        Field::f32("Partial 0 Level"),
        Field::f32("Partial 1 Level"),
        Field::f32("Partial 2 Level"),
        Field::f32("Partial 0 Freq Offset"),
        Field::f32("Partial 1 Freq Offset"),
        Field::f32("Partial 2 Freq Offset"),
    ],
};

pub const HIHAT_SCHEMA: Schema = Schema {
    name: "HiHat",
    fields: &[
        Field::f32("Attack"),
        Field::f32("Decay"),
        Field::f32("HP Initial Cutoff"),
        Field::f32("HP Final Cutoff"),
        Field::f32("HP Cutoff Inc"),
        Field::f32("LP Initial Cutoff"),
        Field::f32("LP Final Cutoff"),
        Field::f32("LP Cutoff Inc"),
        Field::f32("Noise Level"),
        Field::f32("Noise Decay"),
        Field::f32("Partial 0 Level"),
        Field::f32("Partial 1 Level"),
        Field::f32("Partial 2 Level"),
        Field::f32("Partial 3 Level"),
        Field::f32("Partial 4 Level"),
        Field::f32("Partial 5 Level"),
        Field::f32("Partial 0 Frequency"),
        Field::f32("Partial 1 Frequency"),
        Field::f32("Partial 2 Frequency"),
        Field::f32("Partial 3 Frequency"),
        Field::f32("Partial 4 Frequency"),
        Field::f32("Partial 5 Frequency"),
        Field::u8("Partial 0 FM Amount"),
        Field::u8("Partial 1 FM Amount"),
        Field::u8("Partial 2 FM Amount"),
        Field::u8("Partial 3 FM Amount"),
        Field::u8("Partial 4 FM Amount"),
        Field::u8("Partial 5 FM Amount"),
    ],
};

pub const CLAPS_SCHEMA: Schema = Schema {
    name: "Claps",
    fields: &[
        Field::f32("Init Level"),
        Field::f32("Reverb Init Level"),
        Field::f32("Init Decay"),
        Field::f32("Reverb Decay"),
        Field::f32("Filter Cutoff"),
        Field::f32("Filter Q"),
        Field::f32("Unfiltered Noise Level"),
    ],
};

/// Calibration readings of the front panel potentiometers.
pub const ADC_SCHEMA: Schema = Schema {
    name: "ADC",
    fields: &[
        Field::u16("Tempo"),
        Field::u16("Kick Level"),
        Field::u16("Kick Attack"),
        Field::u16("Kick Decay"),
        Field::u16("Snare Level"),
        Field::u16("Snare Filter"),
        Field::u16("Snare Decay"),
        Field::u16("Snare Tuning"),
        Field::u16("HiHat Level"),
        Field::u16("HiHat Decay"),
        Field::u16("Sample A Level"),
        Field::u16("Sample A Speed"),
        Field::u16("Sample B Level"),
        Field::u16("Sample B Speed"),
        Field::u16("Toms Level"),
    ],
};

pub const REVERB_SCHEMA: Schema = Schema {
    name: "Reverb",
    fields: &[
        Field::f32("Mix Level"),
        Field::f32("Decay"),
        Field::f32("Diffusion"),
        Field::f32("Damping"),
    ],
};

/// Static description of one device model's resources.
#[derive(Debug)]
pub struct ResourceCatalog {
    /// Voice order of grid cells within one beat.
    pub grid_voices: &'static [Voice],
    /// Order in which the config sweep fetches voices.
    pub config_voices: &'static [Voice],
    /// Sample bank ids, in sweep order.
    pub sample_banks: &'static [u8],
    /// Width of one sample name slot in bytes.
    pub sample_name_width: usize,
    /// Number of sequence slots (ids `0..sequence_slots`).
    pub sequence_slots: u8,
    /// Maximum bars per sequence.
    pub max_bars: u8,
    /// Allowed beats-per-bar values.
    pub beats_per_bar: &'static [u8],
    /// Beat capacity of one bar on the wire.
    pub max_beats: u8,
    /// Calibration table schema.
    pub adc: &'static Schema,
    /// Reverb block schema.
    pub reverb: &'static Schema,
}

impl ResourceCatalog {
    /// The Punck drum module.
    pub const PUNCK: ResourceCatalog = ResourceCatalog {
        grid_voices: &[
            Voice::Kick,
            Voice::Snare,
            Voice::HiHat,
            Voice::SamplerA,
            Voice::SamplerB,
            Voice::Toms,
            Voice::Claps,
        ],
        config_voices: &[
            Voice::Kick,
            Voice::Toms,
            Voice::Snare,
            Voice::HiHat,
            Voice::Claps,
        ],
        sample_banks: &[0, 1],
        sample_name_width: 8,
        sequence_slots: 6,
        max_bars: 4,
        beats_per_bar: &[16, 24],
        max_beats: 24,
        adc: &ADC_SCHEMA,
        reverb: &REVERB_SCHEMA,
    };

    /// Parameter schema of a voice.
    ///
    /// # Errors
    ///
    /// Returns [`PunckError::NoParameterBlock`] for the samplers.
    pub fn voice_schema(&self, voice: Voice) -> Result<&'static Schema> {
        match voice {
            Voice::Kick => Ok(&KICK_SCHEMA),
            Voice::Toms => Ok(&TOMS_SCHEMA),
            Voice::Snare => Ok(&SNARE_SCHEMA),
            Voice::HiHat => Ok(&HIHAT_SCHEMA),
            Voice::Claps => Ok(&CLAPS_SCHEMA),
            Voice::SamplerA | Voice::SamplerB => Err(PunckError::NoParameterBlock(voice.label())),
        }
    }

    /// Position of a voice within a beat of grid cells.
    pub fn grid_index(&self, voice: Voice) -> Option<usize> {
        self.grid_voices.iter().position(|&v| v == voice)
    }

    /// Number of grid voices.
    #[inline]
    pub fn grid_voice_count(&self) -> usize {
        self.grid_voices.len()
    }

    /// Decoded byte length of one full bar of cells.
    pub fn bar_payload_len(&self) -> usize {
        self.max_beats as usize * self.grid_voices.len() * 2
    }

    /// Check if a sequence slot id exists.
    pub fn is_sequence_slot(&self, seq: u8) -> bool {
        seq < self.sequence_slots
    }

    /// Check a bar count and beats-per-bar pair.
    pub fn check_dimensions(&self, bars: u8, beats_per_bar: u8) -> Result<()> {
        if bars == 0 || bars > self.max_bars {
            return Err(PunckError::OutOfRange(format!(
                "bars {} not in 1..={}",
                bars, self.max_bars
            )));
        }
        if !self.beats_per_bar.contains(&beats_per_bar) {
            return Err(PunckError::OutOfRange(format!(
                "beats per bar {} not one of {:?}",
                beats_per_bar, self.beats_per_bar
            )));
        }
        Ok(())
    }
}
