//! Local edits to outbound "set" frames.
//!
//! Every edit is applied to the model first, then published as a complete
//! resource: a whole bar of the grid, or a whole parameter block. Single
//! cells or fields are never sent on their own. Edits do not wait for the
//! sequencer and never change its cursor, except for a structural resize,
//! which publishes bar 0 and then reloads the sequence from the device.
//!
//! # Example
//!
//! ```
//! use punck_link::catalog::{ResourceCatalog, Voice};
//! use punck_link::model::Cell;
//! use punck_link::publish::EditPublisher;
//! use punck_link::sync::{sent_frames, SyncSequencer};
//!
//! let mut sync = SyncSequencer::new(&ResourceCatalog::PUNCK);
//! let publisher = EditPublisher::new();
//!
//! let effects = publisher.set_cell(&mut sync, 0, Voice::Snare, 4, Cell::new(100, 0)).unwrap();
//! let frame = &sent_frames(&effects)[0];
//! assert_eq!(&frame[..6], &[0xF0, 0x1C, 0, 16, 1, 0]);
//! assert_eq!(frame.len(), 6 + 24 * 7 * 2 + 1);
//! ```

use bytes::Bytes;

use crate::catalog::Voice;
use crate::codec::FrameCodec;
use crate::error::{PunckError, Result};
use crate::export::SequenceFile;
use crate::model::{Cell, SequenceGrid};
use crate::params::{FieldValue, ParameterBlock};
use crate::protocol::{build_request, Command};
use crate::sync::{Effect, SyncSequencer};

/// Cells of one copied bar, `[voice][beat]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarClipboard {
    beats_per_bar: u8,
    cells: Vec<Vec<Cell>>,
}

impl BarClipboard {
    /// Beats per bar of the source grid.
    #[inline]
    pub fn beats_per_bar(&self) -> u8 {
        self.beats_per_bar
    }

    /// Copied cell, empty outside the copied bar.
    pub fn get(&self, voice: usize, beat: u8) -> Cell {
        self.cells
            .get(voice)
            .and_then(|row| row.get(beat as usize))
            .copied()
            .unwrap_or(Cell::EMPTY)
    }
}

/// Publishes local edits as complete resources.
#[derive(Debug, Default)]
pub struct EditPublisher {
    clipboard: Option<BarClipboard>,
}

impl EditPublisher {
    /// Create a publisher with an empty clipboard.
    pub fn new() -> Self {
        Self { clipboard: None }
    }

    /// Contents of the bar clipboard.
    pub fn clipboard(&self) -> Option<&BarClipboard> {
        self.clipboard.as_ref()
    }

    /// Set one cell of the displayed grid and publish its bar.
    ///
    /// # Errors
    ///
    /// Returns [`PunckError::OutOfRange`] if the position is outside the grid
    /// or a value exceeds 127. Nothing is published on error.
    pub fn set_cell(
        &self,
        sync: &mut SyncSequencer,
        bar: u8,
        voice: Voice,
        beat: u8,
        cell: Cell,
    ) -> Result<Vec<Effect>> {
        let index = grid_index(sync, voice)?;
        sync.model_mut().grid.set(bar, index, beat, cell)?;
        Ok(vec![publish_bar(sync, bar)])
    }

    /// Change a cell's level, keeping its variation.
    pub fn set_level(
        &self,
        sync: &mut SyncSequencer,
        bar: u8,
        voice: Voice,
        beat: u8,
        level: u8,
    ) -> Result<Vec<Effect>> {
        let index = grid_index(sync, voice)?;
        let cell = sync.model().grid.get(bar, index, beat);
        self.set_cell(sync, bar, voice, beat, Cell::new(level, cell.variation))
    }

    /// Change a cell's variation, keeping its level.
    pub fn set_variation(
        &self,
        sync: &mut SyncSequencer,
        bar: u8,
        voice: Voice,
        beat: u8,
        variation: u8,
    ) -> Result<Vec<Effect>> {
        let index = grid_index(sync, voice)?;
        let cell = sync.model().grid.get(bar, index, beat);
        self.set_cell(sync, bar, voice, beat, Cell::new(cell.level, variation))
    }

    /// Change the grid dimensions.
    ///
    /// Bar 0 is published with the new dimensions, then the sequence is
    /// fetched again so the grid reflects what the device holds.
    pub fn resize(
        &self,
        sync: &mut SyncSequencer,
        bars: u8,
        beats_per_bar: u8,
    ) -> Result<Vec<Effect>> {
        sync.catalog().check_dimensions(bars, beats_per_bar)?;

        let grid = &mut sync.model_mut().grid;
        grid.resize(bars, beats_per_bar);
        let seq = grid.seq();
        tracing::debug!(
            "Resized sequence {} to {} bars of {} beats",
            seq,
            bars,
            beats_per_bar
        );

        let mut effects = vec![publish_bar(sync, 0)];
        effects.extend(sync.refresh_sequence(seq));
        Ok(effects)
    }

    /// Set one field of a voice and publish the voice's whole block.
    pub fn set_parameter(
        &self,
        sync: &mut SyncSequencer,
        voice: Voice,
        field: &str,
        value: FieldValue,
    ) -> Result<Vec<Effect>> {
        let block = sync.model_mut().voice_mut(voice)?;
        block.set(field, value)?;
        Ok(vec![Effect::Send(nibble_frame(
            Command::SetVoiceConfig,
            &[voice.id()],
            block,
        ))])
    }

    /// Set one calibration reading and publish the whole table.
    pub fn set_adc(
        &self,
        sync: &mut SyncSequencer,
        field: &str,
        value: FieldValue,
    ) -> Result<Vec<Effect>> {
        let block = &mut sync.model_mut().adc;
        block.set(field, value)?;
        Ok(vec![Effect::Send(nibble_frame(Command::SetAdc, &[], block))])
    }

    /// Set one reverb field and publish the whole block.
    pub fn set_reverb(
        &self,
        sync: &mut SyncSequencer,
        field: &str,
        value: FieldValue,
    ) -> Result<Vec<Effect>> {
        let block = &mut sync.model_mut().reverb;
        block.set(field, value)?;
        Ok(vec![Effect::Send(nibble_frame(
            Command::SetReverbConfig,
            &[],
            block,
        ))])
    }

    /// Copy one bar of the displayed grid into the clipboard.
    pub fn copy_bar(&mut self, sync: &SyncSequencer, bar: u8) -> Result<()> {
        let grid = &sync.model().grid;
        check_bar(grid, bar)?;

        let cells = (0..grid.voice_count())
            .map(|voice| {
                (0..grid.beats_per_bar())
                    .map(|beat| grid.get(bar, voice, beat))
                    .collect()
            })
            .collect();
        self.clipboard = Some(BarClipboard {
            beats_per_bar: grid.beats_per_bar(),
            cells,
        });
        Ok(())
    }

    /// Replace a bar with the clipboard and publish it.
    ///
    /// Copied beats beyond the target's beats per bar are dropped; target
    /// beats beyond the copied ones are cleared.
    pub fn paste_bar(&self, sync: &mut SyncSequencer, bar: u8) -> Result<Vec<Effect>> {
        let clipboard = self
            .clipboard
            .as_ref()
            .ok_or_else(|| PunckError::OutOfRange("clipboard is empty".to_string()))?;

        let grid = &mut sync.model_mut().grid;
        check_bar(grid, bar)?;
        grid.clear_bar(bar);

        let beats = grid.beats_per_bar().min(clipboard.beats_per_bar);
        for voice in 0..grid.voice_count() {
            for beat in 0..beats {
                grid.set(bar, voice, beat, clipboard.get(voice, beat))?;
            }
        }
        Ok(vec![publish_bar(sync, bar)])
    }

    /// Replace the displayed grid with a sequence file and publish every bar.
    pub fn import(&self, sync: &mut SyncSequencer, file: SequenceFile) -> Result<Vec<Effect>> {
        let grid = file.into_grid(sync.catalog())?;
        let bars = grid.bars();
        sync.model_mut().grid = grid;

        Ok((0..bars).map(|bar| publish_bar(sync, bar)).collect())
    }

    /// Ask the device to persist its current settings.
    pub fn save_config(&self) -> Vec<Effect> {
        vec![Effect::Send(build_request(Command::SaveConfig, &[]))]
    }
}

/// Encode one bar of a grid as a `SetSequence` frame.
pub fn bar_frame(grid: &SequenceGrid, bar: u8, max_beats: u8) -> Bytes {
    let mut body = vec![grid.seq(), grid.beats_per_bar(), grid.bars(), bar];
    body.extend_from_slice(&grid.encode_bar(bar, max_beats));
    FrameCodec::encode_direct(Command::SetSequence, &body)
}

fn publish_bar(sync: &SyncSequencer, bar: u8) -> Effect {
    Effect::Send(bar_frame(&sync.model().grid, bar, sync.catalog().max_beats))
}

fn nibble_frame(command: Command, fields: &[u8], block: &ParameterBlock) -> Bytes {
    FrameCodec::encode_nibble_packed(command, fields, &block.encode())
}

fn grid_index(sync: &SyncSequencer, voice: Voice) -> Result<usize> {
    sync.catalog()
        .grid_index(voice)
        .ok_or(PunckError::UnknownVoice(voice.id()))
}

fn check_bar(grid: &SequenceGrid, bar: u8) -> Result<()> {
    if bar >= grid.bars() {
        return Err(PunckError::OutOfRange(format!(
            "bar {} outside {}-bar grid",
            bar,
            grid.bars()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceCatalog;
    use crate::codec::NibbleCodec;
    use crate::protocol::SYSEX_END;
    use crate::sync::{sent_frames, SyncState};

    const CATALOG: &ResourceCatalog = &ResourceCatalog::PUNCK;

    fn loaded(seq: u8, bpb: u8, bars: u8) -> SyncSequencer {
        let mut sync = SyncSequencer::new(CATALOG);
        sync.model_mut().grid = SequenceGrid::new(seq, bpb, bars, CATALOG.grid_voice_count());
        sync
    }

    #[test]
    fn test_cell_edit_publishes_whole_bar() {
        let mut sync = loaded(2, 16, 2);
        let publisher = EditPublisher::new();

        let effects = publisher
            .set_cell(&mut sync, 1, Voice::HiHat, 3, Cell::new(90, 4))
            .unwrap();
        let frames = sent_frames(&effects);
        assert_eq!(frames.len(), 1);

        let frame = &frames[0];
        assert_eq!(&frame[..6], &[0xF0, 0x1C, 2, 16, 2, 1]);
        assert_eq!(frame.len(), 6 + CATALOG.bar_payload_len() + 1);
        assert_eq!(frame[frame.len() - 1], SYSEX_END);

        // HiHat is grid voice 2: offset (beat * 7 + voice) * 2
        let cells = &frame[6..frame.len() - 1];
        assert_eq!(&cells[(3 * 7 + 2) * 2..][..2], &[90, 4]);
        assert_eq!(cells.iter().filter(|&&b| b != 0).count(), 2);
    }

    #[test]
    fn test_edit_keeps_previous_cells_of_bar() {
        let mut sync = loaded(0, 16, 1);
        let publisher = EditPublisher::new();

        publisher
            .set_cell(&mut sync, 0, Voice::Kick, 0, Cell::new(1, 0))
            .unwrap();
        let effects = publisher
            .set_level(&mut sync, 0, Voice::Kick, 8, 2)
            .unwrap();

        let frame = &sent_frames(&effects)[0];
        let cells = &frame[6..frame.len() - 1];
        assert_eq!(cells[0], 1);
        assert_eq!(cells[8 * 14], 2);
    }

    #[test]
    fn test_level_and_variation_wrappers() {
        let mut sync = loaded(0, 16, 1);
        let publisher = EditPublisher::new();

        publisher.set_level(&mut sync, 0, Voice::Toms, 5, 70).unwrap();
        publisher
            .set_variation(&mut sync, 0, Voice::Toms, 5, 3)
            .unwrap();
        assert_eq!(sync.model().grid.get(0, 5, 5), Cell::new(70, 3));
    }

    #[test]
    fn test_invalid_edits_publish_nothing() {
        let mut sync = loaded(0, 16, 1);
        let publisher = EditPublisher::new();

        assert!(publisher
            .set_cell(&mut sync, 1, Voice::Kick, 0, Cell::new(1, 0))
            .is_err());
        assert!(publisher
            .set_cell(&mut sync, 0, Voice::Kick, 16, Cell::new(1, 0))
            .is_err());
        assert!(publisher
            .set_cell(&mut sync, 0, Voice::Kick, 0, Cell::new(128, 0))
            .is_err());
        assert!(publisher.resize(&mut sync, 5, 16).is_err());
        assert!(publisher.resize(&mut sync, 2, 32).is_err());
        assert!(publisher
            .set_parameter(&mut sync, Voice::SamplerA, "Level", FieldValue::F32(1.0))
            .is_err());
        assert!(publisher
            .set_parameter(&mut sync, Voice::Kick, "Ramp 1 Inc", FieldValue::U8(1))
            .is_err());
        assert!(publisher
            .set_adc(&mut sync, "Nope", FieldValue::U16(1))
            .is_err());

        assert_eq!(sync.model().grid.non_empty_cells().count(), 0);
    }

    #[test]
    fn test_edits_do_not_touch_cursor() {
        let mut sync = loaded(0, 16, 1);
        sync.refresh_config();
        let publisher = EditPublisher::new();

        publisher
            .set_cell(&mut sync, 0, Voice::Claps, 0, Cell::new(5, 0))
            .unwrap();
        publisher
            .set_parameter(&mut sync, Voice::Kick, "Ramp 1 Inc", FieldValue::F32(0.1))
            .unwrap();
        assert_eq!(sync.cursor().state(), SyncState::AwaitingVoiceConfig(0));
    }

    #[test]
    fn test_resize_publishes_bar_zero_then_refreshes() {
        let mut sync = loaded(3, 16, 2);
        let publisher = EditPublisher::new();
        publisher
            .set_cell(&mut sync, 1, Voice::Kick, 15, Cell::new(9, 9))
            .unwrap();

        let effects = publisher.resize(&mut sync, 4, 24).unwrap();
        let frames = sent_frames(&effects);
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..6], &[0xF0, 0x1C, 3, 24, 4, 0]);
        assert_eq!(frames[1], build_request(Command::GetSequence, &[3, 0]));
        assert_eq!(
            sync.cursor().state(),
            SyncState::AwaitingSequenceBar { seq: 3, bar: 0 }
        );
        assert_eq!(sync.model().grid.get(1, 0, 15), Cell::new(9, 9));
    }

    #[test]
    fn test_parameter_edit_publishes_whole_block() {
        let mut sync = loaded(0, 16, 1);
        let publisher = EditPublisher::new();

        let effects = publisher
            .set_parameter(&mut sync, Voice::Toms, "Init Sine Freq", FieldValue::F32(440.0))
            .unwrap();
        let frame = &sent_frames(&effects)[0];

        assert_eq!(&frame[..3], &[0xF0, 0x1E, 5]);
        let block = NibbleCodec::unpack(&frame[3..frame.len() - 1]);
        assert_eq!(block.len(), crate::catalog::TOMS_SCHEMA.byte_len());
        assert_eq!(&block[12..16], &440.0f32.to_le_bytes());
    }

    #[test]
    fn test_adc_and_reverb_edits() {
        let mut sync = loaded(0, 16, 1);
        let publisher = EditPublisher::new();

        let effects = publisher
            .set_adc(&mut sync, "Tempo", FieldValue::U16(0xABCD))
            .unwrap();
        let frame = &sent_frames(&effects)[0];
        assert_eq!(frame[1], 0x25);
        assert_eq!(frame.len(), 2 + 30 * 2 + 1);
        assert_eq!(&frame[2..6], &[0x0D, 0x0C, 0x0B, 0x0A]);

        let effects = publisher
            .set_reverb(&mut sync, "Mix Level", FieldValue::F32(0.5))
            .unwrap();
        let frame = &sent_frames(&effects)[0];
        assert_eq!(frame[1], 0x23);
        assert_eq!(frame.len(), 2 + 16 * 2 + 1);
    }

    #[test]
    fn test_copy_paste_bar() {
        let mut sync = loaded(0, 24, 2);
        let mut publisher = EditPublisher::new();
        publisher
            .set_cell(&mut sync, 0, Voice::Snare, 2, Cell::new(11, 1))
            .unwrap();
        publisher
            .set_cell(&mut sync, 0, Voice::Kick, 20, Cell::new(12, 0))
            .unwrap();
        publisher
            .set_cell(&mut sync, 1, Voice::Toms, 7, Cell::new(13, 0))
            .unwrap();

        assert!(publisher.paste_bar(&mut sync, 1).is_err());
        publisher.copy_bar(&sync, 0).unwrap();
        let effects = publisher.paste_bar(&mut sync, 1).unwrap();

        let frames = sent_frames(&effects);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][5], 1);

        let grid = &sync.model().grid;
        assert_eq!(grid.get(1, 1, 2), Cell::new(11, 1));
        assert_eq!(grid.get(1, 0, 20), Cell::new(12, 0));
        assert_eq!(grid.get(1, 5, 7), Cell::EMPTY);
    }

    #[test]
    fn test_paste_into_narrower_grid() {
        let mut sync = loaded(0, 24, 1);
        let mut publisher = EditPublisher::new();
        publisher
            .set_cell(&mut sync, 0, Voice::Kick, 20, Cell::new(1, 0))
            .unwrap();
        publisher
            .set_cell(&mut sync, 0, Voice::Kick, 3, Cell::new(2, 0))
            .unwrap();
        publisher.copy_bar(&sync, 0).unwrap();

        sync.model_mut().grid = SequenceGrid::new(0, 16, 1, 7);
        publisher.paste_bar(&mut sync, 0).unwrap();
        assert_eq!(sync.model().grid.get(0, 0, 3), Cell::new(2, 0));
        assert_eq!(sync.model().grid.non_empty_cells().count(), 1);
        assert!(publisher.copy_bar(&sync, 1).is_err());
    }

    #[test]
    fn test_import_publishes_every_bar() {
        let mut sync = loaded(0, 16, 1);
        let publisher = EditPublisher::new();

        let mut source = SequenceGrid::new(4, 16, 3, 7);
        source.set(2, 6, 15, Cell::new(1, 1)).unwrap();
        let file = SequenceFile::from_grid(&source, CATALOG);

        let effects = publisher.import(&mut sync, file).unwrap();
        let frames = sent_frames(&effects);
        assert_eq!(frames.len(), 3);
        for (bar, frame) in frames.iter().enumerate() {
            assert_eq!(&frame[..6], &[0xF0, 0x1C, 4, 16, 3, bar as u8]);
        }
        assert_eq!(sync.model().grid, source);
    }

    #[test]
    fn test_save_config() {
        let effects = EditPublisher::new().save_config();
        assert_eq!(sent_frames(&effects), vec![Bytes::from_static(&[0xF0, 0x21, 0xF7])]);
    }
}
