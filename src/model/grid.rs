//! Step-sequencer grid of one sequence slot.
//!
//! Cells are stored densely as `[bar][voice][beat]` at the grid's own
//! beats-per-bar. On the wire a bar always spans the catalog's full beat
//! capacity, beat-major, with one `{level, variation}` pair per voice:
//!
//! ```text
//! beat 0: voice 0 (level, variation), voice 1 (level, variation), ...
//! beat 1: ...
//! ```
//!
//! Beats at or beyond `beats_per_bar` are zero on encode and ignored on decode.

use crate::error::{PunckError, Result};

/// Maximum cell level and variation.
pub const MAX_CELL_VALUE: u8 = 127;

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub level: u8,
    /// Sample or variation index.
    pub variation: u8,
}

impl Cell {
    /// The empty cell.
    pub const EMPTY: Cell = Cell {
        level: 0,
        variation: 0,
    };

    /// Create a new cell.
    pub const fn new(level: u8, variation: u8) -> Self {
        Self { level, variation }
    }

    /// Check if both values are zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.level == 0 && self.variation == 0
    }

    /// Check that both values fit in 7 bits.
    pub fn validate(&self) -> Result<()> {
        if self.level > MAX_CELL_VALUE || self.variation > MAX_CELL_VALUE {
            return Err(PunckError::OutOfRange(format!(
                "cell {{{}, {}}} exceeds {}",
                self.level, self.variation, MAX_CELL_VALUE
            )));
        }
        Ok(())
    }
}

/// Grid of one sequence slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGrid {
    seq: u8,
    beats_per_bar: u8,
    bars: u8,
    voices: usize,
    cells: Vec<Cell>,
}

impl SequenceGrid {
    /// Create an empty grid.
    pub fn new(seq: u8, beats_per_bar: u8, bars: u8, voices: usize) -> Self {
        let len = bars as usize * voices * beats_per_bar as usize;
        Self {
            seq,
            beats_per_bar,
            bars,
            voices,
            cells: vec![Cell::EMPTY; len],
        }
    }

    #[inline]
    pub fn seq(&self) -> u8 {
        self.seq
    }

    #[inline]
    pub fn beats_per_bar(&self) -> u8 {
        self.beats_per_bar
    }

    #[inline]
    pub fn bars(&self) -> u8 {
        self.bars
    }

    #[inline]
    pub fn voice_count(&self) -> usize {
        self.voices
    }

    /// Check if `(bar, voice, beat)` lies inside the grid.
    pub fn contains(&self, bar: u8, voice: usize, beat: u8) -> bool {
        bar < self.bars && voice < self.voices && beat < self.beats_per_bar
    }

    fn index(&self, bar: u8, voice: usize, beat: u8) -> usize {
        let bpb = self.beats_per_bar as usize;
        (bar as usize * self.voices + voice) * bpb + beat as usize
    }

    /// Cell at `(bar, voice, beat)`. Cells outside the grid read as empty.
    pub fn get(&self, bar: u8, voice: usize, beat: u8) -> Cell {
        if self.contains(bar, voice, beat) {
            self.cells[self.index(bar, voice, beat)]
        } else {
            Cell::EMPTY
        }
    }

    /// Set the cell at `(bar, voice, beat)`.
    ///
    /// # Errors
    ///
    /// Returns [`PunckError::OutOfRange`] if the position is outside the grid
    /// or either value exceeds 127.
    pub fn set(&mut self, bar: u8, voice: usize, beat: u8, cell: Cell) -> Result<()> {
        if !self.contains(bar, voice, beat) {
            return Err(PunckError::OutOfRange(format!(
                "cell (bar {}, voice {}, beat {}) outside {}x{} grid",
                bar, voice, beat, self.bars, self.beats_per_bar
            )));
        }
        cell.validate()?;
        let i = self.index(bar, voice, beat);
        self.cells[i] = cell;
        Ok(())
    }

    /// Reset every cell of a bar.
    pub fn clear_bar(&mut self, bar: u8) {
        if bar >= self.bars {
            return;
        }
        let stride = self.voices * self.beats_per_bar as usize;
        let start = bar as usize * stride;
        self.cells[start..start + stride].fill(Cell::EMPTY);
    }

    /// Change the dimensions, keeping only cells that still fit.
    pub fn resize(&mut self, bars: u8, beats_per_bar: u8) {
        let mut resized = SequenceGrid::new(self.seq, beats_per_bar, bars, self.voices);
        for bar in 0..bars.min(self.bars) {
            for voice in 0..self.voices {
                for beat in 0..beats_per_bar.min(self.beats_per_bar) {
                    let i = resized.index(bar, voice, beat);
                    resized.cells[i] = self.get(bar, voice, beat);
                }
            }
        }
        *self = resized;
    }

    /// Encode one bar across `max_beats` beats, zero-padded.
    pub fn encode_bar(&self, bar: u8, max_beats: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(max_beats as usize * self.voices * 2);
        for beat in 0..max_beats {
            for voice in 0..self.voices {
                let cell = self.get(bar, voice, beat);
                out.push(cell.level);
                out.push(cell.variation);
            }
        }
        out
    }

    /// Replace one bar with cells decoded from the wire.
    ///
    /// Only beats below `beats_per_bar` are read. Values are masked to 7 bits.
    ///
    /// # Errors
    ///
    /// - [`PunckError::OutOfRange`] if `bar` is outside the grid
    /// - [`PunckError::PayloadTooShort`] if `payload` does not cover every stored beat
    pub fn apply_bar(&mut self, bar: u8, payload: &[u8]) -> Result<()> {
        if bar >= self.bars {
            return Err(PunckError::OutOfRange(format!(
                "bar {} outside {}-bar grid",
                bar, self.bars
            )));
        }
        let expected = self.beats_per_bar as usize * self.voices * 2;
        if payload.len() < expected {
            return Err(PunckError::PayloadTooShort {
                expected,
                actual: payload.len(),
            });
        }

        for (beat, row) in payload
            .chunks_exact(self.voices * 2)
            .take(self.beats_per_bar as usize)
            .enumerate()
        {
            for (voice, pair) in row.chunks_exact(2).enumerate() {
                let i = self.index(bar, voice, beat as u8);
                self.cells[i] = Cell::new(pair[0] & MAX_CELL_VALUE, pair[1] & MAX_CELL_VALUE);
            }
        }
        Ok(())
    }

    /// Iterate over non-empty cells as `(bar, voice, beat, cell)`.
    pub fn non_empty_cells(&self) -> impl Iterator<Item = (u8, usize, u8, Cell)> + '_ {
        let bpb = self.beats_per_bar as usize;
        let voices = self.voices;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty())
            .map(move |(i, &cell)| {
                let beat = (i % bpb) as u8;
                let voice = (i / bpb) % voices;
                let bar = (i / (bpb * voices)) as u8;
                (bar, voice, beat, cell)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOICES: usize = 7;
    const MAX_BEATS: u8 = 24;

    #[test]
    fn test_new_grid_is_empty() {
        let grid = SequenceGrid::new(2, 16, 2, VOICES);
        assert_eq!(grid.seq(), 2);
        assert_eq!(grid.non_empty_cells().count(), 0);
        assert_eq!(grid.get(1, 6, 15), Cell::EMPTY);
    }

    #[test]
    fn test_set_and_get() {
        let mut grid = SequenceGrid::new(0, 16, 2, VOICES);
        grid.set(1, 3, 7, Cell::new(100, 2)).unwrap();

        assert_eq!(grid.get(1, 3, 7), Cell::new(100, 2));
        assert_eq!(grid.get(0, 3, 7), Cell::EMPTY);
    }

    #[test]
    fn test_set_rejects_out_of_range() {
        let mut grid = SequenceGrid::new(0, 16, 1, VOICES);
        assert!(grid.set(1, 0, 0, Cell::new(1, 0)).is_err());
        assert!(grid.set(0, 7, 0, Cell::new(1, 0)).is_err());
        assert!(grid.set(0, 0, 16, Cell::new(1, 0)).is_err());
        assert!(grid.set(0, 0, 0, Cell::new(128, 0)).is_err());
        assert!(grid.set(0, 0, 0, Cell::new(0, 200)).is_err());
    }

    #[test]
    fn test_get_outside_reads_empty() {
        let grid = SequenceGrid::new(0, 16, 1, VOICES);
        assert_eq!(grid.get(3, 0, 0), Cell::EMPTY);
        assert_eq!(grid.get(0, 0, 20), Cell::EMPTY);
    }

    #[test]
    fn test_bar_roundtrip() {
        let mut grid = SequenceGrid::new(1, 16, 2, VOICES);
        grid.set(1, 0, 0, Cell::new(127, 0)).unwrap();
        grid.set(1, 6, 15, Cell::new(64, 3)).unwrap();
        grid.set(1, 2, 8, Cell::new(1, 127)).unwrap();

        let payload = grid.encode_bar(1, MAX_BEATS);
        assert_eq!(payload.len(), MAX_BEATS as usize * VOICES * 2);

        let mut decoded = SequenceGrid::new(1, 16, 2, VOICES);
        decoded.apply_bar(1, &payload).unwrap();
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_encode_pads_unused_beats() {
        let mut grid = SequenceGrid::new(0, 16, 1, VOICES);
        for beat in 0..16 {
            grid.set(0, 0, beat, Cell::new(9, 9)).unwrap();
        }
        let payload = grid.encode_bar(0, MAX_BEATS);

        let tail = &payload[16 * VOICES * 2..];
        assert!(tail.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_apply_ignores_beats_beyond_grid() {
        // Payload written by a 24-beat grid, decoded into a 16-beat one
        let mut wide = SequenceGrid::new(0, 24, 1, VOICES);
        wide.set(0, 1, 20, Cell::new(50, 1)).unwrap();
        wide.set(0, 1, 3, Cell::new(40, 0)).unwrap();

        let mut narrow = SequenceGrid::new(0, 16, 1, VOICES);
        narrow.apply_bar(0, &wide.encode_bar(0, MAX_BEATS)).unwrap();

        assert_eq!(narrow.get(0, 1, 3), Cell::new(40, 0));
        assert_eq!(narrow.get(0, 1, 20), Cell::EMPTY);
    }

    #[test]
    fn test_apply_replaces_previous_bar() {
        let mut grid = SequenceGrid::new(0, 16, 1, VOICES);
        grid.set(0, 0, 0, Cell::new(5, 5)).unwrap();
        grid.apply_bar(0, &vec![0; 16 * VOICES * 2]).unwrap();
        assert_eq!(grid.get(0, 0, 0), Cell::EMPTY);
    }

    #[test]
    fn test_apply_short_payload() {
        let mut grid = SequenceGrid::new(0, 16, 1, VOICES);
        let err = grid.apply_bar(0, &[0; 10]).unwrap_err();
        assert!(matches!(err, PunckError::PayloadTooShort { expected: 224, actual: 10 }));
        assert!(grid.apply_bar(1, &[0; 224]).is_err());
    }

    #[test]
    fn test_resize_preserves_fitting_cells() {
        let mut grid = SequenceGrid::new(0, 16, 2, VOICES);
        grid.set(0, 0, 0, Cell::new(10, 1)).unwrap();
        grid.set(1, 4, 15, Cell::new(20, 2)).unwrap();

        grid.resize(4, 24);
        assert_eq!(grid.bars(), 4);
        assert_eq!(grid.beats_per_bar(), 24);
        assert_eq!(grid.get(0, 0, 0), Cell::new(10, 1));
        assert_eq!(grid.get(1, 4, 15), Cell::new(20, 2));
        assert_eq!(grid.get(3, 4, 23), Cell::EMPTY);

        grid.set(3, 0, 20, Cell::new(30, 0)).unwrap();
        grid.resize(1, 16);
        assert_eq!(grid.get(0, 0, 0), Cell::new(10, 1));
        assert_eq!(grid.non_empty_cells().count(), 1);
    }

    #[test]
    fn test_clear_bar() {
        let mut grid = SequenceGrid::new(0, 16, 2, VOICES);
        grid.set(0, 1, 1, Cell::new(1, 1)).unwrap();
        grid.set(1, 1, 1, Cell::new(2, 2)).unwrap();

        grid.clear_bar(0);
        grid.clear_bar(9);
        assert_eq!(grid.get(0, 1, 1), Cell::EMPTY);
        assert_eq!(grid.get(1, 1, 1), Cell::new(2, 2));
    }

    #[test]
    fn test_non_empty_cells_positions() {
        let mut grid = SequenceGrid::new(0, 24, 3, VOICES);
        grid.set(2, 5, 23, Cell::new(7, 0)).unwrap();
        grid.set(0, 0, 1, Cell::new(0, 4)).unwrap();

        let cells: Vec<_> = grid.non_empty_cells().collect();
        assert_eq!(
            cells,
            vec![(0, 0, 1, Cell::new(0, 4)), (2, 5, 23, Cell::new(7, 0))]
        );
    }
}
