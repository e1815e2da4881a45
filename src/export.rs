//! Sequence file export and import.
//!
//! A sequence file is a JSON object keyed by entry index. Entry `"0"`
//! carries the dimensions; every other entry carries one non-empty cell,
//! addressed by a position string `"{bar}{voice label}{beat}"`:
//!
//! ```json
//! {
//!   "0": { "seq": 2, "beatsPerBar": 16, "bars": 2 },
//!   "1": { "pos": "0Kick0", "level": 127, "index": 0 },
//!   "2": { "pos": "1Sampler_A12", "level": 64, "index": 3 }
//! }
//! ```
//!
//! # Example
//!
//! ```
//! use punck_link::catalog::ResourceCatalog;
//! use punck_link::export::SequenceFile;
//! use punck_link::model::{Cell, SequenceGrid};
//!
//! let catalog = &ResourceCatalog::PUNCK;
//! let mut grid = SequenceGrid::new(2, 16, 2, catalog.grid_voice_count());
//! grid.set(1, 3, 12, Cell::new(64, 3)).unwrap();
//!
//! let json = SequenceFile::from_grid(&grid, catalog).to_json().unwrap();
//! let restored = SequenceFile::from_json(&json).unwrap().into_grid(catalog).unwrap();
//! assert_eq!(restored, grid);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{ResourceCatalog, Voice};
use crate::error::{PunckError, Result};
use crate::model::{Cell, SequenceGrid, MAX_CELL_VALUE};

/// Dimensions entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Dimensions {
    #[serde(default)]
    seq: u8,
    beats_per_bar: u8,
    bars: u8,
}

/// One cell entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntry {
    /// Position string, `"{bar}{voice label}{beat}"`.
    pub pos: String,
    pub level: u8,
    /// Variation.
    pub index: u8,
}

impl CellEntry {
    /// Build an entry for a cell.
    pub fn new(bar: u8, voice: Voice, beat: u8, cell: Cell) -> Self {
        Self {
            pos: format!("{}{}{}", bar, voice.label(), beat),
            level: cell.level,
            index: cell.variation,
        }
    }

    /// Split the position string into `(bar, voice, beat)`.
    pub fn position(&self) -> Result<(u8, Voice, u8)> {
        let invalid = || PunckError::InvalidExport(format!("bad position {:?}", self.pos));

        let label_start = self
            .pos
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let label_end = self
            .pos
            .rfind(|c: char| !c.is_ascii_digit())
            .map(|i| i + 1)
            .ok_or_else(invalid)?;

        let bar = self.pos[..label_start].parse().map_err(|_| invalid())?;
        let voice = Voice::from_label(&self.pos[label_start..label_end]).ok_or_else(invalid)?;
        let beat = self.pos[label_end..].parse().map_err(|_| invalid())?;
        Ok((bar, voice, beat))
    }

    /// Cell value of this entry.
    pub fn cell(&self) -> Cell {
        Cell::new(self.level, self.index)
    }

    /// Check that both values fit in 7 bits.
    pub fn is_valid(&self) -> bool {
        self.level <= MAX_CELL_VALUE && self.index <= MAX_CELL_VALUE
    }
}

/// A sequence in its file form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFile {
    pub seq: u8,
    pub beats_per_bar: u8,
    pub bars: u8,
    pub cells: Vec<CellEntry>,
}

impl SequenceFile {
    /// Capture every non-empty cell of a grid.
    pub fn from_grid(grid: &SequenceGrid, catalog: &ResourceCatalog) -> Self {
        let cells = grid
            .non_empty_cells()
            .filter_map(|(bar, voice, beat, cell)| {
                catalog
                    .grid_voices
                    .get(voice)
                    .map(|&v| CellEntry::new(bar, v, beat, cell))
            })
            .collect();
        Self {
            seq: grid.seq(),
            beats_per_bar: grid.beats_per_bar(),
            bars: grid.bars(),
            cells,
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        let mut entries = serde_json::Map::new();
        entries.insert(
            "0".to_string(),
            serde_json::to_value(Dimensions {
                seq: self.seq,
                beats_per_bar: self.beats_per_bar,
                bars: self.bars,
            })?,
        );
        for (i, entry) in self.cells.iter().enumerate() {
            entries.insert((i + 1).to_string(), serde_json::to_value(entry)?);
        }
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    /// Parse a sequence file.
    ///
    /// Cell entries are taken in index order regardless of key order.
    ///
    /// # Errors
    ///
    /// Returns [`PunckError::InvalidExport`] if entry `"0"` is missing or a key
    /// is not an index, and [`PunckError::Json`] for malformed entries.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut dimensions = None;
        let mut indexed = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let index: usize = key
                .parse()
                .map_err(|_| PunckError::InvalidExport(format!("bad entry key {:?}", key)))?;
            if index == 0 {
                dimensions = Some(serde_json::from_value::<Dimensions>(value)?);
            } else {
                indexed.push((index, serde_json::from_value::<CellEntry>(value)?));
            }
        }
        let dimensions = dimensions
            .ok_or_else(|| PunckError::InvalidExport("missing dimensions entry".to_string()))?;
        indexed.sort_by_key(|(index, _)| *index);

        Ok(Self {
            seq: dimensions.seq,
            beats_per_bar: dimensions.beats_per_bar,
            bars: dimensions.bars,
            cells: indexed.into_iter().map(|(_, entry)| entry).collect(),
        })
    }

    /// Rebuild an empty grid at the declared dimensions and replay every entry.
    ///
    /// Entries outside the grid, with unknown voices, or with values above
    /// 127 are skipped.
    pub fn into_grid(self, catalog: &ResourceCatalog) -> Result<SequenceGrid> {
        catalog
            .check_dimensions(self.bars, self.beats_per_bar)
            .map_err(|e| PunckError::InvalidExport(e.to_string()))?;

        let mut grid = SequenceGrid::new(
            self.seq,
            self.beats_per_bar,
            self.bars,
            catalog.grid_voice_count(),
        );
        for entry in &self.cells {
            let placed = entry.position().and_then(|(bar, voice, beat)| {
                let index = catalog
                    .grid_index(voice)
                    .ok_or(PunckError::UnknownVoice(voice.id()))?;
                grid.set(bar, index, beat, entry.cell())
            });
            if let Err(e) = placed {
                tracing::warn!("Skipping sequence file entry {:?}: {}", entry.pos, e);
            }
        }
        Ok(grid)
    }
}
