//! Palette compression for section block grids.
//!
//! A palette is rebuilt on every encode: distinct state ids in first-seen
//! order over the canonical Y/Z/X iteration, plus one palette index per cell.
//! Identical grids always produce identical palettes.

use std::collections::HashMap;

use crate::error::CodecError;
use crate::section::{BLOCK_COUNT, DEFAULT_STATE, StateId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedBlocks {
    pub palette: Vec<StateId>,
    pub indices: Vec<u32>,
}

impl PalettedBlocks {
    /// A single-entry palette of air: the grid carries no information.
    pub fn is_all_default(&self) -> bool {
        self.palette == [DEFAULT_STATE]
    }
}

pub fn encode(blocks: &[StateId]) -> PalettedBlocks {
    let mut palette = Vec::new();
    let mut lookup: HashMap<StateId, u32> = HashMap::new();
    let mut indices = Vec::with_capacity(blocks.len());

    for &state in blocks {
        let idx = *lookup.entry(state).or_insert_with(|| {
            palette.push(state);
            (palette.len() - 1) as u32
        });
        indices.push(idx);
    }

    PalettedBlocks { palette, indices }
}

/// Rebuilds the grid. A wrong index count is structural corruption and
/// fails; an index past the palette only costs that one cell, which falls
/// back to air.
pub fn decode(palette: &[StateId], indices: &[u32]) -> Result<Vec<StateId>, CodecError> {
    if indices.len() != BLOCK_COUNT {
        return Err(CodecError::SizeMismatch {
            what: "palette indices",
            expected: BLOCK_COUNT,
            actual: indices.len(),
        });
    }

    let mut out_of_range = 0usize;
    let blocks = indices
        .iter()
        .map(|&idx| match palette.get(idx as usize) {
            Some(&state) => state,
            None => {
                out_of_range += 1;
                DEFAULT_STATE
            }
        })
        .collect();

    if out_of_range > 0 {
        log::warn!(
            "{} palette indices out of range (palette length {}), cells reset to air",
            out_of_range,
            palette.len()
        );
    }
    Ok(blocks)
}
