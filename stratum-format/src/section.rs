//! In-memory voxel section: a 16x16x16 block grid plus a 4x4x4 biome grid.
//!
//! Blocks are stored Y-major, then Z, then X: `index = (y * 16 + z) * 16 + x`.
//! Biome macro-cells are stored Z-major, then Y, then X:
//! `index = (bz * 4 + by) * 4 + bx`. Both orders are also the wire orders.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type StateId = u32;
pub type BiomeId = u32;

pub const SECTION_SIZE: usize = 16;
pub const BLOCK_COUNT: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;
pub const BIOME_CELLS: usize = 4;
pub const BIOME_COUNT: usize = BIOME_CELLS * BIOME_CELLS * BIOME_CELLS;

/// The empty ("air") block state.
pub const DEFAULT_STATE: StateId = 0;
pub const DEFAULT_BIOME: BiomeId = 0;

/// Block coordinates local to a section, each in `0..16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPos {
    /// Returns `None` when any axis is outside the section.
    pub fn new(x: u8, y: u8, z: u8) -> Option<Self> {
        let limit = SECTION_SIZE as u8;
        (x < limit && y < limit && z < limit).then_some(Self { x, y, z })
    }

    pub fn index(self) -> usize {
        (self.y as usize * SECTION_SIZE + self.z as usize) * SECTION_SIZE + self.x as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self {
            x: (index % SECTION_SIZE) as u8,
            z: (index / SECTION_SIZE % SECTION_SIZE) as u8,
            y: (index / (SECTION_SIZE * SECTION_SIZE) % SECTION_SIZE) as u8,
        }
    }
}

/// Key form used in the block-data column: `"x,y,z"`.
impl fmt::Display for LocalPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl FromStr for LocalPos {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut axes = s.split(',').map(|part| part.trim().parse::<u8>());
        match (axes.next(), axes.next(), axes.next(), axes.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => {
                LocalPos::new(x, y, z).ok_or_else(|| format!("coordinate out of range: {s}"))
            }
            _ => Err(format!("malformed coordinate key: {s}")),
        }
    }
}

/// Auxiliary compound payload attached to one cell, kept in its
/// structured-text form. The store never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockData(pub String);

impl BlockData {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

/// One 16x16x16 section. Not synchronised; the owning simulation serialises
/// all access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    blocks: Box<[StateId]>,
    biomes: [BiomeId; BIOME_COUNT],
    block_data: BTreeMap<LocalPos, BlockData>,
}

impl Default for Section {
    fn default() -> Self {
        Self::new(DEFAULT_BIOME)
    }
}

impl Section {
    /// All-air section whose biome cells are all `biome`.
    pub fn new(biome: BiomeId) -> Self {
        Self {
            blocks: vec![DEFAULT_STATE; BLOCK_COUNT].into_boxed_slice(),
            biomes: [biome; BIOME_COUNT],
            block_data: BTreeMap::new(),
        }
    }

    /// Builds a section from a full grid in canonical order.
    pub fn from_blocks(blocks: Vec<StateId>, biome: BiomeId) -> Option<Self> {
        if blocks.len() != BLOCK_COUNT {
            return None;
        }
        Some(Self {
            blocks: blocks.into_boxed_slice(),
            biomes: [biome; BIOME_COUNT],
            block_data: BTreeMap::new(),
        })
    }

    /// # Panics
    /// If any coordinate is outside `0..16`.
    pub fn block(&self, x: u8, y: u8, z: u8) -> StateId {
        self.blocks[Self::pos(x, y, z).index()]
    }

    /// Sets a block and replaces the cell's payload. Passing `None` clears
    /// any payload the cell had.
    ///
    /// # Panics
    /// If any coordinate is outside `0..16`.
    pub fn set_block(&mut self, x: u8, y: u8, z: u8, state: StateId, data: Option<BlockData>) {
        let pos = Self::pos(x, y, z);
        self.blocks[pos.index()] = state;
        match data {
            Some(data) => {
                self.block_data.insert(pos, data);
            }
            None => {
                self.block_data.remove(&pos);
            }
        }
    }

    pub fn fill(&mut self, state: StateId) {
        self.blocks.fill(state);
        self.block_data.clear();
    }

    /// # Panics
    /// If any cell coordinate is outside `0..4`.
    pub fn biome(&self, cx: u8, cy: u8, cz: u8) -> BiomeId {
        self.biomes[Self::cell_index(cx, cy, cz)]
    }

    /// # Panics
    /// If any cell coordinate is outside `0..4`.
    pub fn set_biome(&mut self, cx: u8, cy: u8, cz: u8, biome: BiomeId) {
        self.biomes[Self::cell_index(cx, cy, cz)] = biome;
    }

    /// Biome of the macro-cell containing block `(x, y, z)`.
    pub fn biome_at_block(&self, x: u8, y: u8, z: u8) -> BiomeId {
        let pos = Self::pos(x, y, z);
        self.biome(pos.x / 4, pos.y / 4, pos.z / 4)
    }

    pub fn fill_biome(&mut self, biome: BiomeId) {
        self.biomes.fill(biome);
    }

    pub fn block_data(&self, x: u8, y: u8, z: u8) -> Option<&BlockData> {
        self.block_data.get(&Self::pos(x, y, z))
    }

    pub fn block_data_entries(&self) -> &BTreeMap<LocalPos, BlockData> {
        &self.block_data
    }

    /// Attaches a payload without touching the block state.
    pub fn insert_block_data(&mut self, pos: LocalPos, data: BlockData) {
        self.block_data.insert(pos, data);
    }

    pub fn blocks(&self) -> &[StateId] {
        &self.blocks
    }

    pub fn biomes(&self) -> &[BiomeId; BIOME_COUNT] {
        &self.biomes
    }

    pub fn set_biomes(&mut self, biomes: [BiomeId; BIOME_COUNT]) {
        self.biomes = biomes;
    }

    /// True when every block is air and no cell carries a payload.
    /// Biomes do not matter here.
    pub fn is_default(&self) -> bool {
        self.block_data.is_empty() && self.blocks.iter().all(|&s| s == DEFAULT_STATE)
    }

    fn pos(x: u8, y: u8, z: u8) -> LocalPos {
        match LocalPos::new(x, y, z) {
            Some(pos) => pos,
            None => panic!("block coordinate ({x}, {y}, {z}) outside section"),
        }
    }

    fn cell_index(cx: u8, cy: u8, cz: u8) -> usize {
        let n = BIOME_CELLS as u8;
        assert!(
            cx < n && cy < n && cz < n,
            "biome cell ({cx}, {cy}, {cz}) outside section"
        );
        (cz as usize * BIOME_CELLS + cy as usize) * BIOME_CELLS + cx as usize
    }
}
