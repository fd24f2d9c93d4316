use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use uuid::Uuid;

use crate::section::Section;

/// Natural key of a chunk: world plus horizontal chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub world_id: Uuid,
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    pub fn new(world_id: Uuid, x: i32, z: i32) -> Self {
        Self { world_id, x, z }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) in world {}", self.x, self.z, self.world_id)
    }
}

/// A 16-wide column of sections keyed by section Y (which may be negative).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub key: ChunkKey,
    /// Island that owns this chunk, if any. Owned elsewhere.
    pub island_id: Option<Uuid>,
    pub sections: BTreeMap<i32, Section>,
}

impl Chunk {
    pub fn new(key: ChunkKey) -> Self {
        Self {
            key,
            island_id: None,
            sections: BTreeMap::new(),
        }
    }

    pub fn section(&self, y: i32) -> Option<&Section> {
        self.sections.get(&y)
    }

    /// Returns the section at `y`, creating a default one when absent.
    pub fn section_mut(&mut self, y: i32) -> &mut Section {
        self.sections.entry(y).or_default()
    }

    /// Lowest to highest occupied section Y, `None` for an empty chunk.
    pub fn section_range(&self) -> Option<RangeInclusive<i32>> {
        let min = *self.sections.keys().next()?;
        let max = *self.sections.keys().next_back()?;
        Some(min..=max)
    }
}
