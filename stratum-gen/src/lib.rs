use anyhow::Result;
use stratum_format::Chunk;

pub mod builder;
pub mod flat;
pub mod hills;

/// Terrain source used by the world owner when a chunk has never been saved.
/// Fills the chunk's sections in place and never touches storage.
pub trait WorldGenerator: Send + Sync {
    fn generate(&self, chunk: &mut Chunk) -> Result<()>;
}

/// Vertical extent of generated chunks, in section units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldHeight {
    pub min_section: i32,
    pub max_section: i32,
}

impl WorldHeight {
    pub fn min_y(&self) -> i32 {
        self.min_section * 16
    }

    pub fn max_y(&self) -> i32 {
        self.max_section * 16 + 15
    }
}

// -64..320, sections -4 to 19
impl Default for WorldHeight {
    fn default() -> Self {
        Self { min_section: -4, max_section: 19 }
    }
}

pub mod states {
    use stratum_format::StateId;

    pub const STONE: StateId = 1;
    pub const GRASS_BLOCK: StateId = 9;
    pub const DIRT: StateId = 10;
    pub const BEDROCK: StateId = 79;
}
