//! Section data model and the binary codecs used to persist it.

pub mod biome;
pub mod block_data;
pub mod chunk;
pub mod error;
pub mod palette;
pub mod rle;
pub mod section;

pub use chunk::{Chunk, ChunkKey};
pub use error::CodecError;
pub use section::{
    BIOME_COUNT, BLOCK_COUNT, BiomeId, BlockData, DEFAULT_BIOME, DEFAULT_STATE, LocalPos, Section,
    StateId,
};
