//! Row shapes of the `chunk` and `chunk_section` tables.

use stratum_format::ChunkKey;
use uuid::Uuid;

/// The only `block_data_version` this build reads and writes.
pub const BLOCK_DATA_VERSION: i32 = 1;

/// One `chunk_section` row, payload columns only.
///
/// `block_palette` and `block_indices` are both `None` for a section that
/// is entirely air with no block data.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub section_y: i32,
    pub block_palette: Option<Vec<i32>>,
    pub block_indices: Option<Vec<u8>>,
    pub block_nbt_data: Option<serde_json::Value>,
    pub biome_data: Option<Vec<u8>>,
    pub block_data_version: i32,
}

/// Everything written for one chunk in a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub key: ChunkKey,
    pub island_id: Option<Uuid>,
    /// Ordered by `section_y`.
    pub sections: Vec<SectionRecord>,
}

/// A chunk as read back, with its persisted identity.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub chunk_id: Uuid,
    pub record: ChunkRecord,
}

/// Identities assigned or reused by a committed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub chunk_id: Uuid,
    /// `(section_y, section_id)` in write order.
    pub section_ids: Vec<(i32, Uuid)>,
}
