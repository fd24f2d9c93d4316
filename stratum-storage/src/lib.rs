use async_trait::async_trait;
use stratum_format::ChunkKey;

pub mod bridge;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use bridge::BlockingChunkStore;
pub use record::{BLOCK_DATA_VERSION, ChunkRecord, SaveReceipt, SectionRecord, StoredChunk};
pub use store::{ChunkStore, LoadOutcome, SectionIssue, SectionIssueKind, StoreConfig};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No pooled connection became free within the pool's wait timeout.
    #[error("connection pool exhausted: {0}")]
    ResourceExhausted(String),
    /// The chunk write was rolled back; no row changed.
    #[error("saving chunk {key} failed, transaction rolled back")]
    TransactionFailure {
        key: ChunkKey,
        #[source]
        source: BoxError,
    },
    #[error("loading chunk {key} failed")]
    Query {
        key: ChunkKey,
        #[source]
        source: BoxError,
    },
    /// The storage task panicked or was cancelled before reporting back.
    #[error("storage task did not complete: {0}")]
    Interrupted(String),
}

/// Row-level persistence backend. Every `save_chunk` is all-or-nothing.
#[async_trait]
pub trait ChunkStorage: Send + Sync {
    /// Returns `None` when no chunk row exists for `key`.
    async fn load_chunk(&self, key: ChunkKey) -> Result<Option<StoredChunk>, StoreError>;

    /// Upserts the chunk row and every section row in one transaction.
    async fn save_chunk(&self, record: &ChunkRecord) -> Result<SaveReceipt, StoreError>;
}
