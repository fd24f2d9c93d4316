//! Synchronous access to a [`ChunkStore`] for the simulation thread.
//!
//! The simulation cannot continue without a fully materialised chunk or a
//! definite save result, so each call submits its I/O to the runtime and
//! blocks the calling thread until that unit of work finishes. Encoding and
//! decoding run on the calling thread; only the row I/O moves to the pool.

use std::sync::Arc;

use stratum_format::{Chunk, ChunkKey};
use tokio::runtime::Handle;

use crate::record::SaveReceipt;
use crate::store::{ChunkStore, LoadOutcome, encode_failure, log_save};
use crate::StoreError;

pub struct BlockingChunkStore {
    store: Arc<ChunkStore>,
    handle: Handle,
}

impl BlockingChunkStore {
    pub fn new(store: Arc<ChunkStore>, handle: Handle) -> Self {
        Self { store, handle }
    }

    /// # Panics
    /// When called from inside an async context of the runtime.
    pub fn load(&self, key: ChunkKey) -> Result<LoadOutcome, StoreError> {
        let storage = Arc::clone(self.store.storage());
        let task = self.handle.spawn(async move { storage.load_chunk(key).await });
        let stored = self
            .handle
            .block_on(task)
            .map_err(|e| StoreError::Interrupted(e.to_string()))??;
        Ok(self.store.decode_chunk(key, stored))
    }

    /// The chunk is snapshotted into rows before anything is submitted, so
    /// the caller may resume mutating it once this returns.
    ///
    /// # Panics
    /// When called from inside an async context of the runtime.
    pub fn save(&self, chunk: &Chunk) -> Result<SaveReceipt, StoreError> {
        let record = self.store.encode_chunk(chunk).map_err(|e| encode_failure(chunk.key, e))?;
        let storage = Arc::clone(self.store.storage());
        let task = self.handle.spawn(async move { storage.save_chunk(&record).await });
        let receipt = self
            .handle
            .block_on(task)
            .map_err(|e| StoreError::Interrupted(e.to_string()))?;
        log_save(chunk.key, &receipt);
        receipt
    }
}
