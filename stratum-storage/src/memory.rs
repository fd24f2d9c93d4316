//! In-process backend with the same transactional contract as Postgres.
//!
//! A save stages a copy of the chunk's rows and swaps it in only after every
//! section was written, so an injected failure leaves nothing behind.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use async_trait::async_trait;
use stratum_format::ChunkKey;
use uuid::Uuid;

use crate::record::{ChunkRecord, SaveReceipt, SectionRecord, StoredChunk};
use crate::{ChunkStorage, StoreError};

#[derive(Debug, Clone)]
struct ChunkRow {
    chunk_id: Uuid,
    island_id: Option<Uuid>,
    last_modified_at: SystemTime,
    sections: BTreeMap<i32, (Uuid, SectionRecord)>,
}

#[derive(Default)]
pub struct MemoryStorage {
    chunks: Mutex<HashMap<ChunkKey, ChunkRow>>,
    fail_on_section: Mutex<Option<i32>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next save abort when it reaches the section at `section_y`.
    pub fn fail_on_section(&self, section_y: i32) {
        *lock(&self.fail_on_section) = Some(section_y);
    }

    pub fn chunk_count(&self) -> usize {
        lock(&self.chunks).len()
    }

    pub fn last_modified(&self, key: ChunkKey) -> Option<SystemTime> {
        lock(&self.chunks).get(&key).map(|row| row.last_modified_at)
    }

    /// Replaces stored section payloads directly, bypassing the codecs.
    /// Lets tests plant corrupt or foreign-version rows.
    pub fn overwrite_section(&self, key: ChunkKey, section: SectionRecord) -> bool {
        let mut chunks = lock(&self.chunks);
        let Some(row) = chunks.get_mut(&key) else {
            return false;
        };
        let id = row
            .sections
            .get(&section.section_y)
            .map(|(id, _)| *id)
            .unwrap_or_else(Uuid::new_v4);
        row.sections.insert(section.section_y, (id, section));
        true
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ChunkStorage for MemoryStorage {
    async fn load_chunk(&self, key: ChunkKey) -> Result<Option<StoredChunk>, StoreError> {
        let chunks = lock(&self.chunks);
        Ok(chunks.get(&key).map(|row| StoredChunk {
            chunk_id: row.chunk_id,
            record: ChunkRecord {
                key,
                island_id: row.island_id,
                sections: row.sections.values().map(|(_, s)| s.clone()).collect(),
            },
        }))
    }

    async fn save_chunk(&self, record: &ChunkRecord) -> Result<SaveReceipt, StoreError> {
        let key = record.key;
        let fail_on = lock(&self.fail_on_section).take();
        let mut chunks = lock(&self.chunks);

        let mut staged = match chunks.get(&key) {
            Some(existing) => existing.clone(),
            None => ChunkRow {
                chunk_id: Uuid::new_v4(),
                island_id: None,
                last_modified_at: SystemTime::now(),
                sections: BTreeMap::new(),
            },
        };
        staged.island_id = record.island_id;
        staged.last_modified_at = SystemTime::now();

        let mut section_ids = Vec::with_capacity(record.sections.len());
        for section in &record.sections {
            if fail_on == Some(section.section_y) {
                return Err(StoreError::TransactionFailure {
                    key,
                    source: format!("injected failure at section {}", section.section_y).into(),
                });
            }
            let id = staged
                .sections
                .get(&section.section_y)
                .map(|(id, _)| *id)
                .unwrap_or_else(Uuid::new_v4);
            staged.sections.insert(section.section_y, (id, section.clone()));
            section_ids.push((section.section_y, id));
        }

        let chunk_id = staged.chunk_id;
        chunks.insert(key, staged);
        Ok(SaveReceipt { chunk_id, section_ids })
    }
}
