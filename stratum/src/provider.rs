//! Chunk provider for the simulation thread.
//!
//! This is the main interface for getting chunk data:
//! 1. Check if the chunk exists in storage
//! 2. If not, generate it and persist the result

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use stratum_benchmark::StoreMetrics;
use stratum_format::{Chunk, ChunkKey};
use stratum_gen::WorldGenerator;
use stratum_storage::{BlockingChunkStore, LoadOutcome, SaveReceipt};

pub struct ChunkProvider {
    store: BlockingChunkStore,
    generator: Arc<dyn WorldGenerator>,
    metrics: Arc<StoreMetrics>,
}

impl ChunkProvider {
    pub fn new(
        store: BlockingChunkStore,
        generator: Arc<dyn WorldGenerator>,
        metrics: Arc<StoreMetrics>,
    ) -> Self {
        Self { store, generator, metrics }
    }

    pub fn get_or_generate(&self, key: ChunkKey) -> Result<Chunk> {
        let started = Instant::now();
        match self.store.load(key)? {
            LoadOutcome::Loaded(chunk) => {
                self.metrics.record_load(started.elapsed(), 0);
                Ok(chunk)
            }
            LoadOutcome::PartiallyLoaded { chunk, issues } => {
                self.metrics.record_load(started.elapsed(), issues.len());
                Ok(chunk)
            }
            LoadOutcome::NotFound => {
                self.metrics.record_missing(started.elapsed());

                let started = Instant::now();
                let mut chunk = Chunk::new(key);
                self.generator
                    .generate(&mut chunk)
                    .with_context(|| format!("Failed to generate chunk {}", key))?;
                self.metrics.record_generation(started.elapsed());

                self.save(&chunk)?;
                Ok(chunk)
            }
        }
    }

    pub fn save(&self, chunk: &Chunk) -> Result<SaveReceipt> {
        let started = Instant::now();
        match self.store.save(chunk) {
            Ok(receipt) => {
                self.metrics.record_save(started.elapsed());
                Ok(receipt)
            }
            Err(e) => {
                self.metrics.record_failed_save();
                Err(e.into())
            }
        }
    }
}
