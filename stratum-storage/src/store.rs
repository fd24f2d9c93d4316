//! Chunk persistence façade: turns sections into rows and back.
//!
//! Reads are isolated per section: a section that cannot be decoded is left
//! at its default and reported, the rest of the chunk still loads. Writes are
//! isolated per chunk: the backend commits all rows or none.

use std::sync::Arc;

use stratum_format::{
    BLOCK_COUNT, BiomeId, Chunk, ChunkKey, CodecError, DEFAULT_BIOME, DEFAULT_STATE, Section,
    StateId, biome, block_data, palette, rle,
};

use crate::record::{BLOCK_DATA_VERSION, ChunkRecord, SaveReceipt, SectionRecord, StoredChunk};
use crate::{ChunkStorage, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Biome used for sections without biome data or with malformed data.
    pub default_biome: BiomeId,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_biome: DEFAULT_BIOME,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionIssueKind {
    UnsupportedVersion(i32),
    Corrupt(CodecError),
}

/// A section that was skipped and left at its default during a load.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionIssue {
    pub section_y: i32,
    pub kind: SectionIssueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(Chunk),
    /// Some sections were skipped; they are present but default.
    PartiallyLoaded { chunk: Chunk, issues: Vec<SectionIssue> },
    /// No chunk row; the caller decides whether to generate.
    NotFound,
}

impl LoadOutcome {
    pub fn into_chunk(self) -> Option<Chunk> {
        match self {
            LoadOutcome::Loaded(chunk) | LoadOutcome::PartiallyLoaded { chunk, .. } => Some(chunk),
            LoadOutcome::NotFound => None,
        }
    }

    pub fn issues(&self) -> &[SectionIssue] {
        match self {
            LoadOutcome::PartiallyLoaded { issues, .. } => issues,
            _ => &[],
        }
    }
}

pub struct ChunkStore {
    storage: Arc<dyn ChunkStorage>,
    config: StoreConfig,
}

impl ChunkStore {
    pub fn new(storage: Arc<dyn ChunkStorage>, config: StoreConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &Arc<dyn ChunkStorage> {
        &self.storage
    }

    pub async fn load(&self, key: ChunkKey) -> Result<LoadOutcome, StoreError> {
        let stored = self.storage.load_chunk(key).await?;
        Ok(self.decode_chunk(key, stored))
    }

    /// Persists every section between the lowest and highest occupied
    /// section Y. Nothing is written if any part fails.
    pub async fn save(&self, chunk: &Chunk) -> Result<SaveReceipt, StoreError> {
        let record = self.encode_chunk(chunk).map_err(|e| encode_failure(chunk.key, e))?;
        let result = self.storage.save_chunk(&record).await;
        log_save(chunk.key, &result);
        result
    }

    /// Gaps inside the occupied range are written as default sections
    /// carrying the configured default biome.
    pub fn encode_chunk(&self, chunk: &Chunk) -> Result<ChunkRecord, CodecError> {
        let mut sections = Vec::new();
        if let Some(range) = chunk.section_range() {
            let empty = Section::new(self.config.default_biome);
            for y in range {
                let section = chunk.section(y).unwrap_or(&empty);
                sections.push(encode_section(y, section)?);
            }
        }
        Ok(ChunkRecord {
            key: chunk.key,
            island_id: chunk.island_id,
            sections,
        })
    }

    pub fn decode_chunk(&self, key: ChunkKey, stored: Option<StoredChunk>) -> LoadOutcome {
        let Some(stored) = stored else {
            log::info!("Chunk {} not found", key);
            return LoadOutcome::NotFound;
        };

        let mut chunk = Chunk::new(key);
        chunk.island_id = stored.record.island_id;
        let mut issues = Vec::new();

        for record in &stored.record.sections {
            let section = match decode_section(record, self.config.default_biome) {
                Ok(section) => section,
                Err(kind) => {
                    log::warn!(
                        "Skipping section {} of chunk {}: {:?}",
                        record.section_y,
                        stored.chunk_id,
                        kind
                    );
                    issues.push(SectionIssue {
                        section_y: record.section_y,
                        kind,
                    });
                    Section::new(self.config.default_biome)
                }
            };
            chunk.sections.insert(record.section_y, section);
        }

        log::info!(
            "Loaded chunk {} ({} sections, {} skipped)",
            key,
            chunk.sections.len(),
            issues.len()
        );
        if issues.is_empty() {
            LoadOutcome::Loaded(chunk)
        } else {
            LoadOutcome::PartiallyLoaded { chunk, issues }
        }
    }
}

pub(crate) fn log_save(key: ChunkKey, result: &Result<SaveReceipt, StoreError>) {
    match result {
        Ok(receipt) => log::info!(
            "Saved chunk {} ({} sections) as {}",
            key,
            receipt.section_ids.len(),
            receipt.chunk_id
        ),
        Err(e) => log::error!("Failed to save chunk {}: {}", key, e),
    }
}

pub(crate) fn encode_failure(key: ChunkKey, e: CodecError) -> StoreError {
    log::error!("Failed to encode chunk {}: {}", key, e);
    StoreError::TransactionFailure {
        key,
        source: Box::new(e),
    }
}

fn encode_section(section_y: i32, section: &Section) -> Result<SectionRecord, CodecError> {
    let block_nbt_data = block_data::encode(section.block_data_entries());
    let paletted = palette::encode(section.blocks());

    let (block_palette, block_indices) = if paletted.is_all_default() && block_nbt_data.is_none() {
        (None, None)
    } else {
        let ids = paletted
            .palette
            .iter()
            .map(|&state| {
                i32::try_from(state).map_err(|_| {
                    CodecError::InvalidArgument(format!("state id {} does not fit INT", state))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        (Some(ids), Some(rle::encode(&paletted.indices)))
    };

    Ok(SectionRecord {
        section_y,
        block_palette,
        block_indices,
        block_nbt_data,
        biome_data: Some(biome::encode(section.biomes())?),
        block_data_version: BLOCK_DATA_VERSION,
    })
}

fn decode_section(
    record: &SectionRecord,
    default_biome: BiomeId,
) -> Result<Section, SectionIssueKind> {
    if record.block_data_version != BLOCK_DATA_VERSION {
        return Err(SectionIssueKind::UnsupportedVersion(record.block_data_version));
    }

    let blocks = match (&record.block_palette, &record.block_indices) {
        (Some(ids), Some(bytes)) => {
            let indices = rle::decode(bytes, BLOCK_COUNT).map_err(SectionIssueKind::Corrupt)?;
            let negative = ids.iter().filter(|&&id| id < 0).count();
            if negative > 0 {
                log::warn!(
                    "Section {}: {} negative palette entries read as air",
                    record.section_y,
                    negative
                );
            }
            let states: Vec<StateId> = ids
                .iter()
                .map(|&id| StateId::try_from(id).unwrap_or(DEFAULT_STATE))
                .collect();
            palette::decode(&states, &indices).map_err(SectionIssueKind::Corrupt)?
        }
        (None, None) => vec![DEFAULT_STATE; BLOCK_COUNT],
        _ => return Err(SectionIssueKind::Corrupt(CodecError::IncompletePalette)),
    };

    let actual = blocks.len();
    let mut section = Section::from_blocks(blocks, default_biome).ok_or(SectionIssueKind::Corrupt(
        CodecError::SizeMismatch {
            what: "block grid",
            expected: BLOCK_COUNT,
            actual,
        },
    ))?;

    if let Some(value) = &record.block_nbt_data {
        let (entries, rejected) = block_data::decode(value);
        if rejected > 0 {
            log::warn!(
                "Section {}: dropped {} block data entries",
                record.section_y,
                rejected
            );
        }
        for (pos, data) in entries {
            section.insert_block_data(pos, data);
        }
    }

    if let Some(bytes) = &record.biome_data {
        section.set_biomes(biome::decode(bytes, default_biome));
    }

    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use stratum_format::BlockData;
    use uuid::Uuid;

    const STONE: StateId = 1;

    fn setup() -> (Arc<MemoryStorage>, ChunkStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = ChunkStore::new(storage.clone(), StoreConfig { default_biome: 7 });
        (storage, store)
    }

    fn key() -> ChunkKey {
        ChunkKey::new(Uuid::from_u128(0xA11CE), 3, -2)
    }

    fn populated_chunk(seed: u64) -> Chunk {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut chunk = Chunk::new(key());
        chunk.island_id = Some(Uuid::from_u128(99));
        for y in -1..=3 {
            let section = chunk.section_mut(y);
            for i in 0..BLOCK_COUNT {
                let pos = stratum_format::LocalPos::from_index(i);
                let state = if rng.random_bool(0.3) { rng.random_range(1..50) } else { STONE };
                section.set_block(pos.x, pos.y, pos.z, state, None);
            }
            section.set_block(2, 3, 4, 77, Some(BlockData::new("{Items:[]}")));
            section.set_biome(0, 1, 2, 12);
            section.set_biome(3, 3, 3, 13);
        }
        chunk
    }

    #[tokio::test]
    async fn test_missing_chunk_is_not_found() {
        let (_, store) = setup();
        assert_eq!(store.load(key()).await.unwrap(), LoadOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_save_then_load_reproduces_chunk() {
        let (_, store) = setup();
        let chunk = populated_chunk(1);
        store.save(&chunk).await.unwrap();

        match store.load(key()).await.unwrap() {
            LoadOutcome::Loaded(loaded) => assert_eq!(loaded, chunk),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stone_section_scenario() {
        let (storage, store) = setup();
        let mut chunk = Chunk::new(key());
        chunk.section_mut(0).fill(STONE);
        store.save(&chunk).await.unwrap();

        let stored = storage.load_chunk(key()).await.unwrap().unwrap();
        let row = &stored.record.sections[0];
        assert_eq!(row.section_y, 0);
        assert_eq!(row.block_palette, Some(vec![STONE as i32]));
        // One run of palette index 0 covering the whole section.
        let mut expected = 0u32.to_be_bytes().to_vec();
        expected.extend_from_slice(&4096u32.to_be_bytes());
        assert_eq!(row.block_indices.as_ref().map(Vec::len), Some(16));
        assert_eq!(row.block_indices, Some(expected));

        let loaded = store.load(key()).await.unwrap().into_chunk().unwrap();
        assert!(loaded.section(0).unwrap().blocks().iter().all(|&s| s == STONE));
    }

    #[tokio::test]
    async fn test_air_section_persists_as_nulls() {
        let (storage, store) = setup();
        let mut chunk = Chunk::new(key());
        chunk.section_mut(5).fill_biome(7);
        store.save(&chunk).await.unwrap();

        let stored = storage.load_chunk(key()).await.unwrap().unwrap();
        let row = &stored.record.sections[0];
        assert_eq!(row.block_palette, None);
        assert_eq!(row.block_indices, None);
        assert_eq!(row.block_nbt_data, None);

        let loaded = store.load(key()).await.unwrap().into_chunk().unwrap();
        assert!(loaded.section(5).unwrap().is_default());
        assert_eq!(loaded, chunk);
    }

    #[tokio::test]
    async fn test_air_with_block_data_keeps_palette() {
        let (storage, store) = setup();
        let mut chunk = Chunk::new(key());
        chunk
            .section_mut(0)
            .set_block(0, 0, 0, DEFAULT_STATE, Some(BlockData::new("{marker:1b}")));
        store.save(&chunk).await.unwrap();

        let stored = storage.load_chunk(key()).await.unwrap().unwrap();
        assert!(stored.record.sections[0].block_palette.is_some());
        let loaded = store.load(key()).await.unwrap().into_chunk().unwrap();
        assert_eq!(loaded, chunk);
    }

    #[tokio::test]
    async fn test_gaps_are_written_as_default_sections() {
        let (storage, store) = setup();
        let mut chunk = Chunk::new(key());
        chunk.section_mut(-2).fill(STONE);
        chunk.section_mut(1).fill(STONE);
        let receipt = store.save(&chunk).await.unwrap();

        let ys: Vec<i32> = receipt.section_ids.iter().map(|(y, _)| *y).collect();
        assert_eq!(ys, vec![-2, -1, 0, 1]);
        let stored = storage.load_chunk(key()).await.unwrap().unwrap();
        assert_eq!(stored.record.sections[1].block_palette, None);

        let loaded = store.load(key()).await.unwrap().into_chunk().unwrap();
        let gap = loaded.section(-1).unwrap();
        assert!(gap.biomes().iter().all(|&b| b == 7));
        assert_eq!(gap, &Section::new(7));
    }

    #[tokio::test]
    async fn test_resave_touches_last_modified() {
        let (storage, store) = setup();
        let mut chunk = Chunk::new(key());
        chunk.section_mut(0).fill(STONE);
        store.save(&chunk).await.unwrap();
        let first = storage.last_modified(key()).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        chunk.section_mut(0).set_block(1, 1, 1, 4, None);
        store.save(&chunk).await.unwrap();
        assert!(storage.last_modified(key()).unwrap() > first);
    }

    #[tokio::test]
    async fn test_negative_palette_ids_read_as_air() {
        let (storage, store) = setup();
        let mut chunk = Chunk::new(key());
        chunk.section_mut(0).fill(STONE);
        store.save(&chunk).await.unwrap();

        let mut row = encode_section(0, chunk.section(0).unwrap()).unwrap();
        row.block_palette = Some(vec![-5]);
        storage.overwrite_section(key(), row);

        let loaded = match store.load(key()).await.unwrap() {
            LoadOutcome::Loaded(loaded) => loaded,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert!(loaded.section(0).unwrap().blocks().iter().all(|&s| s == DEFAULT_STATE));
    }

    #[tokio::test]
    async fn test_identity_is_stable_across_saves() {
        let (storage, store) = setup();
        let mut chunk = populated_chunk(2);
        let first = store.save(&chunk).await.unwrap();

        chunk.section_mut(0).set_block(0, 0, 0, 5, None);
        chunk.island_id = None;
        let second = store.save(&chunk).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(storage.chunk_count(), 1);
        let loaded = store.load(key()).await.unwrap().into_chunk().unwrap();
        assert_eq!(loaded.island_id, None);
        assert_eq!(loaded.section(0).unwrap().block(0, 0, 0), 5);
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_everything() {
        let (storage, store) = setup();
        let original = populated_chunk(3);
        store.save(&original).await.unwrap();
        let before = storage.load_chunk(key()).await.unwrap();

        let mut changed = original.clone();
        for section in changed.sections.values_mut() {
            section.fill(STONE);
        }
        // Third of the five sections (-1..=3).
        storage.fail_on_section(1);
        let err = store.save(&changed).await.unwrap_err();
        assert!(matches!(err, StoreError::TransactionFailure { .. }));

        assert_eq!(storage.load_chunk(key()).await.unwrap(), before);
        let loaded = store.load(key()).await.unwrap().into_chunk().unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_failed_first_save_leaves_no_chunk() {
        let (storage, store) = setup();
        storage.fail_on_section(0);
        assert!(store.save(&populated_chunk(4)).await.is_err());
        assert_eq!(storage.chunk_count(), 0);
        assert_eq!(store.load(key()).await.unwrap(), LoadOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_unsupported_version_is_skipped() {
        let (storage, store) = setup();
        let chunk = populated_chunk(5);
        store.save(&chunk).await.unwrap();

        let mut row = encode_section(2, chunk.section(2).unwrap()).unwrap();
        row.block_data_version = 2;
        storage.overwrite_section(key(), row);

        match store.load(key()).await.unwrap() {
            LoadOutcome::PartiallyLoaded { chunk: loaded, issues } => {
                assert_eq!(
                    issues,
                    vec![SectionIssue {
                        section_y: 2,
                        kind: SectionIssueKind::UnsupportedVersion(2),
                    }]
                );
                assert_eq!(loaded.section(2), Some(&Section::new(7)));
                assert_eq!(loaded.section(1), chunk.section(1));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_corrupt_indices_only_affect_their_section() {
        let (storage, store) = setup();
        let chunk = populated_chunk(6);
        store.save(&chunk).await.unwrap();

        let mut row = encode_section(0, chunk.section(0).unwrap()).unwrap();
        row.block_indices = Some(rle::encode(&[0; 100]));
        storage.overwrite_section(key(), row);

        let outcome = store.load(key()).await.unwrap();
        assert_eq!(outcome.issues().len(), 1);
        assert!(matches!(
            outcome.issues()[0].kind,
            SectionIssueKind::Corrupt(CodecError::SizeMismatch { .. })
        ));
        let loaded = outcome.into_chunk().unwrap();
        assert!(loaded.section(0).unwrap().is_default());
        assert_eq!(loaded.section(3), chunk.section(3));
    }

    #[tokio::test]
    async fn test_half_present_palette_is_corrupt() {
        let (storage, store) = setup();
        store.save(&populated_chunk(7)).await.unwrap();

        let mut row = encode_section(-1, populated_chunk(7).section(-1).unwrap()).unwrap();
        row.block_indices = None;
        storage.overwrite_section(key(), row);

        let outcome = store.load(key()).await.unwrap();
        assert_eq!(
            outcome.issues()[0].kind,
            SectionIssueKind::Corrupt(CodecError::IncompletePalette)
        );
    }

    #[tokio::test]
    async fn test_malformed_biomes_degrade_without_skipping() {
        let (storage, store) = setup();
        let chunk = populated_chunk(8);
        store.save(&chunk).await.unwrap();

        let mut row = encode_section(0, chunk.section(0).unwrap()).unwrap();
        row.biome_data = Some(vec![0; 10]);
        storage.overwrite_section(key(), row);

        let loaded = match store.load(key()).await.unwrap() {
            LoadOutcome::Loaded(loaded) => loaded,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let section = loaded.section(0).unwrap();
        assert!(section.biomes().iter().all(|&b| b == 7));
        assert_eq!(section.blocks(), chunk.section(0).unwrap().blocks());
    }
}
