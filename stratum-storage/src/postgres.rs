use crate::record::{ChunkRecord, SaveReceipt, SectionRecord, StoredChunk};
use crate::{ChunkStorage, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_postgres::{
    Config, ManagerConfig, Object, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime,
};
use std::time::Duration;
use stratum_format::ChunkKey;
use tokio_postgres::NoTls;
use uuid::Uuid;

const UPSERT_CHUNK: &str = "
    INSERT INTO chunk (chunk_id, fk_world_id, chunk_x, chunk_z, fk_island_id, last_modified_at)
    VALUES ($1, $2, $3, $4, $5, NOW())
    ON CONFLICT (fk_world_id, chunk_x, chunk_z) DO UPDATE SET
        fk_island_id = EXCLUDED.fk_island_id,
        last_modified_at = NOW()
    RETURNING chunk_id";

const UPSERT_SECTION: &str = "
    INSERT INTO chunk_section (section_id, fk_chunk_id, section_y, block_palette, block_indices,
                               block_nbt_data, biome_data, block_data_version)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (fk_chunk_id, section_y) DO UPDATE SET
        block_palette = EXCLUDED.block_palette,
        block_indices = EXCLUDED.block_indices,
        block_nbt_data = EXCLUDED.block_nbt_data,
        biome_data = EXCLUDED.biome_data,
        block_data_version = EXCLUDED.block_data_version
    RETURNING section_id";

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    /// Placed first on the `search_path` of every pooled connection.
    pub schema: Option<String>,
    pub max_pool_size: usize,
    /// How long a caller waits for a free connection. `None` waits forever.
    pub pool_wait: Option<Duration>,
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            schema: None,
            max_pool_size: 10,
            pool_wait: Some(Duration::from_secs(30)),
        }
    }
}

pub struct PostgresStorage {
    pool: Pool,
}

impl PostgresStorage {
    pub async fn new(config: &PostgresConfig) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url.clone());
        if let Some(schema) = &config.schema {
            cfg.options = Some(format!("-c search_path={},public", schema));
        }
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let mut pool_cfg = PoolConfig::new(config.max_pool_size);
        pool_cfg.timeouts.wait = config.pool_wait;
        cfg.pool = Some(pool_cfg);

        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .context("Failed to create Postgres pool")?;

        // Ensure connections work and schema exists
        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    pub async fn init_schema(&self) -> Result<()> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;

        client.batch_execute("
            CREATE TABLE IF NOT EXISTS chunk (
                chunk_id UUID PRIMARY KEY,
                fk_world_id UUID NOT NULL,
                chunk_x INT NOT NULL,
                chunk_z INT NOT NULL,
                fk_island_id UUID,
                last_modified_at TIMESTAMP NOT NULL DEFAULT NOW(),
                UNIQUE (fk_world_id, chunk_x, chunk_z)
            );
            CREATE TABLE IF NOT EXISTS chunk_section (
                section_id UUID PRIMARY KEY,
                fk_chunk_id UUID NOT NULL REFERENCES chunk (chunk_id),
                section_y INT NOT NULL,
                block_palette INT[],
                block_indices BYTEA,
                block_nbt_data JSONB,
                biome_data BYTEA,
                block_data_version INT NOT NULL,
                UNIQUE (fk_chunk_id, section_y)
            );
        ").await.context("Failed to init chunk schema")?;
        Ok(())
    }

    async fn client(&self, key: ChunkKey, writing: bool) -> Result<Object, StoreError> {
        self.pool.get().await.map_err(|e| match e {
            PoolError::Timeout(kind) => {
                StoreError::ResourceExhausted(format!("timed out waiting for connection ({:?})", kind))
            }
            other if writing => StoreError::TransactionFailure { key, source: other.into() },
            other => StoreError::Query { key, source: other.into() },
        })
    }
}

async fn read_chunk(client: &Object, key: ChunkKey) -> Result<Option<StoredChunk>> {
    let meta = client.query_opt(
        "SELECT chunk_id, fk_island_id FROM chunk
         WHERE fk_world_id = $1 AND chunk_x = $2 AND chunk_z = $3",
        &[&key.world_id, &key.x, &key.z],
    ).await.context("Failed to query chunk row")?;

    let Some(meta) = meta else {
        return Ok(None);
    };
    let chunk_id: Uuid = meta.try_get("chunk_id")?;
    let island_id: Option<Uuid> = meta.try_get("fk_island_id")?;

    let rows = client.query(
        "SELECT section_y, block_palette, block_indices, block_nbt_data, biome_data, block_data_version
         FROM chunk_section WHERE fk_chunk_id = $1 ORDER BY section_y",
        &[&chunk_id],
    ).await.context("Failed to query section rows")?;

    let mut sections = Vec::with_capacity(rows.len());
    for row in &rows {
        sections.push(SectionRecord {
            section_y: row.try_get("section_y")?,
            block_palette: row.try_get("block_palette")?,
            block_indices: row.try_get("block_indices")?,
            block_nbt_data: row.try_get("block_nbt_data")?,
            biome_data: row.try_get("biome_data")?,
            block_data_version: row.try_get("block_data_version")?,
        });
    }

    Ok(Some(StoredChunk {
        chunk_id,
        record: ChunkRecord { key, island_id, sections },
    }))
}

/// Chunk row first: every section row references it.
async fn write_chunk(tx: &tokio_postgres::Transaction<'_>, record: &ChunkRecord) -> Result<SaveReceipt> {
    let key = record.key;
    let chunk_id: Uuid = tx.query_one(
        UPSERT_CHUNK,
        &[&Uuid::new_v4(), &key.world_id, &key.x, &key.z, &record.island_id],
    ).await.context("Failed to upsert chunk row")?.try_get(0)?;

    let stmt = tx.prepare(UPSERT_SECTION).await.context("Failed to prepare section upsert")?;
    let mut section_ids = Vec::with_capacity(record.sections.len());
    for section in &record.sections {
        let section_id: Uuid = tx.query_one(
            &stmt,
            &[
                &Uuid::new_v4(),
                &chunk_id,
                &section.section_y,
                &section.block_palette,
                &section.block_indices,
                &section.block_nbt_data,
                &section.biome_data,
                &section.block_data_version,
            ],
        ).await.with_context(|| format!("Failed to upsert section {}", section.section_y))?.try_get(0)?;
        section_ids.push((section.section_y, section_id));
    }

    Ok(SaveReceipt { chunk_id, section_ids })
}

#[async_trait]
impl ChunkStorage for PostgresStorage {
    async fn load_chunk(&self, key: ChunkKey) -> Result<Option<StoredChunk>, StoreError> {
        let client = self.client(key, false).await?;
        read_chunk(&client, key)
            .await
            .map_err(|e| StoreError::Query { key, source: e.into() })
    }

    async fn save_chunk(&self, record: &ChunkRecord) -> Result<SaveReceipt, StoreError> {
        let key = record.key;
        let mut client = self.client(key, true).await?;

        // Dropping an uncommitted transaction rolls it back, and dropping the
        // pooled object hands the connection back in autocommit mode.
        let result = async {
            let tx = client.transaction().await.context("Failed to begin transaction")?;
            let receipt = write_chunk(&tx, record).await?;
            tx.commit().await.context("Failed to commit chunk")?;
            Ok::<_, anyhow::Error>(receipt)
        }.await;

        result.map_err(|e| StoreError::TransactionFailure { key, source: e.into() })
    }
}
