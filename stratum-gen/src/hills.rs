use crate::builder::ChunkBuilder;
use crate::{WorldGenerator, WorldHeight, states};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stratum_format::{BiomeId, Chunk};

/// Seeded rolling terrain: one surface height and biome per chunk,
/// stone under a few layers of dirt and a grass cap.
pub struct HillsGenerator {
    seed: u64,
    height: WorldHeight,
    biomes: Vec<BiomeId>,
}

impl HillsGenerator {
    pub fn new(seed: u64, height: WorldHeight) -> Self {
        Self { seed, height, biomes: vec![1, 4, 5] }
    }

    fn chunk_rng(&self, x: i32, z: i32) -> StdRng {
        let mixed = self.seed
            ^ (x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (z as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
        StdRng::seed_from_u64(mixed)
    }
}

impl WorldGenerator for HillsGenerator {
    fn generate(&self, chunk: &mut Chunk) -> Result<()> {
        let mut rng = self.chunk_rng(chunk.key.x, chunk.key.z);
        let mut builder = ChunkBuilder::new();

        let base_height = 58;
        let surface_y = (base_height + rng.random_range(-4..6)).min(self.height.max_y());
        let floor = self.height.min_y();

        builder.biome(self.biomes[rng.random_range(0..self.biomes.len())]);
        builder.fill_layer(floor, states::BEDROCK);
        for y in floor + 1..surface_y - 3 {
            builder.fill_layer(y, states::STONE);
        }
        for y in surface_y - 3..surface_y {
            builder.fill_layer(y, states::DIRT);
        }
        builder.fill_layer(surface_y, states::GRASS_BLOCK);

        builder.apply(chunk, self.height.min_section, self.height.max_section);
        Ok(())
    }
}
