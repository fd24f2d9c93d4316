use anyhow::Result;
use stratum_format::Chunk;

use crate::builder::ChunkBuilder;
use crate::{WorldGenerator, WorldHeight, states};

pub struct FlatGenerator {
    pub height: WorldHeight,
}

impl WorldGenerator for FlatGenerator {
    fn generate(&self, chunk: &mut Chunk) -> Result<()> {
        let mut builder = ChunkBuilder::new();
        let floor = self.height.min_y();

        // 1. Bedrock floor
        builder.fill_layer(floor, states::BEDROCK);

        // 2. Dirt layers
        for y in floor + 1..floor + 4 {
            builder.fill_layer(y, states::DIRT);
        }

        // 3. Grass on top
        builder.fill_layer(floor + 4, states::GRASS_BLOCK);

        // 4. A stone pillar so the column is not uniform
        for y in floor + 5..floor + 15 {
            builder.set_block(8, y, 8, states::STONE);
        }

        builder.apply(chunk, self.height.min_section, self.height.max_section);
        Ok(())
    }
}
