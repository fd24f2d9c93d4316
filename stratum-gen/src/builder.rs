use std::collections::HashMap;

use stratum_format::{BiomeId, Chunk, DEFAULT_STATE, StateId};

const SECTION_HEIGHT: i32 = 16;

/// Describes a column in world Y coordinates and writes it into a chunk.
///
/// Full layers and single blocks are kept sparse; `apply` expands them into
/// the sections spanning `min_section..=max_section`.
#[derive(Default)]
pub struct ChunkBuilder {
    // Key: (x, world y, z)
    custom_blocks: HashMap<(u8, i32, u8), StateId>,
    // Key: world y
    full_layers: HashMap<i32, StateId>,
    biome: BiomeId,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single block at chunk-local coordinates (x: 0..15, z: 0..15)
    pub fn set_block(&mut self, x: u8, y: i32, z: u8, state: StateId) {
        if x < 16 && z < 16 {
            self.custom_blocks.insert((x, y, z), state);
        }
    }

    /// Fill an entire Y-layer; single blocks on that layer are overwritten.
    pub fn fill_layer(&mut self, y: i32, state: StateId) {
        self.full_layers.insert(y, state);
        self.custom_blocks.retain(|(_, by, _), _| *by != y);
    }

    pub fn biome(&mut self, biome: BiomeId) {
        self.biome = biome;
    }

    pub fn apply(&self, chunk: &mut Chunk, min_section: i32, max_section: i32) {
        for sec_y in min_section..=max_section {
            let start_y = sec_y * SECTION_HEIGHT;
            let section = chunk.section_mut(sec_y);
            section.fill(DEFAULT_STATE);
            section.fill_biome(self.biome);

            for y in 0..SECTION_HEIGHT {
                if let Some(&state) = self.full_layers.get(&(start_y + y)) {
                    for z in 0..16 {
                        for x in 0..16 {
                            section.set_block(x, y as u8, z, state, None);
                        }
                    }
                }
            }
        }

        for (&(x, y, z), &state) in &self.custom_blocks {
            let sec_y = y.div_euclid(SECTION_HEIGHT);
            if (min_section..=max_section).contains(&sec_y) {
                let local_y = y.rem_euclid(SECTION_HEIGHT) as u8;
                chunk.section_mut(sec_y).set_block(x, local_y, z, state, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_format::ChunkKey;
    use uuid::Uuid;

    #[test]
    fn test_negative_world_y_lands_in_lower_section() {
        let mut builder = ChunkBuilder::new();
        builder.fill_layer(-64, 7);
        builder.set_block(8, -1, 8, 3);

        let mut chunk = Chunk::new(ChunkKey::new(Uuid::nil(), 0, 0));
        builder.apply(&mut chunk, -4, 0);

        assert_eq!(chunk.section(-4).unwrap().block(15, 0, 15), 7);
        assert_eq!(chunk.section(-1).unwrap().block(8, 15, 8), 3);
        assert!(chunk.section(0).unwrap().is_default());
        assert_eq!(chunk.section_range(), Some(-4..=0));
    }

    #[test]
    fn test_layer_overrides_earlier_blocks() {
        let mut builder = ChunkBuilder::new();
        builder.set_block(0, 5, 0, 3);
        builder.fill_layer(5, 9);

        let mut chunk = Chunk::new(ChunkKey::new(Uuid::nil(), 0, 0));
        builder.apply(&mut chunk, 0, 0);
        assert_eq!(chunk.section(0).unwrap().block(0, 5, 0), 9);
    }
}
