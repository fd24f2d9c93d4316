//! Fixed-layout biome packing: 64 macro-cell ids as big-endian `u32`s in
//! Z/Y/X cell order, 256 bytes in total.

use crate::error::CodecError;
use crate::section::{BIOME_COUNT, BiomeId};

pub const BIOME_BYTES: usize = BIOME_COUNT * 4;

pub fn encode(ids: &[BiomeId]) -> Result<Vec<u8>, CodecError> {
    if ids.len() != BIOME_COUNT {
        return Err(CodecError::InvalidArgument(format!(
            "biome array must hold {} entries, got {}",
            BIOME_COUNT,
            ids.len()
        )));
    }
    let mut buf = Vec::with_capacity(BIOME_BYTES);
    for id in ids {
        buf.extend_from_slice(&id.to_be_bytes());
    }
    Ok(buf)
}

/// Never fails: a buffer of the wrong size yields `default` in every cell.
pub fn decode(bytes: &[u8], default: BiomeId) -> [BiomeId; BIOME_COUNT] {
    let mut ids = [default; BIOME_COUNT];
    if bytes.len() != BIOME_BYTES {
        log::warn!(
            "biome data size mismatch: expected {} bytes, got {}; using biome {}",
            BIOME_BYTES,
            bytes.len(),
            default
        );
        return ids;
    }
    for (id, raw) in ids.iter_mut().zip(bytes.chunks_exact(4)) {
        *id = BiomeId::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
    }
    ids
}
