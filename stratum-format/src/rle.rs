//! Run-length encoding for flat integer sequences.
//!
//! Wire form: a concatenation of `(value: u32 BE, count: u32 BE)` pairs with
//! no header, separator or padding. Used for palette index arrays, but the
//! codec itself knows nothing about palettes.

use crate::error::CodecError;

/// Size of one encoded `(value, count)` pair.
pub const RUN_BYTES: usize = 8;

/// `count` consecutive occurrences of `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub value: u32,
    pub count: u32,
}

/// Collapses consecutive equal values into runs.
pub fn runs(seq: &[u32]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &value in seq {
        match runs.last_mut() {
            Some(run) if run.value == value && run.count < u32::MAX => run.count += 1,
            _ => runs.push(Run { value, count: 1 }),
        }
    }
    runs
}

pub fn encode(seq: &[u32]) -> Vec<u8> {
    let runs = runs(seq);
    let mut buf = Vec::with_capacity(runs.len() * RUN_BYTES);
    for run in runs {
        buf.extend_from_slice(&run.value.to_be_bytes());
        buf.extend_from_slice(&run.count.to_be_bytes());
    }
    buf
}

/// Expands `bytes` back into exactly `expected_len` values.
///
/// Overruns are rejected as soon as they are seen rather than truncated, and
/// a stream that expands to fewer values than expected is rejected too.
pub fn decode(bytes: &[u8], expected_len: usize) -> Result<Vec<u32>, CodecError> {
    if bytes.len() % RUN_BYTES != 0 {
        return Err(CodecError::SizeMismatch {
            what: "run-length byte stream",
            expected: bytes.len() - bytes.len() % RUN_BYTES,
            actual: bytes.len(),
        });
    }

    let mut out = Vec::with_capacity(expected_len);
    for pair in bytes.chunks_exact(RUN_BYTES) {
        let value = u32::from_be_bytes([pair[0], pair[1], pair[2], pair[3]]);
        let count = u32::from_be_bytes([pair[4], pair[5], pair[6], pair[7]]) as usize;

        let total = out.len().saturating_add(count);
        if total > expected_len {
            return Err(CodecError::SizeMismatch {
                what: "run-length expansion",
                expected: expected_len,
                actual: total,
            });
        }
        out.resize(total, value);
    }

    if out.len() != expected_len {
        return Err(CodecError::SizeMismatch {
            what: "run-length expansion",
            expected: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn pair(value: u32, count: u32) -> Vec<u8> {
        let mut b = value.to_be_bytes().to_vec();
        b.extend_from_slice(&count.to_be_bytes());
        b
    }

    #[test]
    fn test_uniform_sequence_is_one_pair() {
        let seq = vec![7u32; 4096];
        let bytes = encode(&seq);
        assert_eq!(bytes, pair(7, 4096));
        assert_eq!(decode(&bytes, 4096).unwrap(), seq);
    }

    #[test]
    fn test_runs_keep_order() {
        let seq = [0, 0, 1, 1, 1, 0, 2];
        assert_eq!(
            runs(&seq),
            vec![
                Run { value: 0, count: 2 },
                Run { value: 1, count: 3 },
                Run { value: 0, count: 1 },
                Run { value: 2, count: 1 },
            ]
        );
    }

    #[test]
    fn test_empty_sequence() {
        assert!(encode(&[]).is_empty());
        assert_eq!(decode(&[], 0).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn test_random_bounded_sequences_survive() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for bound in [1u32, 2, 5, 64] {
            // Long runs and noise both show up with a coin flip per cell.
            let mut seq = Vec::with_capacity(4096);
            let mut current = 0;
            while seq.len() < 4096 {
                if rng.random_bool(0.2) {
                    current = rng.random_range(0..bound);
                }
                seq.push(current);
            }
            assert_eq!(decode(&encode(&seq), 4096).unwrap(), seq);
        }
    }

    #[test]
    fn test_overrun_is_rejected() {
        let mut bytes = pair(1, 4000);
        bytes.extend(pair(2, 200));
        assert_eq!(
            decode(&bytes, 4096),
            Err(CodecError::SizeMismatch {
                what: "run-length expansion",
                expected: 4096,
                actual: 4200,
            })
        );
    }

    #[test]
    fn test_short_stream_is_rejected() {
        let bytes = pair(1, 10);
        assert!(matches!(
            decode(&bytes, 4096),
            Err(CodecError::SizeMismatch { actual: 10, .. })
        ));
    }

    #[test]
    fn test_dangling_bytes_are_rejected() {
        let mut bytes = pair(3, 4096);
        bytes.push(0);
        assert!(matches!(
            decode(&bytes, 4096),
            Err(CodecError::SizeMismatch { what: "run-length byte stream", .. })
        ));
    }

    #[test]
    fn test_huge_count_does_not_allocate() {
        let bytes = pair(0, u32::MAX);
        assert!(decode(&bytes, 4096).is_err());
    }
}
