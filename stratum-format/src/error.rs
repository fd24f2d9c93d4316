/// Errors raised while encoding or decoding section payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A decoded structure does not have the length its format requires.
    #[error("{what} size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The caller handed the encoder something it cannot represent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// One half of a palette/indices pair is present without the other.
    #[error("palette and indices must be both present or both absent")]
    IncompletePalette,
}
