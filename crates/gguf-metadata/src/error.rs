use std::io;

use thiserror::Error;

use crate::types::GgufValueType;

/// Errors returned when decoding or encoding GGUF metadata.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GgufError {
    #[error("truncated input: needed {needed} bytes at offset {offset}")]
    TruncatedInput { offset: u64, needed: u64 },
    #[error("unknown type tag {raw} at offset {offset}")]
    UnknownTypeTag { raw: u32, offset: u64 },
    #[error("array nesting exceeds limit of {limit} at offset {offset}")]
    TooDeeplyNested { offset: u64, limit: usize },
    #[error("bad magic: {0:#010x}")]
    BadMagic(u32),
    #[error("array of {expected} contains a {found} element")]
    ArrayTypeMismatch { expected: GgufValueType, found: GgufValueType },
    #[error("header declares {declared} metadata entries but holds {actual}")]
    MetadataCountMismatch { declared: u64, actual: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, GgufError>;
