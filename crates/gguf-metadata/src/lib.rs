//! GGUF header and metadata decoder.
//!
//! Decodes the prologue of a GGUF file (magic, version, tensor count,
//! metadata count) and the complete metadata key-value table into owned,
//! strongly-typed values. Values are tagged on the wire and arrays may nest
//! arrays; every tag is checked and the first malformed field aborts the
//! whole decode.
//!
//! The tensor index and tensor data that follow the metadata are not decoded.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! let header = gguf_metadata::open(Path::new("model.gguf")).unwrap();
//! header.ensure_magic().unwrap();
//! println!("GGUF v{} with {} tensors", header.version, header.tensor_count);
//! if let Some(arch) = header.get_str("general.architecture") {
//!     println!("architecture: {arch}");
//! }
//! ```

use std::io::Read;
use std::path::Path;

pub mod config;
pub mod error;
pub mod reader;
pub mod scalar;
pub mod types;
pub mod writer;

pub use config::{ConfigError, DecoderConfig};
pub use error::{GgufError, Result};
pub use reader::GgufReader;
pub use scalar::Scalar;
pub use types::{GgufArray, GgufHeader, GgufMetadataKv, GgufString, GgufValue, GgufValueType};
pub use writer::{GgufWriter, encode};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The four bytes every GGUF file starts with.
pub const GGUF_MAGIC_BYTES: [u8; 4] = *b"GGUF";
/// [`GGUF_MAGIC_BYTES`] read as a little-endian `u32`.
pub const GGUF_MAGIC: u32 = u32::from_le_bytes(GGUF_MAGIC_BYTES);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Returns `true` if `data` starts with the GGUF magic bytes.
#[inline]
pub fn check_magic(data: &[u8]) -> bool {
    data.get(0..4) == Some(&GGUF_MAGIC_BYTES[..])
}

/// Decode a complete in-memory GGUF prefix with the default configuration.
pub fn decode(data: &[u8]) -> Result<GgufHeader> {
    decode_with(data, &DecoderConfig::default())
}

pub fn decode_with(data: &[u8], config: &DecoderConfig) -> Result<GgufHeader> {
    decode_reader(data, config)
}

/// Decode from any byte source. Bytes after the metadata table are left
/// unread.
pub fn decode_reader<R: Read>(reader: R, config: &DecoderConfig) -> Result<GgufHeader> {
    GgufReader::with_config(reader, config.clone()).read_header()
}

/// Memory-map a GGUF file and decode its header and metadata.
///
/// The mapping is released before this returns, on success or failure.
pub fn open(path: &Path) -> Result<GgufHeader> {
    open_with(path, &DecoderConfig::default())
}

pub fn open_with(path: &Path, config: &DecoderConfig) -> Result<GgufHeader> {
    let file = std::fs::File::open(path)?;
    // SAFETY: we do not mutate the mapping and the file is opened read-only.
    let mmap = unsafe { memmap2::Mmap::map(&file) }?;
    tracing::debug!(path = %path.display(), len = mmap.len(), "mapped GGUF file");
    decode_with(&mmap[..], config)
}

/// Read a GGUF file asynchronously using Tokio, then decode it.
#[cfg(feature = "rt-tokio")]
pub async fn read_file(path: impl AsRef<Path>) -> Result<GgufHeader> {
    let data = tokio::fs::read(path).await?;
    decode(&data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
