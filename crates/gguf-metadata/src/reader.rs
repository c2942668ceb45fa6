//! Sequential decoder for the GGUF prologue and metadata table.
//!
//! [`GgufReader`] wraps any [`Read`] source and consumes it strictly left to
//! right. Each field's position depends on the lengths of everything before
//! it, so there is no seeking and no skipping: the first malformed field
//! aborts the decode.

use std::io::{self, Read};

use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::error::{GgufError, Result};
use crate::scalar::{MAX_SCALAR_WIDTH, Scalar};
use crate::types::{
    GgufArray, GgufHeader, GgufMetadataKv, GgufString, GgufValue, GgufValueType,
};
use crate::GGUF_MAGIC;

/// Upper bounds on capacity reserved up front for strings (bytes) and for
/// arrays and metadata tables (elements).
///
/// Declared lengths come from untrusted input; anything beyond these grows as
/// bytes actually arrive.
const PREALLOC_BYTES: usize = 64 * 1024;
const PREALLOC_ITEMS: usize = 4096;

#[inline]
fn initial_capacity(declared: u64, limit: usize) -> usize {
    usize::try_from(declared).map_or(limit, |n| n.min(limit))
}

/// Position-tracking GGUF decoder over a byte source.
#[derive(Debug)]
pub struct GgufReader<R> {
    inner: R,
    position: u64,
    config: DecoderConfig,
}

impl<R: Read> GgufReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, DecoderConfig::default())
    }

    pub fn with_config(inner: R, config: DecoderConfig) -> Self {
        Self { inner, position: 0, config }
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(GgufError::TruncatedInput {
                offset: self.position,
                needed: buf.len() as u64,
            }),
            Err(e) => Err(e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------------

    /// Read one packed little-endian scalar.
    pub fn read_scalar<T: Scalar>(&mut self) -> Result<T> {
        let mut buf = [0u8; MAX_SCALAR_WIDTH];
        let bytes = &mut buf[..T::WIDTH];
        self.fill(bytes)?;
        Ok(T::from_le_slice(bytes))
    }

    /// Read a one-byte bool; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_scalar::<u8>()? != 0)
    }

    /// Read a `u64` length followed by that many opaque bytes.
    pub fn read_string(&mut self) -> Result<GgufString> {
        let len = self.read_scalar::<u64>()?;
        let offset = self.position;

        let mut bytes = Vec::with_capacity(initial_capacity(len, PREALLOC_BYTES));
        let got = (&mut self.inner).take(len).read_to_end(&mut bytes)? as u64;
        self.position += got;

        if got < len {
            return Err(GgufError::TruncatedInput { offset, needed: len });
        }
        Ok(GgufString::new(bytes))
    }

    /// Read a `u32` type tag, rejecting values outside the thirteen known tags.
    pub fn read_value_type(&mut self) -> Result<GgufValueType> {
        let offset = self.position;
        let raw = self.read_scalar::<u32>()?;
        GgufValueType::from_u32(raw).ok_or(GgufError::UnknownTypeTag { raw, offset })
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    /// Decode one value whose tag has already been read.
    pub fn read_value(&mut self, ty: GgufValueType) -> Result<GgufValue> {
        self.read_value_at(ty, 0)
    }

    /// Decode an array payload: element tag, `u64` count, then the elements.
    pub fn read_array(&mut self) -> Result<GgufArray> {
        self.read_array_at(1)
    }

    fn read_value_at(&mut self, ty: GgufValueType, depth: usize) -> Result<GgufValue> {
        Ok(match ty {
            GgufValueType::Uint8 => GgufValue::Uint8(self.read_scalar()?),
            GgufValueType::Int8 => GgufValue::Int8(self.read_scalar()?),
            GgufValueType::Uint16 => GgufValue::Uint16(self.read_scalar()?),
            GgufValueType::Int16 => GgufValue::Int16(self.read_scalar()?),
            GgufValueType::Uint32 => GgufValue::Uint32(self.read_scalar()?),
            GgufValueType::Int32 => GgufValue::Int32(self.read_scalar()?),
            GgufValueType::Float32 => GgufValue::Float32(self.read_scalar()?),
            GgufValueType::Bool => GgufValue::Bool(self.read_bool()?),
            GgufValueType::String => GgufValue::String(self.read_string()?),
            GgufValueType::Array => GgufValue::Array(self.read_array_at(depth + 1)?),
            GgufValueType::Uint64 => GgufValue::Uint64(self.read_scalar()?),
            GgufValueType::Int64 => GgufValue::Int64(self.read_scalar()?),
            GgufValueType::Float64 => GgufValue::Float64(self.read_scalar()?),
        })
    }

    /// `depth` counts this array: a top-level array value is depth 1.
    fn read_array_at(&mut self, depth: usize) -> Result<GgufArray> {
        let limit = self.config.max_nesting_depth;
        if depth > limit {
            return Err(GgufError::TooDeeplyNested { offset: self.position, limit });
        }

        let element_type = self.read_value_type()?;
        let count = self.read_scalar::<u64>()?;

        let mut values = Vec::with_capacity(initial_capacity(count, PREALLOC_ITEMS));
        for _ in 0..count {
            values.push(self.read_value_at(element_type, depth)?);
        }
        Ok(GgufArray::from_decoded(element_type, values))
    }

    // -----------------------------------------------------------------------
    // Entries and header
    // -----------------------------------------------------------------------

    /// Decode one metadata entry: key, tag, value.
    pub fn read_metadata_kv(&mut self) -> Result<GgufMetadataKv> {
        let key = self.read_string()?;
        let ty = self.read_value_type()?;
        let value = self.read_value(ty)?;
        trace!(key = %key, ty = %ty, end = self.position, "decoded metadata entry");
        Ok(GgufMetadataKv { key, value })
    }

    /// Decode the prologue and the full metadata table.
    pub fn read_header(&mut self) -> Result<GgufHeader> {
        let magic = self.read_scalar::<u32>()?;
        if self.config.require_magic && magic != GGUF_MAGIC {
            return Err(GgufError::BadMagic(magic));
        }
        let version = self.read_scalar::<u32>()?;
        let tensor_count = self.read_scalar::<u64>()?;
        let metadata_kv_count = self.read_scalar::<u64>()?;
        debug!(magic, version, tensor_count, metadata_kv_count, "read GGUF prologue");

        let mut metadata = Vec::with_capacity(initial_capacity(metadata_kv_count, PREALLOC_ITEMS));
        for _ in 0..metadata_kv_count {
            metadata.push(self.read_metadata_kv()?);
        }

        debug!(entries = metadata.len(), bytes = self.position, "decoded GGUF metadata");
        Ok(GgufHeader { magic, version, tensor_count, metadata_kv_count, metadata })
    }
}
