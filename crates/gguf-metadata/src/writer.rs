//! Encoder for the GGUF prologue and metadata table.
//!
//! The exact inverse of [`GgufReader`](crate::GgufReader); used to build
//! fixtures and to check that decoding is lossless.

use std::io::Write;

use crate::error::{GgufError, Result};
use crate::scalar::Scalar;
use crate::types::{GgufArray, GgufHeader, GgufMetadataKv, GgufValue, GgufValueType};

/// Position-tracking GGUF encoder over a byte sink.
#[derive(Debug)]
pub struct GgufWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> GgufWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes written so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_scalar<T: Scalar>(&mut self, v: T) -> Result<()> {
        v.write_le(&mut self.inner)?;
        self.position += T::WIDTH as u64;
        Ok(())
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_scalar(u8::from(v))
    }

    pub fn write_string(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_scalar(bytes.len() as u64)?;
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    pub fn write_value_type(&mut self, ty: GgufValueType) -> Result<()> {
        self.write_scalar(ty.as_u32())
    }

    /// Write a value's payload. The tag is not written.
    pub fn write_value(&mut self, value: &GgufValue) -> Result<()> {
        match value {
            GgufValue::Uint8(v) => self.write_scalar(*v),
            GgufValue::Int8(v) => self.write_scalar(*v),
            GgufValue::Uint16(v) => self.write_scalar(*v),
            GgufValue::Int16(v) => self.write_scalar(*v),
            GgufValue::Uint32(v) => self.write_scalar(*v),
            GgufValue::Int32(v) => self.write_scalar(*v),
            GgufValue::Float32(v) => self.write_scalar(*v),
            GgufValue::Bool(v) => self.write_bool(*v),
            GgufValue::String(s) => self.write_string(s.as_bytes()),
            GgufValue::Array(a) => self.write_array(a),
            GgufValue::Uint64(v) => self.write_scalar(*v),
            GgufValue::Int64(v) => self.write_scalar(*v),
            GgufValue::Float64(v) => self.write_scalar(*v),
        }
    }

    pub fn write_array(&mut self, array: &GgufArray) -> Result<()> {
        self.write_value_type(array.element_type())?;
        self.write_scalar(array.len())?;
        array.values().iter().try_for_each(|v| self.write_value(v))
    }

    pub fn write_metadata_kv(&mut self, kv: &GgufMetadataKv) -> Result<()> {
        self.write_string(kv.key.as_bytes())?;
        self.write_value_type(kv.value_type())?;
        self.write_value(&kv.value)
    }

    /// Write the prologue and every entry.
    ///
    /// Fails if `metadata_kv_count` disagrees with the entry list, since the
    /// result could not be decoded back.
    pub fn write_header(&mut self, header: &GgufHeader) -> Result<()> {
        let actual = header.metadata.len() as u64;
        if header.metadata_kv_count != actual {
            return Err(GgufError::MetadataCountMismatch {
                declared: header.metadata_kv_count,
                actual,
            });
        }
        self.write_scalar(header.magic)?;
        self.write_scalar(header.version)?;
        self.write_scalar(header.tensor_count)?;
        self.write_scalar(header.metadata_kv_count)?;
        header.metadata.iter().try_for_each(|kv| self.write_metadata_kv(kv))
    }
}

/// Encode `header` into a fresh buffer.
pub fn encode(header: &GgufHeader) -> Result<Vec<u8>> {
    let mut w = GgufWriter::new(Vec::new());
    w.write_header(header)?;
    Ok(w.into_inner())
}
