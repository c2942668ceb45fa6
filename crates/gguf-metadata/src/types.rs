//! In-memory model of a decoded GGUF header and its metadata table.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GgufError, Result};
use crate::GGUF_MAGIC;

// ---------------------------------------------------------------------------
// Value-type discriminant
// ---------------------------------------------------------------------------

/// Discriminant tag for GGUF metadata values.
///
/// Numeric values match the `u32` written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum GgufValueType {
    Uint8 = 0,
    Int8 = 1,
    Uint16 = 2,
    Int16 = 3,
    Uint32 = 4,
    Int32 = 5,
    Float32 = 6,
    Bool = 7,
    String = 8,
    Array = 9,
    Uint64 = 10,
    Int64 = 11,
    Float64 = 12,
}

impl GgufValueType {
    /// All thirteen tags in wire order.
    pub const ALL: [Self; 13] = [
        Self::Uint8,
        Self::Int8,
        Self::Uint16,
        Self::Int16,
        Self::Uint32,
        Self::Int32,
        Self::Float32,
        Self::Bool,
        Self::String,
        Self::Array,
        Self::Uint64,
        Self::Int64,
        Self::Float64,
    ];

    /// Convert from the raw u32 discriminant in the file.
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Uint8),
            1 => Some(Self::Int8),
            2 => Some(Self::Uint16),
            3 => Some(Self::Int16),
            4 => Some(Self::Uint32),
            5 => Some(Self::Int32),
            6 => Some(Self::Float32),
            7 => Some(Self::Bool),
            8 => Some(Self::String),
            9 => Some(Self::Array),
            10 => Some(Self::Uint64),
            11 => Some(Self::Int64),
            12 => Some(Self::Float64),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Payload width for fixed-size tags; `None` for `String` and `Array`.
    pub const fn fixed_size(self) -> Option<u64> {
        match self {
            Self::Uint8 | Self::Int8 | Self::Bool => Some(1),
            Self::Uint16 | Self::Int16 => Some(2),
            Self::Uint32 | Self::Int32 | Self::Float32 => Some(4),
            Self::Uint64 | Self::Int64 | Self::Float64 => Some(8),
            Self::String | Self::Array => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Uint8 => "UINT8",
            Self::Int8 => "INT8",
            Self::Uint16 => "UINT16",
            Self::Int16 => "INT16",
            Self::Uint32 => "UINT32",
            Self::Int32 => "INT32",
            Self::Float32 => "FLOAT32",
            Self::Bool => "BOOL",
            Self::String => "STRING",
            Self::Array => "ARRAY",
            Self::Uint64 => "UINT64",
            Self::Int64 => "INT64",
            Self::Float64 => "FLOAT64",
        }
    }
}

impl fmt::Display for GgufValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// A length-prefixed GGUF string.
///
/// The bytes are kept verbatim: GGUF does not guarantee UTF-8 (token pieces
/// in particular are often raw bytes).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GgufString(Vec<u8>);

impl GgufString {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Declared length, as written in the `u64` prefix.
    #[inline]
    pub fn len(&self) -> u64 {
        self.0.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The contents as `&str`, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for GgufString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for GgufString {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Vec<u8>> for GgufString {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for GgufString {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for GgufString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

/// A homogeneous GGUF array.
///
/// Every element has `element_type`; an element type of `Array` nests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArrayParts")]
pub struct GgufArray {
    element_type: GgufValueType,
    values: Vec<GgufValue>,
}

#[derive(Deserialize)]
struct ArrayParts {
    element_type: GgufValueType,
    values: Vec<GgufValue>,
}

impl TryFrom<ArrayParts> for GgufArray {
    type Error = GgufError;

    fn try_from(parts: ArrayParts) -> Result<Self> {
        Self::new(parts.element_type, parts.values)
    }
}

impl GgufArray {
    /// Build an array, checking that every value has `element_type`.
    pub fn new(element_type: GgufValueType, values: Vec<GgufValue>) -> Result<Self> {
        if let Some(bad) = values.iter().find(|v| v.value_type() != element_type) {
            return Err(GgufError::ArrayTypeMismatch {
                expected: element_type,
                found: bad.value_type(),
            });
        }
        Ok(Self { element_type, values })
    }

    pub fn empty(element_type: GgufValueType) -> Self {
        Self { element_type, values: Vec::new() }
    }

    /// Used by the reader, which decodes every element under `element_type`.
    pub(crate) fn from_decoded(element_type: GgufValueType, values: Vec<GgufValue>) -> Self {
        debug_assert!(values.iter().all(|v| v.value_type() == element_type));
        Self { element_type, values }
    }

    #[inline]
    pub fn element_type(&self) -> GgufValueType {
        self.element_type
    }

    /// Element count, as written in the `u64` prefix.
    #[inline]
    pub fn len(&self) -> u64 {
        self.values.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[GgufValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<GgufValue> {
        self.values
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A decoded GGUF metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GgufValue {
    Uint8(u8),
    Int8(i8),
    Uint16(u16),
    Int16(i16),
    Uint32(u32),
    Int32(i32),
    Float32(f32),
    Bool(bool),
    String(GgufString),
    Array(GgufArray),
    Uint64(u64),
    Int64(i64),
    Float64(f64),
}

impl GgufValue {
    pub fn value_type(&self) -> GgufValueType {
        match self {
            Self::Uint8(_) => GgufValueType::Uint8,
            Self::Int8(_) => GgufValueType::Int8,
            Self::Uint16(_) => GgufValueType::Uint16,
            Self::Int16(_) => GgufValueType::Int16,
            Self::Uint32(_) => GgufValueType::Uint32,
            Self::Int32(_) => GgufValueType::Int32,
            Self::Float32(_) => GgufValueType::Float32,
            Self::Bool(_) => GgufValueType::Bool,
            Self::String(_) => GgufValueType::String,
            Self::Array(_) => GgufValueType::Array,
            Self::Uint64(_) => GgufValueType::Uint64,
            Self::Int64(_) => GgufValueType::Int64,
            Self::Float64(_) => GgufValueType::Float64,
        }
    }

    /// Number of payload bytes this value occupies on the wire (excluding the
    /// tag that selected it).
    pub fn encoded_len(&self) -> u64 {
        match self {
            Self::String(s) => 8 + s.len(),
            Self::Array(a) => 4 + 8 + a.values().iter().map(Self::encoded_len).sum::<u64>(),
            // Every other variant is fixed-size.
            other => other.value_type().fixed_size().unwrap_or(0),
        }
    }

    /// Unsigned integers, widened.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Uint8(v) => Some(u64::from(v)),
            Self::Uint16(v) => Some(u64::from(v)),
            Self::Uint32(v) => Some(u64::from(v)),
            Self::Uint64(v) => Some(v),
            _ => None,
        }
    }

    /// Signed integers, plus unsigned ones that fit in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int8(v) => Some(i64::from(v)),
            Self::Int16(v) => Some(i64::from(v)),
            Self::Int32(v) => Some(i64::from(v)),
            Self::Int64(v) => Some(v),
            _ => self.as_u64().and_then(|v| i64::try_from(v).ok()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float32(v) => Some(f64::from(v)),
            Self::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&GgufString> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_string().and_then(GgufString::as_str)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.as_string().map(GgufString::as_bytes)
    }

    pub fn as_array(&self) -> Option<&GgufArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl From<&str> for GgufValue {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<GgufArray> for GgufValue {
    fn from(a: GgufArray) -> Self {
        Self::Array(a)
    }
}

// ---------------------------------------------------------------------------
// Metadata KV
// ---------------------------------------------------------------------------

/// A single key-value metadata entry from a GGUF file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GgufMetadataKv {
    pub key: GgufString,
    pub value: GgufValue,
}

impl GgufMetadataKv {
    pub fn new(key: impl Into<GgufString>, value: GgufValue) -> Self {
        Self { key: key.into(), value }
    }

    /// The tag written between key and value.
    #[inline]
    pub fn value_type(&self) -> GgufValueType {
        self.value.value_type()
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Decoded GGUF prologue plus the full metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GgufHeader {
    /// Raw magic, read as a little-endian `u32` (`GGUF_MAGIC` for real files).
    pub magic: u32,
    pub version: u32,
    /// Declared tensor count. The tensor index itself is not decoded.
    pub tensor_count: u64,
    /// Declared metadata count; a decoded header holds exactly this many entries.
    pub metadata_kv_count: u64,
    pub metadata: Vec<GgufMetadataKv>,
}

impl GgufHeader {
    /// Build a header whose declared metadata count matches `metadata`.
    pub fn new(magic: u32, version: u32, tensor_count: u64, metadata: Vec<GgufMetadataKv>) -> Self {
        let metadata_kv_count = metadata.len() as u64;
        Self { magic, version, tensor_count, metadata_kv_count, metadata }
    }

    /// The magic as it appears in the file.
    #[inline]
    pub fn magic_bytes(&self) -> [u8; 4] {
        self.magic.to_le_bytes()
    }

    #[inline]
    pub fn has_gguf_magic(&self) -> bool {
        self.magic == GGUF_MAGIC
    }

    /// Fail with [`GgufError::BadMagic`] unless the magic spells `GGUF`.
    pub fn ensure_magic(&self) -> Result<()> {
        if self.has_gguf_magic() { Ok(()) } else { Err(GgufError::BadMagic(self.magic)) }
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&GgufValue> {
        self.metadata.iter().find(|kv| kv.key.as_bytes() == key.as_bytes()).map(|kv| &kv.value)
    }

    /// Every value stored under `key`, in file order. Keys are not unique.
    pub fn get_all<'a, 'k>(
        &'a self,
        key: &'k str,
    ) -> impl Iterator<Item = &'a GgufValue> + use<'a, 'k> {
        self.metadata.iter().filter(move |kv| kv.key.as_bytes() == key.as_bytes()).map(|kv| &kv.value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &GgufString> {
        self.metadata.iter().map(|kv| &kv.key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(GgufValue::as_str)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get_u64(key).and_then(|v| u32::try_from(v).ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(GgufValue::as_u64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(GgufValue::as_i64)
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            GgufValue::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(GgufValue::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(GgufValue::as_bool)
    }

    /// A string array whose elements are all valid UTF-8.
    pub fn get_string_array(&self, key: &str) -> Option<Vec<&str>> {
        let array = self.get(key)?.as_array()?;
        if array.element_type() != GgufValueType::String {
            return None;
        }
        array.values().iter().map(GgufValue::as_str).collect()
    }
}

impl Default for GgufHeader {
    /// An empty GGUF v3 header.
    fn default() -> Self {
        Self::new(GGUF_MAGIC, 3, 0, Vec::new())
    }
}
