//! Property tests: encoding then decoding reproduces the header exactly, and
//! every value consumes precisely its encoded size.

use gguf_metadata::{
    GgufArray, GgufError, GgufHeader, GgufMetadataKv, GgufReader, GgufString, GgufValue,
    GgufValueType, GgufWriter, decode, encode,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

// NaN never compares equal, so floats are drawn from finite ranges.
fn finite_f32() -> impl Strategy<Value = f32> {
    prop_oneof![Just(0.0f32), Just(-0.0f32), -1.0e30f32..1.0e30f32]
}

fn finite_f64() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0f64), Just(f64::MIN_POSITIVE), -1.0e300f64..1.0e300f64]
}

fn gguf_string() -> impl Strategy<Value = GgufString> {
    prop::collection::vec(any::<u8>(), 0..24).prop_map(GgufString::new)
}

fn value_of(ty: GgufValueType, depth: u32) -> BoxedStrategy<GgufValue> {
    match ty {
        GgufValueType::Uint8 => any::<u8>().prop_map(GgufValue::Uint8).boxed(),
        GgufValueType::Int8 => any::<i8>().prop_map(GgufValue::Int8).boxed(),
        GgufValueType::Uint16 => any::<u16>().prop_map(GgufValue::Uint16).boxed(),
        GgufValueType::Int16 => any::<i16>().prop_map(GgufValue::Int16).boxed(),
        GgufValueType::Uint32 => any::<u32>().prop_map(GgufValue::Uint32).boxed(),
        GgufValueType::Int32 => any::<i32>().prop_map(GgufValue::Int32).boxed(),
        GgufValueType::Float32 => finite_f32().prop_map(GgufValue::Float32).boxed(),
        GgufValueType::Bool => any::<bool>().prop_map(GgufValue::Bool).boxed(),
        GgufValueType::String => gguf_string().prop_map(GgufValue::String).boxed(),
        GgufValueType::Array => array_value(depth).prop_map(GgufValue::Array).boxed(),
        GgufValueType::Uint64 => any::<u64>().prop_map(GgufValue::Uint64).boxed(),
        GgufValueType::Int64 => any::<i64>().prop_map(GgufValue::Int64).boxed(),
        GgufValueType::Float64 => finite_f64().prop_map(GgufValue::Float64).boxed(),
    }
}

fn value_type() -> impl Strategy<Value = GgufValueType> {
    prop::sample::select(GgufValueType::ALL.to_vec())
}

/// Arrays nest at most `depth` more levels; at the floor only scalar and
/// string element types are drawn.
fn array_value(depth: u32) -> BoxedStrategy<GgufArray> {
    let element_types = if depth == 0 {
        prop::sample::select(
            GgufValueType::ALL.iter().copied().filter(|t| *t != GgufValueType::Array).collect::<Vec<_>>(),
        )
        .boxed()
    } else {
        value_type().boxed()
    };
    element_types
        .prop_flat_map(move |ty| {
            let next = depth.saturating_sub(1);
            prop::collection::vec(value_of(ty, next), 0..6).prop_map(move |values| {
                GgufArray::new(ty, values).expect("strategy draws elements of one type")
            })
        })
        .boxed()
}

fn any_value() -> impl Strategy<Value = GgufValue> {
    value_type().prop_flat_map(|ty| value_of(ty, 2))
}

fn metadata_kv() -> impl Strategy<Value = GgufMetadataKv> {
    (gguf_string(), any_value()).prop_map(|(key, value)| GgufMetadataKv { key, value })
}

fn header() -> impl Strategy<Value = GgufHeader> {
    (any::<u32>(), any::<u32>(), any::<u64>(), prop::collection::vec(metadata_kv(), 0..12))
        .prop_map(|(magic, version, tensor_count, metadata)| {
            GgufHeader::new(magic, version, tensor_count, metadata)
        })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// decode(encode(h)) == h for headers covering every tag and nesting.
    #[test]
    fn prop_header_roundtrip(h in header()) {
        let bytes = encode(&h).unwrap();
        let back = decode(&bytes).unwrap();
        prop_assert_eq!(back, h);
    }

    /// A value consumes exactly its encoded length, and the reader stops there.
    #[test]
    fn prop_value_consumes_encoded_len(v in any_value(), trailing in prop::collection::vec(any::<u8>(), 0..16)) {
        let mut w = GgufWriter::new(Vec::new());
        w.write_value(&v).unwrap();
        prop_assert_eq!(w.position(), v.encoded_len());
        let mut bytes = w.into_inner();
        bytes.extend_from_slice(&trailing);

        let mut r = GgufReader::new(&bytes[..]);
        let back = r.read_value(v.value_type()).unwrap();
        prop_assert_eq!(r.position(), v.encoded_len());
        prop_assert_eq!(back, v);
    }

    /// Cutting an encoded header anywhere inside it yields TruncatedInput,
    /// never a partial header.
    #[test]
    fn prop_any_truncation_is_rejected(h in header(), cut in any::<prop::sample::Index>()) {
        let bytes = encode(&h).unwrap();
        let end = cut.index(bytes.len());
        match decode(&bytes[..end]) {
            Err(GgufError::TruncatedInput { .. }) => {}
            other => prop_assert!(false, "expected TruncatedInput, got {:?}", other),
        }
    }

    /// Any tag value >= 13 is rejected right after the tag.
    #[test]
    fn prop_unknown_tag_consumes_only_tag(raw in 13u32.., rest in prop::collection::vec(any::<u8>(), 0..32)) {
        let mut bytes = raw.to_le_bytes().to_vec();
        bytes.extend_from_slice(&rest);
        let mut r = GgufReader::new(&bytes[..]);
        match r.read_value_type() {
            Err(GgufError::UnknownTypeTag { raw: got, offset: 0 }) => prop_assert_eq!(got, raw),
            other => prop_assert!(false, "expected UnknownTypeTag, got {:?}", other),
        }
        prop_assert_eq!(r.position(), 4);
    }

    /// Arbitrary bytes after a valid prologue never panic the decoder.
    #[test]
    fn prop_arbitrary_table_never_panics(n_kv in 0u64..8, table in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut bytes = b"GGUF".to_vec();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&n_kv.to_le_bytes());
        bytes.extend_from_slice(&table);
        let _ = decode(&bytes);
    }
}
