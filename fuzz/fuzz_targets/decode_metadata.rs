#![no_main]

use arbitrary::Arbitrary;
use gguf_metadata::{DecoderConfig, GgufReader, GgufValueType, check_magic, decode, decode_with};
use libfuzzer_sys::fuzz_target;

/// Fuzz input representing one GGUF key-value entry inside a synthetic GGUF stream.
#[derive(Arbitrary, Debug)]
struct GgufKvInput {
    /// Arbitrary key bytes (may not be valid UTF-8; the decoder must keep them).
    key: Vec<u8>,
    /// Arbitrary value payload bytes.
    value_bytes: Vec<u8>,
    /// Raw value-type discriminant written into the stream.
    value_type: u8,
    /// Declared entry count; values above 1 force reads past the payload.
    n_kv: u8,
    /// Nesting bound for the second pass.
    max_depth: u8,
}

fuzz_target!(|input: GgufKvInput| {
    // Cap sizes to avoid OOM / timeout while still exercising boundary conditions.
    if input.key.len() > 512 || input.value_bytes.len() > 4096 {
        return;
    }

    let buf = build_gguf_with_kv(&input.key, &input.value_bytes, input.value_type, input.n_kv);

    // --- Pass 1: default decode must never panic ---
    let _ = check_magic(&buf);
    if let Ok(header) = decode(&buf) {
        assert_eq!(header.metadata.len() as u64, header.metadata_kv_count);
        for kv in &header.metadata {
            // Typed accessors on mismatched types return None, not panic.
            let key = kv.key.to_string_lossy();
            let _ = header.get_str(&key);
            let _ = header.get_u32(&key);
            let _ = header.get_f32(&key);
            let _ = header.get_bool(&key);
            let _ = header.get_string_array(&key);
        }
    }

    // --- Pass 2: tight nesting bound ---
    let cfg = DecoderConfig { max_nesting_depth: usize::from(input.max_depth.max(1)), ..DecoderConfig::default() };
    let _ = decode_with(&buf, &cfg);

    // --- Pass 3: value payload decoded directly under the raw tag ---
    if let Some(ty) = GgufValueType::from_u32(u32::from(input.value_type)) {
        let mut r = GgufReader::new(&input.value_bytes[..]);
        if let Ok(v) = r.read_value(ty) {
            assert_eq!(r.position(), v.encoded_len());
        }
    }
});

/// Builds a minimal GGUF byte stream containing one key-value entry constructed
/// from the fuzz inputs.
fn build_gguf_with_kv(key: &[u8], value_bytes: &[u8], value_type: u8, n_kv: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"GGUF");
    buf.extend_from_slice(&3u32.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&u64::from(n_kv).to_le_bytes());

    // Key: u64 length prefix, then raw bytes (possibly non-UTF-8)
    buf.extend_from_slice(&(key.len() as u64).to_le_bytes());
    buf.extend_from_slice(key);

    // Value type as u32 LE, then the payload
    buf.extend_from_slice(&u32::from(value_type).to_le_bytes());
    buf.extend_from_slice(value_bytes);
    buf
}
