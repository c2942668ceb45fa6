#![no_main]

use gguf_metadata::{GgufReader, decode, encode};
use libfuzzer_sys::fuzz_target;

// Anything that decodes must re-encode to the same length it consumed, and
// re-encoding is stable. Bytes may differ: non-zero bools normalise to 1.
fuzz_target!(|data: &[u8]| {
    let mut reader = GgufReader::new(data);
    let Ok(header) = reader.read_header() else { return };

    let bytes = match encode(&header) {
        Ok(b) => b,
        Err(e) => panic!("decoded header failed to re-encode: {e}"),
    };
    assert_eq!(bytes.len() as u64, reader.position(), "re-encoded length differs from consumed");

    let again = decode(&bytes).expect("re-encoded header must decode");
    assert_eq!(encode(&again).expect("second encode"), bytes, "encoding is not stable");
});
