#![no_main]

use kspack_codec::{decode_value, from_slice, marshal, validate, DecodeOptions, Limits, Value};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let opts = DecodeOptions {
        limits: Limits::with_max_depth(64),
    };

    let _ = kspack_codec::from_slice_with_options::<Value>(data, &opts);
    let _ = from_slice::<Vec<String>>(data);

    if let Ok(value) = decode_value(data) {
        // Anything the decoder accepts must be structurally valid and re-encodable
        assert!(validate(data, &Limits::default()).is_ok());
        let encoded = marshal(&value).expect("re-encode decoded value");
        decode_value(&encoded).expect("decode re-encoded value");
    }
});
