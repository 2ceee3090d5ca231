#![no_main]

use citadel_encfile::armor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(decoded) = armor::decode(text) {
        let again = armor::decode(&armor::encode(&decoded.bytes, decoded.kind)).unwrap();
        assert_eq!(again.kind, decoded.kind);
        assert_eq!(&again.bytes[..], &decoded.bytes[..]);
    }
});
