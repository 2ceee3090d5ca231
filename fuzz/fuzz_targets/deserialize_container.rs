#![no_main]

use citadel_encfile::{generate_keypair, Container, KeyPair, RsaSha256Binder};
use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

type Binder = RsaSha256Binder<128>;

static KEYPAIR: Lazy<KeyPair> = Lazy::new(|| generate_keypair(1024).unwrap());

fuzz_target!(|data: &[u8]| {
    let Ok(mut container) = Container::<Binder>::deserialize(data) else {
        return;
    };

    // Parsed containers re-serialize to the same bytes.
    assert_eq!(container.serialize().unwrap(), data);

    let _ = container.verify(&KEYPAIR.public);
});
