use std::hint::black_box;
use std::time::Instant;

use citadel_encfile::{generate_keypair, Container, EncFileEngine, RsaSha256Binder};

type Binder = RsaSha256Binder<256>;

/// Run `op` `iters` times after a short warmup; report per-op cost and rate.
fn time_op<F: FnMut()>(op: &str, iters: u32, mut op_fn: F) {
    for _ in 0..(iters / 20).max(5) {
        op_fn();
    }

    let start = Instant::now();
    for _ in 0..iters {
        op_fn();
    }
    let elapsed = start.elapsed();

    let per_op = elapsed / iters;
    let rate = f64::from(iters) / elapsed.as_secs_f64();
    println!("{:<18} {:>6} ops  {:>12?}/op  {:>10.0} ops/s", op, iters, per_op, rate);
}

fn main() {
    // RSA-2048 keeps setup short; per-operation cost scales with modulus size.
    let pair = generate_keypair(2048).expect("keygen");
    let other = generate_keypair(2048).expect("keygen");
    let engine = EncFileEngine::<Binder>::new();

    let plaintext = vec![0x42u8; 1024];
    let sealed = engine
        .seal(&plaintext, &pair.private, &pair.public)
        .expect("seal");
    let bytes = sealed.container_bytes().expect("serialize");

    let mut tampered = bytes.clone();
    tampered[0] ^= 0x01;

    let iters: u32 = 2_000;

    time_op("serialize", iters, || {
        black_box(sealed.container.serialize().ok());
    });

    time_op("deserialize", iters, || {
        black_box(Container::<Binder>::deserialize(black_box(&bytes)).ok());
    });

    time_op("verify_ok", iters, || {
        let mut c = Container::<Binder>::deserialize(&bytes).expect("parse");
        black_box(c.verify(&pair.public));
    });

    time_op("verify_wrong_key", iters, || {
        let mut c = Container::<Binder>::deserialize(&bytes).expect("parse");
        black_box(c.verify(&other.public));
    });

    time_op("verify_tampered", iters, || {
        let mut c = Container::<Binder>::deserialize(&tampered).expect("parse");
        black_box(c.verify(&pair.public));
    });

    time_op("open", iters / 10, || {
        let mut s = sealed.clone();
        black_box(engine.open(&mut s, &pair.public, &pair.private).ok());
    });

    println!("\nDone.");
}
