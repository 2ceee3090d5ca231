//! # Citadel EncFile
//!
//! Signed-IV file containers with RSA key tooling.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use citadel_encfile::{generate_keypair, EncFileEngine, SealedFile, RSA_KEY_BITS};
//!
//! let signer = generate_keypair(RSA_KEY_BITS).unwrap();
//! let recipient = generate_keypair(RSA_KEY_BITS).unwrap();
//!
//! let engine: EncFileEngine = EncFileEngine::new();
//! let sealed = engine.seal(b"secret", &signer.private, &recipient.public).unwrap();
//!
//! // Ship these two byte strings separately.
//! let container = sealed.container_bytes().unwrap();
//! let wrapped_key = sealed.wrapped_key.clone();
//!
//! let mut received: SealedFile = SealedFile::from_parts(&container, wrapped_key).unwrap();
//! let plaintext = engine.open(&mut received, &signer.public, &recipient.private).unwrap();
//! assert_eq!(plaintext, b"secret");
//! ```
//!
//! ## Container
//!
//! `iv[16] || signature[512] || payload`. Fixed offsets, no version byte.
//! The signature covers the IV only.
//!
//! ## What's NOT Provided
//!
//! - Payload integrity from the container alone (the engine's GCM tag covers it)
//! - Certificates, key rotation, revocation
//! - Password-protected private keys
//! - Streaming encryption

#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/citadel-encfile/0.1.0")]

pub mod armor;
pub mod config;
pub mod container;
pub mod engine;
mod error;
pub mod label;
pub mod rsa_keys;
pub mod signature;
pub mod symmetric;
pub mod wire;

pub use armor::{ArmorKind, Armored, LINE_LENGTH};
pub use config::KeyPaths;
pub use container::{inspect, Container, ContainerInfo, ContainerState};
pub use engine::{EncFileEngine, SealedFile};
pub use error::{EncFileError, Result};
pub use label::SideChannelLabel;
pub use rsa_keys::{
    check_pairing, generate_keypair, load, load_pair, load_private, load_public, persist,
    KeyPair, LoadedKey, RSA_KEY_BITS,
};
pub use signature::{DefaultBinder, RsaSha256Binder, SignatureBinder};
pub use symmetric::{Iv, SymmetricKey, IV_BYTES, SYMMETRIC_KEY_BYTES};
pub use wire::{HEADER_BYTES, SIGNATURE_BYTES};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-exported so callers can name key types without a direct `rsa` dependency.
pub use rsa::{RsaPrivateKey, RsaPublicKey};
