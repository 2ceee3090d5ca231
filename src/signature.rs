//! IV signatures.
//!
//! The container stores and transports a signature over its IV; the scheme
//! that produces and checks it sits behind [`SignatureBinder`]. The header
//! width follows from `SIGNATURE_BYTES`, so swapping schemes never touches the
//! container code.

use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{EncFileError, Result};

pub trait SignatureBinder {
    type SigningKey;
    type VerifyingKey;

    /// Every signature produced by this scheme is exactly this long.
    const SIGNATURE_BYTES: usize;

    /// Human-readable scheme name (for inspection output).
    const NAME: &'static str;

    fn sign(message: &[u8], key: &Self::SigningKey) -> Result<Vec<u8>>;

    /// Malformed signatures verify as `false`; this never errors.
    fn verify(message: &[u8], signature: &[u8], key: &Self::VerifyingKey) -> bool;
}

/// RSASSA-PKCS1-v1_5 over SHA-256.
///
/// `MODULUS_BYTES` pins the key size and therefore the signature width:
/// 512 for the default 4096-bit keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RsaSha256Binder<const MODULUS_BYTES: usize = 512>;

/// Scheme used when none is named: RSA-4096 / SHA-256.
pub type DefaultBinder = RsaSha256Binder;

impl<const MODULUS_BYTES: usize> SignatureBinder for RsaSha256Binder<MODULUS_BYTES> {
    type SigningKey = RsaPrivateKey;
    type VerifyingKey = RsaPublicKey;

    const SIGNATURE_BYTES: usize = MODULUS_BYTES;
    const NAME: &'static str = "RSA-PKCS1v15-SHA256";

    fn sign(message: &[u8], key: &RsaPrivateKey) -> Result<Vec<u8>> {
        if key.size() != MODULUS_BYTES {
            return Err(EncFileError::InvalidSignatureLength {
                expected: MODULUS_BYTES,
                actual: key.size(),
            });
        }
        let digest = Sha256::digest(message);
        key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| EncFileError::CryptoOperationFailed(format!("sign: {}", e)))
    }

    fn verify(message: &[u8], signature: &[u8], key: &RsaPublicKey) -> bool {
        if signature.len() != MODULUS_BYTES || key.size() != MODULUS_BYTES {
            return false;
        }
        let digest = Sha256::digest(message);
        key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa_keys::{generate_keypair, KeyPair};
    use std::sync::OnceLock;

    type Binder = RsaSha256Binder<128>;

    fn pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_keypair(1024).unwrap())
    }

    #[test]
    fn sign_then_verify() {
        let kp = pair();
        let sig = Binder::sign(b"iv bytes", &kp.private).unwrap();
        assert_eq!(sig.len(), Binder::SIGNATURE_BYTES);
        assert!(Binder::verify(b"iv bytes", &sig, &kp.public));
    }

    #[test]
    fn altered_message_fails() {
        let kp = pair();
        let sig = Binder::sign(b"iv bytes", &kp.private).unwrap();
        assert!(!Binder::verify(b"iv bytez", &sig, &kp.public));
    }

    #[test]
    fn wrong_width_signature_is_false() {
        let kp = pair();
        let sig = Binder::sign(b"m", &kp.private).unwrap();
        assert!(!Binder::verify(b"m", &sig[1..], &kp.public));
        assert!(!Binder::verify(b"m", &[], &kp.public));
    }

    #[test]
    fn key_size_must_match_scheme() {
        let kp = pair();
        assert!(matches!(
            DefaultBinder::sign(b"m", &kp.private),
            Err(EncFileError::InvalidSignatureLength { expected: 512, actual: 128 })
        ));
    }

    #[test]
    fn default_scheme_width() {
        assert_eq!(DefaultBinder::SIGNATURE_BYTES, 512);
    }
}
