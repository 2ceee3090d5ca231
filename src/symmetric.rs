//! Symmetric key material, IVs and the payload cipher.
//!
//! Keys and IVs are both 16 bytes and drawn from the same source, but they
//! are distinct types so one cannot be passed where the other is expected.
//!
//! Payload cipher: AES-128-GCM keyed by [`SymmetricKey`], with the 16-byte
//! [`Iv`] used directly as the GCM nonce.

use core::fmt;

use aes_gcm::{
    aead::{consts::U16, Aead, KeyInit},
    aes::Aes128,
    AesGcm, Nonce,
};
use getrandom::getrandom;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{EncFileError, Result};

/// Symmetric key width in bytes (AES-128).
pub const SYMMETRIC_KEY_BYTES: usize = 16;

/// IV width in bytes.
pub const IV_BYTES: usize = 16;

/// GCM tag appended to every encrypted payload.
pub const PAYLOAD_TAG_BYTES: usize = 16;

type PayloadCipher = AesGcm<Aes128, U16>;

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// 128-bit symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; SYMMETRIC_KEY_BYTES],
}

impl SymmetricKey {
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_BYTES] {
        &self.bytes
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}

/// 128-bit initialization vector.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Iv {
    bytes: [u8; IV_BYTES],
}

impl Iv {
    pub fn as_bytes(&self) -> &[u8; IV_BYTES] {
        &self.bytes
    }
}

impl From<[u8; IV_BYTES]> for Iv {
    fn from(bytes: [u8; IV_BYTES]) -> Self {
        Self { bytes }
    }
}

impl fmt::Debug for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Iv({})", hex::encode(self.bytes))
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

fn random_block() -> Result<[u8; 16]> {
    let mut block = [0u8; 16];
    getrandom(&mut block).map_err(|e| EncFileError::RandomSource(e.to_string()))?;
    Ok(block)
}

/// Draw a fresh random symmetric key.
pub fn generate_key() -> Result<SymmetricKey> {
    Ok(SymmetricKey {
        bytes: random_block()?,
    })
}

/// Wrap caller-supplied key bytes. Only the length is checked.
pub fn key_from_bytes(bytes: &[u8]) -> Result<SymmetricKey> {
    let bytes: [u8; SYMMETRIC_KEY_BYTES] =
        bytes
            .try_into()
            .map_err(|_| EncFileError::InvalidKeyLength {
                expected: SYMMETRIC_KEY_BYTES,
                actual: bytes.len(),
            })?;
    Ok(SymmetricKey { bytes })
}

/// Draw a fresh random IV. Never reuse one under the same key.
pub fn generate_iv() -> Result<Iv> {
    Ok(Iv {
        bytes: random_block()?,
    })
}

/// Wrap caller-supplied IV bytes. Only the length is checked.
pub fn iv_from_bytes(bytes: &[u8]) -> Result<Iv> {
    let bytes: [u8; IV_BYTES] = bytes
        .try_into()
        .map_err(|_| EncFileError::InvalidIvLength {
            expected: IV_BYTES,
            actual: bytes.len(),
        })?;
    Ok(Iv { bytes })
}

// ---------------------------------------------------------------------------
// Payload cipher
// ---------------------------------------------------------------------------

/// Encrypt a payload. Output is `ciphertext || tag[16]`.
pub fn encrypt_payload(key: &SymmetricKey, iv: &Iv, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = PayloadCipher::new_from_slice(key.as_bytes())
        .map_err(|e| EncFileError::CryptoOperationFailed(e.to_string()))?;
    cipher
        .encrypt(Nonce::<U16>::from_slice(iv.as_bytes()), plaintext)
        .map_err(|_| EncFileError::CryptoOperationFailed("payload encryption".into()))
}

/// Decrypt a payload produced by [`encrypt_payload`].
pub fn decrypt_payload(key: &SymmetricKey, iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = PayloadCipher::new_from_slice(key.as_bytes())
        .map_err(|e| EncFileError::CryptoOperationFailed(e.to_string()))?;
    cipher
        .decrypt(Nonce::<U16>::from_slice(iv.as_bytes()), ciphertext)
        .map_err(|_| EncFileError::CryptoOperationFailed("payload decryption".into()))
}
