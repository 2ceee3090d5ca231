//! End-to-end seal/open over the container.
//!
//! ```text
//! seal:  key, iv <- random
//!        payload  = AES-128-GCM(key, iv, plaintext)
//!        container = iv || Sign(signer, iv) || payload
//!        wrapped  = RSAES-PKCS1-v1_5(recipient, key)
//!
//! open:  verify IV signature -> unwrap key -> decrypt payload
//! ```
//!
//! The wrapped key travels beside the container, never inside it.

use core::marker::PhantomData;

use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::container::Container;
use crate::error::{EncFileError, Result};
use crate::rsa_keys::{decrypt_block, encrypt_block};
use crate::signature::{DefaultBinder, SignatureBinder};
use crate::symmetric;

/// A sealed file: the container plus the recipient-wrapped payload key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedFile<S: SignatureBinder = DefaultBinder> {
    pub container: Container<S>,
    pub wrapped_key: Vec<u8>,
}

impl<S: SignatureBinder> SealedFile<S> {
    /// Rebuild from the serialized container and the wrapped key.
    pub fn from_parts(container_bytes: &[u8], wrapped_key: Vec<u8>) -> Result<Self> {
        Ok(Self {
            container: Container::deserialize(container_bytes)?,
            wrapped_key,
        })
    }

    pub fn container_bytes(&self) -> Result<Vec<u8>> {
        self.container.serialize()
    }
}

pub struct EncFileEngine<S: SignatureBinder = DefaultBinder> {
    _scheme: PhantomData<S>,
}

impl<S: SignatureBinder> Default for EncFileEngine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SignatureBinder> EncFileEngine<S> {
    pub fn new() -> Self {
        Self {
            _scheme: PhantomData,
        }
    }

    pub fn seal(
        &self,
        plaintext: &[u8],
        signing_key: &S::SigningKey,
        recipient: &RsaPublicKey,
    ) -> Result<SealedFile<S>> {
        let key = symmetric::generate_key()?;
        let iv = symmetric::generate_iv()?;

        let payload = symmetric::encrypt_payload(&key, &iv, plaintext)?;
        let mut container = Container::with_iv(iv, payload);
        container.sign(signing_key)?;

        let wrapped_key = encrypt_block(key.as_bytes(), recipient)?;

        info!(
            plaintext = plaintext.len(),
            container = container.serialized_len(),
            scheme = S::NAME,
            "sealed file"
        );
        Ok(SealedFile {
            container,
            wrapped_key,
        })
    }

    /// Verify, unwrap, decrypt. Nothing is unwrapped unless the IV
    /// signature checks out.
    pub fn open(
        &self,
        sealed: &mut SealedFile<S>,
        verifying_key: &S::VerifyingKey,
        recipient: &RsaPrivateKey,
    ) -> Result<Vec<u8>> {
        if !sealed.container.verify(verifying_key) {
            return Err(EncFileError::SignatureRejected);
        }

        let raw = Zeroizing::new(decrypt_block(&sealed.wrapped_key, recipient)?);
        let key = symmetric::key_from_bytes(&raw)?;

        let plaintext = symmetric::decrypt_payload(&key, sealed.container.iv(), sealed.container.payload())
            .map_err(|e| {
                warn!("payload failed authentication after IV verified");
                e
            })?;
        debug!(plaintext = plaintext.len(), "opened file");
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerState;
    use crate::rsa_keys::{generate_keypair, KeyPair};
    use crate::signature::RsaSha256Binder;
    use std::sync::OnceLock;

    type Engine = EncFileEngine<RsaSha256Binder<128>>;

    fn signer() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_keypair(1024).unwrap())
    }

    fn recipient() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_keypair(1024).unwrap())
    }

    #[test]
    fn seal_open() {
        let engine = Engine::new();
        let mut sealed = engine
            .seal(b"quarterly numbers", &signer().private, &recipient().public)
            .unwrap();
        assert_eq!(sealed.container.state(), ContainerState::Signed);
        assert_eq!(sealed.wrapped_key.len(), 128);

        let pt = engine
            .open(&mut sealed, &signer().public, &recipient().private)
            .unwrap();
        assert_eq!(pt, b"quarterly numbers");
        assert!(sealed.container.is_verified());
    }

    #[test]
    fn through_bytes() {
        let engine = Engine::new();
        let sealed = engine.seal(b"", &signer().private, &recipient().public).unwrap();
        let bytes = sealed.container_bytes().unwrap();

        let mut back = SealedFile::from_parts(&bytes, sealed.wrapped_key.clone()).unwrap();
        assert_eq!(back, sealed);
        let pt = engine.open(&mut back, &signer().public, &recipient().private).unwrap();
        assert!(pt.is_empty());
    }

    #[test]
    fn wrong_signer_is_rejected_before_unwrap() {
        let engine = Engine::new();
        let mut sealed = engine.seal(b"x", &signer().private, &recipient().public).unwrap();
        let err = engine
            .open(&mut sealed, &recipient().public, &recipient().private)
            .unwrap_err();
        assert!(matches!(err, EncFileError::SignatureRejected));
        assert_eq!(sealed.container.state(), ContainerState::Rejected);
    }

    #[test]
    fn tampered_payload_fails_decrypt() {
        let engine = Engine::new();
        let mut sealed = engine.seal(b"payload", &signer().private, &recipient().public).unwrap();
        let mut payload = sealed.container.payload().to_vec();
        payload[0] ^= 0x80;
        sealed.container.set_payload(payload);

        let err = engine
            .open(&mut sealed, &signer().public, &recipient().private)
            .unwrap_err();
        assert!(matches!(err, EncFileError::CryptoOperationFailed(_)));
        assert!(sealed.container.is_verified());
    }

    #[test]
    fn wrong_recipient_fails() {
        let engine = Engine::new();
        let mut sealed = engine.seal(b"payload", &signer().private, &recipient().public).unwrap();
        assert!(engine
            .open(&mut sealed, &signer().public, &signer().private)
            .is_err());
    }
}
