//! Encrypted file container: header (IV + IV signature), side-channel label
//! and ciphertext payload.
//!
//! State per instance:
//!
//! ```text
//! Unsigned --attach_signature--> Signed --verify--> Verified | Rejected
//!                                  ^
//!                 deserialize -----+
//! ```
//!
//! Only the IV is covered by the signature. Payload bytes and the label are
//! not authenticated by `verify`.

use core::fmt;

use tracing::{debug, warn};

use crate::error::Result;
use crate::label::SideChannelLabel;
use crate::signature::{DefaultBinder, SignatureBinder};
use crate::symmetric::{self, Iv};
use crate::wire::{self, ContainerHeader};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerState {
    /// Built from IV + payload; no signature yet.
    Unsigned,
    /// Signature attached (locally or from the wire), not yet checked.
    Signed,
    /// Signature checked true against a public key.
    Verified,
    /// Signature checked false.
    Rejected,
}

pub struct Container<S: SignatureBinder = DefaultBinder> {
    header: ContainerHeader<S>,
    label: SideChannelLabel,
    payload: Vec<u8>,
    state: ContainerState,
}

impl<S: SignatureBinder> Container<S> {
    /// Header width for this scheme.
    pub const HEADER_BYTES: usize = ContainerHeader::<S>::BYTES;

    /// Build an unsigned container from raw IV bytes and a ciphertext payload.
    pub fn new(iv: &[u8], payload: Vec<u8>) -> Result<Self> {
        Ok(Self::with_iv(symmetric::iv_from_bytes(iv)?, payload))
    }

    pub fn with_iv(iv: Iv, payload: Vec<u8>) -> Self {
        Self {
            header: ContainerHeader::new(iv),
            label: SideChannelLabel::default(),
            payload,
            state: ContainerState::Unsigned,
        }
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn header(&self) -> &ContainerHeader<S> {
        &self.header
    }

    // -----------------------------------------------------------------------
    // Label (out-of-band)
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &[u8] {
        self.label.as_bytes()
    }

    pub fn set_id(&mut self, id: impl Into<Vec<u8>>) {
        self.label.set(id);
    }

    pub fn label(&self) -> &SideChannelLabel {
        &self.label
    }

    // -----------------------------------------------------------------------
    // IV + signature
    // -----------------------------------------------------------------------

    pub fn iv(&self) -> &Iv {
        self.header.iv()
    }

    /// Replace the IV. The old signature no longer applies, so the container
    /// returns to `Unsigned`.
    pub fn set_iv(&mut self, iv: Iv) {
        self.header.set_iv(iv);
        self.state = ContainerState::Unsigned;
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.header.signature()
    }

    /// Record a signature over the current IV, produced by `S::sign`.
    pub fn attach_signature(&mut self, signature: Vec<u8>) -> Result<()> {
        self.header.set_signature(signature)?;
        self.state = ContainerState::Signed;
        Ok(())
    }

    /// Sign the current IV with `key` and attach the result.
    pub fn sign(&mut self, key: &S::SigningKey) -> Result<()> {
        let signature = S::sign(self.iv().as_bytes(), key)?;
        self.attach_signature(signature)
    }

    /// Check the IV signature against `key` and record the outcome.
    ///
    /// An unsigned container is rejected. The payload is not checked.
    pub fn verify(&mut self, key: &S::VerifyingKey) -> bool {
        let ok = match self.header.signature() {
            Some(signature) => S::verify(self.header.iv().as_bytes(), signature, key),
            None => false,
        };
        self.state = if ok {
            ContainerState::Verified
        } else {
            warn!(iv = ?self.header.iv(), "IV signature rejected");
            ContainerState::Rejected
        };
        ok
    }

    pub fn is_verified(&self) -> bool {
        self.state == ContainerState::Verified
    }

    // -----------------------------------------------------------------------
    // Payload
    // -----------------------------------------------------------------------

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    // -----------------------------------------------------------------------
    // Wire form
    // -----------------------------------------------------------------------

    pub fn serialized_len(&self) -> usize {
        Self::HEADER_BYTES + self.payload.len()
    }

    /// `iv || signature || payload`. The label is not written.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.serialized_len());
        self.header.write_to(&mut out)?;
        out.extend_from_slice(&self.payload);
        debug!(bytes = out.len(), payload = self.payload.len(), "serialized container");
        Ok(out)
    }

    /// Split `data` at the fixed header offset. The result is `Signed`; call
    /// [`Container::verify`] before trusting the IV.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let (header, payload) = ContainerHeader::<S>::from_bytes(data)?;
        debug!(bytes = data.len(), payload = payload.len(), "parsed container");
        Ok(Self {
            header,
            label: SideChannelLabel::default(),
            payload: payload.to_vec(),
            state: ContainerState::Signed,
        })
    }
}

impl<S: SignatureBinder> Clone for Container<S> {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            label: self.label.clone(),
            payload: self.payload.clone(),
            state: self.state,
        }
    }
}

/// Compares contents (header, label, payload). Verification state is not part
/// of the value.
impl<S: SignatureBinder> PartialEq for Container<S> {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.label == other.label && self.payload == other.payload
    }
}

impl<S: SignatureBinder> Eq for Container<S> {}

impl<S: SignatureBinder> fmt::Debug for Container<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("header", &self.header)
            .field("label", &self.label)
            .field("payload_len", &self.payload.len())
            .field("state", &self.state)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Inspection utilities (for ops/debugging)
// ---------------------------------------------------------------------------

/// Container metadata (extracted without verifying or decrypting).
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub iv_hex: String,
    pub signature_scheme: &'static str,
    pub header_bytes: usize,
    pub payload_bytes: usize,
    pub total_bytes: usize,
}

impl fmt::Display for ContainerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EncFile | iv {} | {} | {} bytes ({} header + {} payload)",
            self.iv_hex, self.signature_scheme, self.total_bytes, self.header_bytes, self.payload_bytes
        )
    }
}

/// Inspect a serialized container without trusting it.
pub fn inspect<S: SignatureBinder>(data: &[u8]) -> Result<ContainerInfo> {
    let parts = wire::decode_wire::<S>(data)?;
    Ok(ContainerInfo {
        iv_hex: hex::encode(parts.iv),
        signature_scheme: S::NAME,
        header_bytes: ContainerHeader::<S>::BYTES,
        payload_bytes: parts.payload.len(),
        total_bytes: data.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncFileError;
    use crate::rsa_keys::{generate_keypair, KeyPair};
    use crate::signature::RsaSha256Binder;
    use proptest::prelude::*;
    use std::sync::OnceLock;

    type TestContainer = Container<RsaSha256Binder<128>>;

    fn pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_keypair(1024).unwrap())
    }

    fn other_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_keypair(1024).unwrap())
    }

    fn counting_iv() -> Vec<u8> {
        (0u8..16).collect()
    }

    fn signed(payload: &[u8]) -> TestContainer {
        let mut c = TestContainer::new(&counting_iv(), payload.to_vec()).unwrap();
        c.sign(&pair().private).unwrap();
        c
    }

    #[test]
    fn new_is_unsigned() {
        let c = TestContainer::new(&counting_iv(), b"x".to_vec()).unwrap();
        assert_eq!(c.state(), ContainerState::Unsigned);
        assert!(c.signature().is_none());
        assert!(matches!(c.serialize(), Err(EncFileError::UnsignedContainer)));
    }

    #[test]
    fn new_rejects_bad_iv() {
        assert!(matches!(
            TestContainer::new(&[0u8; 8], Vec::new()),
            Err(EncFileError::InvalidIvLength { expected: 16, actual: 8 })
        ));
    }

    #[test]
    fn sign_verify_transitions() {
        let mut c = signed(b"hello");
        assert_eq!(c.state(), ContainerState::Signed);
        assert!(c.verify(&pair().public));
        assert_eq!(c.state(), ContainerState::Verified);
        assert!(!c.verify(&other_pair().public));
        assert_eq!(c.state(), ContainerState::Rejected);
    }

    #[test]
    fn unsigned_verify_rejects() {
        let mut c = TestContainer::new(&counting_iv(), Vec::new()).unwrap();
        assert!(!c.verify(&pair().public));
        assert_eq!(c.state(), ContainerState::Rejected);
    }

    #[test]
    fn hello_scenario() {
        let original = signed(b"hello");
        let bytes = original.serialize().unwrap();
        assert_eq!(bytes.len(), TestContainer::HEADER_BYTES + 5);

        let mut parsed = TestContainer::deserialize(&bytes).unwrap();
        assert_eq!(parsed.state(), ContainerState::Signed);
        assert_eq!(parsed.iv().as_bytes().as_slice(), &counting_iv()[..]);
        assert_eq!(parsed.signature(), original.signature());
        assert_eq!(parsed.payload(), b"hello");
        assert!(parsed.verify(&pair().public));
    }

    #[test]
    fn payload_corruption_still_verifies() {
        let mut bytes = signed(b"hello").serialize().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let mut parsed = TestContainer::deserialize(&bytes).unwrap();
        assert_ne!(parsed.payload(), b"hello");
        assert!(parsed.verify(&pair().public));
    }

    #[test]
    fn any_iv_bit_flip_rejects() {
        let bytes = signed(b"p").serialize().unwrap();
        for bit in 0..(16 * 8) {
            let mut tampered = bytes.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            let mut parsed = TestContainer::deserialize(&tampered).unwrap();
            assert!(!parsed.verify(&pair().public), "bit {} flip verified", bit);
        }
    }

    #[test]
    fn signature_corruption_rejects() {
        let mut bytes = signed(b"p").serialize().unwrap();
        bytes[16 + 3] ^= 0x01;
        let mut parsed = TestContainer::deserialize(&bytes).unwrap();
        assert!(!parsed.verify(&pair().public));
        assert_eq!(parsed.state(), ContainerState::Rejected);
    }

    #[test]
    fn header_only_buffer_has_empty_payload() {
        let bytes = signed(b"").serialize().unwrap();
        assert_eq!(bytes.len(), TestContainer::HEADER_BYTES);
        let parsed = TestContainer::deserialize(&bytes).unwrap();
        assert!(parsed.payload().is_empty());
    }

    #[test]
    fn truncated_buffer() {
        let bytes = signed(b"abc").serialize().unwrap();
        let err = TestContainer::deserialize(&bytes[..TestContainer::HEADER_BYTES - 1]).unwrap_err();
        assert!(matches!(err, EncFileError::TruncatedContainer { .. }));
        assert!(TestContainer::deserialize(&[]).is_err());
    }

    #[test]
    fn label_is_not_on_the_wire() {
        let mut c = signed(b"payload");
        let plain = c.serialize().unwrap();
        c.set_id(b"record-42".to_vec());
        assert_eq!(c.id(), b"record-42");
        assert_eq!(c.serialize().unwrap(), plain);

        let parsed = TestContainer::deserialize(&plain).unwrap();
        assert!(parsed.id().is_empty());
    }

    #[test]
    fn set_iv_returns_to_unsigned() {
        let mut c = signed(b"p");
        c.set_iv(Iv::from([9u8; 16]));
        assert_eq!(c.state(), ContainerState::Unsigned);
        assert!(c.serialize().is_err());
    }

    #[test]
    fn set_payload_keeps_signature() {
        let mut c = signed(b"p");
        c.set_payload(b"replaced".to_vec());
        assert_eq!(c.state(), ContainerState::Signed);
        assert!(c.verify(&pair().public));
    }

    #[test]
    fn inspect_reports_layout() {
        let bytes = signed(b"12345").serialize().unwrap();
        let info = inspect::<RsaSha256Binder<128>>(&bytes).unwrap();
        assert_eq!(info.iv_hex, "000102030405060708090a0b0c0d0e0f");
        assert_eq!(info.header_bytes, 144);
        assert_eq!(info.payload_bytes, 5);
        assert_eq!(info.total_bytes, 149);
    }

    #[test]
    fn roundtrip_edge_payload_lengths() {
        for len in [0usize, 1, 4096] {
            let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let c = signed(&payload);
            let bytes = c.serialize().unwrap();
            assert_eq!(bytes.len(), TestContainer::HEADER_BYTES + len);

            let mut parsed = TestContainer::deserialize(&bytes).unwrap();
            assert_eq!(parsed, c, "payload length {}", len);
            assert!(parsed.verify(&pair().public));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn roundtrip(iv in any::<[u8; 16]>(), sig in proptest::collection::vec(any::<u8>(), 128), payload in proptest::collection::vec(any::<u8>(), 0..4097)) {
            let mut c = TestContainer::new(&iv, payload).unwrap();
            c.attach_signature(sig).unwrap();
            let parsed = TestContainer::deserialize(&c.serialize().unwrap()).unwrap();
            prop_assert_eq!(parsed, c);
        }
    }
}
