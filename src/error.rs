//! Unified error type for Citadel EncFile.
//!
//! Parsing and format errors are returned to the caller at the boundary that
//! detected them. A failed signature check is not an error: it is a
//! [`ContainerState::Rejected`](crate::ContainerState::Rejected) outcome.

use std::path::PathBuf;

use thiserror::Error;

use crate::armor::ArmorKind;

#[derive(Error, Debug)]
pub enum EncFileError {
    /// Symmetric key bytes are not exactly the expected width.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// IV bytes are not exactly the expected width.
    #[error("invalid IV length: expected {expected}, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    /// Signature does not fit the fixed header slot.
    #[error("invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    /// First line of a key file is neither armor header.
    #[error("unrecognized key header: {0:?}")]
    UnrecognizedKeyHeader(String),

    /// Footer line does not match the kind announced by the header.
    #[error("key file has wrong footer: expected {expected:?}, found {found:?}")]
    FooterMismatch { expected: &'static str, found: String },

    /// Text ended before the body terminated and the footer appeared.
    #[error("key file missing footer")]
    TruncatedKeyFile,

    /// Armor body is not valid base64.
    #[error("invalid base64 in key body: {0}")]
    InvalidBase64(String),

    /// Buffer is shorter than the fixed container header.
    #[error("truncated container: need at least {expected} bytes, got {actual}")]
    TruncatedContainer { expected: usize, actual: usize },

    /// Serialization was requested before a signature was attached.
    #[error("container has no IV signature")]
    UnsignedContainer,

    /// IV signature did not verify against the supplied public key.
    #[error("IV signature rejected")]
    SignatureRejected,

    #[error("key file not found: {}", .0.display())]
    KeyFileNotFound(PathBuf),

    /// A key file holds the other half of the pair.
    #[error("expected {expected} key, found {found} key")]
    KeyKindMismatch { expected: ArmorKind, found: ArmorKind },

    /// `public.key` and `private.key` do not belong to the same pair.
    #[error("public and private key files do not form a pair")]
    KeyPairMismatch,

    #[error("key reconstruction failed: {0}")]
    KeyReconstructionFailed(String),

    /// The provider cannot generate keys of the requested shape.
    #[error("key generation unavailable: {0}")]
    KeyGenerationUnavailable(String),

    #[error("crypto operation failed: {0}")]
    CryptoOperationFailed(String),

    #[error("random source failure: {0}")]
    RandomSource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EncFileError {
    /// True for conditions the embedding process usually cannot recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::KeyGenerationUnavailable(_) | Self::RandomSource(_)
        )
    }
}

/// Result type for EncFile operations.
pub type Result<T> = std::result::Result<T, EncFileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_lengths() {
        let err = EncFileError::InvalidIvLength {
            expected: 16,
            actual: 3,
        };
        assert_eq!(err.to_string(), "invalid IV length: expected 16, got 3");
    }

    #[test]
    fn only_provider_failures_are_fatal() {
        assert!(EncFileError::KeyGenerationUnavailable("rsa".into()).is_fatal());
        assert!(EncFileError::RandomSource("os".into()).is_fatal());
        assert!(!EncFileError::TruncatedKeyFile.is_fatal());
        assert!(!EncFileError::SignatureRejected.is_fatal());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: EncFileError = io.into();
        assert!(matches!(err, EncFileError::Io(_)));
    }
}
