//! Container wire format
//!
//! Format:
//!   iv[16] || iv_signature[SIG] || payload[..]
//!
//! SIG is fixed by the signature scheme (512 for RSA-4096). There is no
//! version byte, length prefix or delimiter: the header is always
//! `IV_BYTES + SIG` long and the payload runs to the end of the buffer.

use core::fmt;
use core::marker::PhantomData;

use crate::error::{EncFileError, Result};
use crate::signature::{DefaultBinder, SignatureBinder};
use crate::symmetric::{Iv, IV_BYTES};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

pub const IV_OFFSET: usize = 0;
pub const SIGNATURE_OFFSET: usize = IV_OFFSET + IV_BYTES;

/// Header width for a scheme whose signatures are `signature_bytes` long.
pub const fn header_bytes(signature_bytes: usize) -> usize {
    IV_BYTES + signature_bytes
}

/// Signature width of the default scheme (RSA-4096).
pub const SIGNATURE_BYTES: usize = <DefaultBinder as SignatureBinder>::SIGNATURE_BYTES; // 512

/// Header width of the default scheme.
pub const HEADER_BYTES: usize = header_bytes(SIGNATURE_BYTES); // 528

/// Borrowed view of a serialized container.
#[derive(Debug, Clone, Copy)]
pub struct WireComponents<'a> {
    pub iv: &'a [u8; IV_BYTES],
    pub signature: &'a [u8],
    pub payload: &'a [u8],
}

/// Split a buffer at the fixed header offsets for scheme `S`.
pub fn decode_wire<S: SignatureBinder>(data: &[u8]) -> Result<WireComponents<'_>> {
    let header_len = header_bytes(S::SIGNATURE_BYTES);
    if data.len() < header_len {
        return Err(EncFileError::TruncatedContainer {
            expected: header_len,
            actual: data.len(),
        });
    }

    let iv: &[u8; IV_BYTES] = data[IV_OFFSET..SIGNATURE_OFFSET]
        .try_into()
        .map_err(|_| EncFileError::InvalidIvLength {
            expected: IV_BYTES,
            actual: SIGNATURE_OFFSET - IV_OFFSET,
        })?;

    Ok(WireComponents {
        iv,
        signature: &data[SIGNATURE_OFFSET..header_len],
        payload: &data[header_len..],
    })
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Fixed-size header: the IV plus a signature over it.
///
/// A freshly built header has no signature; the slot is filled by
/// [`ContainerHeader::set_signature`] or by parsing.
pub struct ContainerHeader<S: SignatureBinder = DefaultBinder> {
    iv: Iv,
    signature: Option<Vec<u8>>,
    _scheme: PhantomData<S>,
}

impl<S: SignatureBinder> ContainerHeader<S> {
    pub const BYTES: usize = header_bytes(S::SIGNATURE_BYTES);

    pub fn new(iv: Iv) -> Self {
        Self {
            iv,
            signature: None,
            _scheme: PhantomData,
        }
    }

    pub fn iv(&self) -> &Iv {
        &self.iv
    }

    /// Replace the IV. Any signature over the old IV is discarded.
    pub fn set_iv(&mut self, iv: Iv) {
        self.iv = iv;
        self.signature = None;
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) -> Result<()> {
        if signature.len() != S::SIGNATURE_BYTES {
            return Err(EncFileError::InvalidSignatureLength {
                expected: S::SIGNATURE_BYTES,
                actual: signature.len(),
            });
        }
        self.signature = Some(signature);
        Ok(())
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Append `iv || signature` to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let signature = self
            .signature
            .as_deref()
            .ok_or(EncFileError::UnsignedContainer)?;
        out.extend_from_slice(self.iv.as_bytes());
        out.extend_from_slice(signature);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::BYTES);
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Parse the header from the front of `data`; returns the remaining bytes.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, &[u8])> {
        let parts = decode_wire::<S>(data)?;
        let header = Self {
            iv: Iv::from(*parts.iv),
            signature: Some(parts.signature.to_vec()),
            _scheme: PhantomData,
        };
        Ok((header, parts.payload))
    }
}

impl<S: SignatureBinder> Clone for ContainerHeader<S> {
    fn clone(&self) -> Self {
        Self {
            iv: self.iv,
            signature: self.signature.clone(),
            _scheme: PhantomData,
        }
    }
}

impl<S: SignatureBinder> PartialEq for ContainerHeader<S> {
    fn eq(&self, other: &Self) -> bool {
        self.iv == other.iv && self.signature == other.signature
    }
}

impl<S: SignatureBinder> Eq for ContainerHeader<S> {}

impl<S: SignatureBinder> fmt::Debug for ContainerHeader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHeader")
            .field("iv", &self.iv)
            .field("signed", &self.is_signed())
            .field("scheme", &S::NAME)
            .finish()
    }
}
