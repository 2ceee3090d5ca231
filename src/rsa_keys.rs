//! RSA key pairs: generation, armored persistence, reconstruction from raw
//! components, and single-block encryption.
//!
//! On disk:
//!   public.key   SubjectPublicKeyInfo DER under the PUBLIC KEY armor
//!   private.key  PKCS#8 DER under the RSA PRIVATE KEY armor
//!
//! The two files carry no linkage. [`load_pair`] checks that they belong
//! together; [`load`] does not.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use tracing::{debug, warn};

use crate::armor::{self, ArmorKind};
use crate::config::KeyPaths;
use crate::error::{EncFileError, Result};

/// Modulus size used by [`generate_keypair`] callers by convention.
pub const RSA_KEY_BITS: usize = 4096;

/// Public exponent assumed when only (N, D) are known.
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// PKCS#1 v1.5 encryption padding overhead.
pub const PKCS1_PADDING_BYTES: usize = 11;

// ---------------------------------------------------------------------------
// Key types
// ---------------------------------------------------------------------------

/// A generated or loaded RSA key pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public: RsaPublicKey,
    pub private: RsaPrivateKey,
}

impl KeyPair {
    /// Modulus size in bytes (also the signature and block size).
    pub fn modulus_bytes(&self) -> usize {
        self.public.size()
    }
}

/// One half of a pair, as found in a key file.
#[derive(Clone, Debug)]
pub enum LoadedKey {
    Public(RsaPublicKey),
    Private(RsaPrivateKey),
}

impl LoadedKey {
    pub fn kind(&self) -> ArmorKind {
        match self {
            Self::Public(_) => ArmorKind::Public,
            Self::Private(_) => ArmorKind::Private,
        }
    }

    pub fn into_public(self) -> Result<RsaPublicKey> {
        match self {
            Self::Public(key) => Ok(key),
            Self::Private(_) => Err(EncFileError::KeyKindMismatch {
                expected: ArmorKind::Public,
                found: ArmorKind::Private,
            }),
        }
    }

    pub fn into_private(self) -> Result<RsaPrivateKey> {
        match self {
            Self::Private(key) => Ok(key),
            Self::Public(_) => Err(EncFileError::KeyKindMismatch {
                expected: ArmorKind::Private,
                found: ArmorKind::Public,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate a fresh key pair with a `bits`-bit modulus.
///
/// Blocks for a noticeable time at 4096 bits and cannot be cancelled.
pub fn generate_keypair(bits: usize) -> Result<KeyPair> {
    debug!(bits, "generating RSA key pair");
    let private = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| EncFileError::KeyGenerationUnavailable(e.to_string()))?;
    let public = RsaPublicKey::from(&private);
    Ok(KeyPair { public, private })
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Armor one key half.
pub fn armor_public(key: &RsaPublicKey) -> Result<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| EncFileError::CryptoOperationFailed(e.to_string()))?;
    Ok(armor::encode(der.as_bytes(), ArmorKind::Public))
}

/// Armor one key half.
pub fn armor_private(key: &RsaPrivateKey) -> Result<zeroize::Zeroizing<String>> {
    let der = key
        .to_pkcs8_der()
        .map_err(|e| EncFileError::CryptoOperationFailed(e.to_string()))?;
    Ok(zeroize::Zeroizing::new(armor::encode(
        der.as_bytes(),
        ArmorKind::Private,
    )))
}

/// Write both halves to `paths`.
///
/// Each file is written to a sibling temp file, flushed and synced, then
/// renamed into place. The temp file is removed if any step fails.
pub fn persist(pair: &KeyPair, paths: &KeyPaths) -> Result<()> {
    paths.ensure_dir()?;

    let public = armor_public(&pair.public)?;
    let private = armor_private(&pair.private)?;

    write_atomic(&paths.public_key(), public.as_bytes(), false)?;
    write_atomic(&paths.private_key(), private.as_bytes(), true)?;

    debug!(dir = %paths.dir().display(), "persisted RSA key pair");
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8], secret: bool) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let result = write_synced(&tmp, contents, secret).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn write_synced(path: &Path, contents: &[u8], secret: bool) -> io::Result<()> {
    // A leftover temp file keeps its old mode when reopened; start fresh.
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    let file = open_for_write(path, secret)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(contents)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn open_for_write(path: &Path, secret: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    // Restrict private key permissions (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if secret {
            options.mode(0o600);
        }
    }
    #[cfg(not(unix))]
    let _ = secret;

    options.open(path)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a key file; the armor header decides which half it is.
pub fn load(path: &Path) -> Result<LoadedKey> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EncFileError::KeyFileNotFound(path.to_path_buf()),
        _ => EncFileError::Io(e),
    })?;
    let text = zeroize::Zeroizing::new(text);

    let decoded = armor::decode(&text)?;
    let key = match decoded.kind {
        ArmorKind::Public => LoadedKey::Public(
            RsaPublicKey::from_public_key_der(&decoded.bytes)
                .map_err(|e| EncFileError::KeyReconstructionFailed(e.to_string()))?,
        ),
        ArmorKind::Private => LoadedKey::Private(
            RsaPrivateKey::from_pkcs8_der(&decoded.bytes)
                .map_err(|e| EncFileError::KeyReconstructionFailed(e.to_string()))?,
        ),
    };

    debug!(path = %path.display(), kind = %key.kind(), "loaded key file");
    Ok(key)
}

pub fn load_public(path: &Path) -> Result<RsaPublicKey> {
    load(path)?.into_public()
}

pub fn load_private(path: &Path) -> Result<RsaPrivateKey> {
    load(path)?.into_private()
}

/// Load `public.key` + `private.key` and check they form a pair.
pub fn load_pair(paths: &KeyPaths) -> Result<KeyPair> {
    let public = load_public(&paths.public_key())?;
    let private = load_private(&paths.private_key())?;
    if !check_pairing(&public, &private) {
        warn!(dir = %paths.dir().display(), "key files do not form a pair");
        return Err(EncFileError::KeyPairMismatch);
    }
    Ok(KeyPair { public, private })
}

/// True when `public` is the public half of `private`.
pub fn check_pairing(public: &RsaPublicKey, private: &RsaPrivateKey) -> bool {
    RsaPublicKey::from(private) == *public
}

// ---------------------------------------------------------------------------
// Raw components
// ---------------------------------------------------------------------------

/// Build a public key from modulus and public exponent.
pub fn public_key_from_components(n: BigUint, e: BigUint) -> Result<RsaPublicKey> {
    RsaPublicKey::new(n, e).map_err(|e| EncFileError::KeyReconstructionFailed(e.to_string()))
}

/// Build a private key from modulus and private exponent, assuming
/// `e = 65537`. The prime factors are recovered from (N, E, D).
pub fn private_key_from_components(n: BigUint, d: BigUint) -> Result<RsaPrivateKey> {
    private_key_from_components_with_exponent(n, BigUint::from(RSA_PUBLIC_EXPONENT), d)
}

pub fn private_key_from_components_with_exponent(
    n: BigUint,
    e: BigUint,
    d: BigUint,
) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_components(n, e, d, Vec::new())
        .map_err(|e| EncFileError::KeyReconstructionFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Block encryption
// ---------------------------------------------------------------------------

/// Largest plaintext a single block can carry under `key`.
pub fn max_block_plaintext(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(PKCS1_PADDING_BYTES)
}

/// RSAES-PKCS1-v1_5 encrypt one block.
pub fn encrypt_block(plaintext: &[u8], key: &RsaPublicKey) -> Result<Vec<u8>> {
    key.encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
        .map_err(|e| EncFileError::CryptoOperationFailed(format!("encrypt: {}", e)))
}

/// RSAES-PKCS1-v1_5 decrypt one block.
pub fn decrypt_block(ciphertext: &[u8], key: &RsaPrivateKey) -> Result<Vec<u8>> {
    key.decrypt(Pkcs1v15Encrypt, ciphertext)
        .map_err(|e| EncFileError::CryptoOperationFailed(format!("decrypt: {}", e)))
}
