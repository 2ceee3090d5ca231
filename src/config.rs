//! Key storage location.
//!
//! The keys directory is injected by the caller. `KeyPaths::from_env()`
//! reads it from the environment for binaries:
//!
//!   ENCFILE_KEYS_DIR  - directory holding public.key / private.key (default: ./keys)

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const KEYS_DIR_ENV: &str = "ENCFILE_KEYS_DIR";
pub const DEFAULT_KEYS_DIR: &str = "./keys";

pub const PUBLIC_KEY_FILE: &str = "public.key";
pub const PRIVATE_KEY_FILE: &str = "private.key";

/// Locations of the two key files under one directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPaths {
    dir: PathBuf,
}

impl KeyPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Self {
        let dir = std::env::var_os(KEYS_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYS_DIR));
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn public_key(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    pub fn private_key(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    pub(crate) fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

impl Default for KeyPaths {
    fn default() -> Self {
        Self::new(DEFAULT_KEYS_DIR)
    }
}
