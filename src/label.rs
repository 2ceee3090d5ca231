//! Side-channel label attached to a container in memory.
//!
//! The label is out-of-band metadata: it is neither signed nor written by
//! `Container::serialize`. Callers that need it after a round-trip must store
//! it alongside the container themselves; [`SideChannelLabel::store_beside`]
//! keeps it in a `<container>.id` sidecar file.

use core::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Appended to a container path to name its label sidecar.
pub const SIDECAR_SUFFIX: &str = ".id";

/// `<container>.id`
pub fn sidecar_path(container: &Path) -> PathBuf {
    let mut name = container.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SideChannelLabel {
    id: Vec<u8>,
}

impl SideChannelLabel {
    pub fn new(id: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.id
    }

    pub fn set(&mut self, id: impl Into<Vec<u8>>) {
        self.id = id.into();
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// Write the raw id next to `container`. Returns the sidecar path.
    pub fn store_beside(&self, container: &Path) -> Result<PathBuf> {
        let path = sidecar_path(container);
        fs::write(&path, &self.id)?;
        Ok(path)
    }

    /// Read the sidecar for `container`; `None` when there is none.
    pub fn load_beside(container: &Path) -> Result<Option<Self>> {
        match fs::read(sidecar_path(container)) {
            Ok(id) => Ok(Some(Self { id })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for SideChannelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SideChannelLabel({})", hex::encode(&self.id))
    }
}
