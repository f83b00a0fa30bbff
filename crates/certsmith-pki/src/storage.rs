//! Persistent artifact storage.
//!
//! The registry and CA store talk to storage through the [`StorageBackend`]
//! trait so the on-disk layout can be swapped out in tests. The disk
//! implementation replaces files atomically (write to a temp file in the
//! same directory, then rename) so a concurrent reader never observes a
//! half-written key or certificate.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Role;

/// File name of the persisted CA private key, relative to the storage root.
pub const CA_KEY_FILE: &str = "ca.key";
/// File name of the persisted CA certificate, relative to the storage root.
pub const CA_CERT_FILE: &str = "ca.pem";

/// Abstract artifact storage keyed by relative paths.
pub trait StorageBackend: Send + Sync {
    /// Loads an artifact, returning `None` if it does not exist.
    fn load(&self, rel: &Path) -> Result<Option<Vec<u8>>>;

    /// Atomically writes an artifact, replacing any previous content.
    fn atomic_save(&self, rel: &Path, bytes: &[u8]) -> Result<()>;

    /// Removes an artifact. Removing a missing artifact is not an error.
    fn remove(&self, rel: &Path) -> Result<()>;
}

/// Relative key and certificate locations for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Private key path.
    pub key: PathBuf,
    /// Certificate path.
    pub cert: PathBuf,
}

/// Returns the fixed CA artifact locations.
#[must_use]
pub fn ca_paths() -> ArtifactPaths {
    ArtifactPaths {
        key: PathBuf::from(CA_KEY_FILE),
        cert: PathBuf::from(CA_CERT_FILE),
    }
}

/// Returns the artifact locations for a leaf identity.
///
/// Role and canonical name fully determine the location, so repeated
/// resolution of the same identity always finds the same files.
#[must_use]
pub fn leaf_paths(role: Role, name: &str) -> ArtifactPaths {
    let safe = sanitize_name(name);
    ArtifactPaths {
        key: PathBuf::from(role.as_str()).join(format!("{safe}.key")),
        cert: PathBuf::from(role.as_str()).join(format!("{safe}.pem")),
    }
}

/// Maps an identity name to a filesystem-safe file stem.
///
/// ASCII alphanumerics, `-` and `.` pass through; everything else becomes
/// `_`.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Filesystem-backed storage rooted at a directory.
#[derive(Debug)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Opens (creating if needed) a storage root directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| Error::storage(&root, e))?;
        Ok(Self { root })
    }

    /// Returns the storage root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StorageBackend for DiskStorage {
    fn load(&self, rel: &Path) -> Result<Option<Vec<u8>>> {
        let path = self.root.join(rel);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(rel, e)),
        }
    }

    fn atomic_save(&self, rel: &Path, bytes: &[u8]) -> Result<()> {
        use std::io::Write;

        let path = self.root.join(rel);
        let parent = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent).map_err(|e| Error::storage(rel, e))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::storage(rel, e))?;
        tmp.write_all(bytes).map_err(|e| Error::storage(rel, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| Error::storage(rel, e))?;
        tmp.persist(&path)
            .map_err(|e| Error::storage(rel, e.error))?;

        debug!(path = %rel.display(), bytes = bytes.len(), "artifact persisted");
        Ok(())
    }

    fn remove(&self, rel: &Path) -> Result<()> {
        let path = self.root.join(rel);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(rel, e)),
        }
    }
}
