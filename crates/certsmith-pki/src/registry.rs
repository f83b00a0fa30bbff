//! Identity-keyed issuance with reuse-or-force semantics.
//!
//! The registry is the single mutation path for the on-disk identity
//! store. Resolution of one identity is serialized through a keyed mutex:
//! two concurrent requests for the same `(role, name)` can never both
//! observe "absent" and race to generate, while distinct identities
//! proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::ca::{CaConfig, CaStore, CertificateAuthority};
use crate::error::{Error, Result};
use crate::issuer;
use crate::storage::{ArtifactPaths, StorageBackend, leaf_paths, sanitize_name};
use crate::types::{Certificate, IssueRequest, PrivateKey};

/// Identity name reserved for the CA itself.
///
/// A leaf named `ca` would collide with the `ca.pem` entry bundled into
/// every leaf archive.
pub const CA_RESERVED_NAME: &str = "ca";

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// CA creation parameters (used only on first run).
    pub ca: CaConfig,
    /// RSA key size for issued leaves.
    pub leaf_key_size: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ca: CaConfig::default(),
            leaf_key_size: 2048,
        }
    }
}

impl RegistryConfig {
    /// Applies one RSA key size to the CA and all leaves.
    #[must_use]
    pub const fn with_key_size(mut self, bits: u32) -> Self {
        self.ca.key_size = bits;
        self.leaf_key_size = bits;
        self
    }
}

/// Outcome of a resolve call.
#[derive(Debug)]
pub struct ResolvedIdentity {
    /// Leaf private key.
    pub key: PrivateKey,
    /// Signed leaf certificate.
    pub certificate: Certificate,
    /// True when existing artifacts were returned unchanged.
    pub reused: bool,
}

/// Maps canonical identities to persisted key/certificate artifacts.
pub struct IdentityRegistry {
    storage: Arc<dyn StorageBackend>,
    ca: CertificateAuthority,
    leaf_key_size: u32,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdentityRegistry {
    /// Opens the registry, bootstrapping the CA if the store is empty.
    ///
    /// # Errors
    ///
    /// Propagates CA store failures ([`Error::Storage`],
    /// [`Error::CorruptArtifact`], [`Error::Signing`]).
    pub fn open(storage: Arc<dyn StorageBackend>, config: RegistryConfig) -> Result<Self> {
        let ca = CaStore::new(Arc::clone(&storage), config.ca).get_or_create()?;
        Ok(Self {
            storage,
            ca,
            leaf_key_size: config.leaf_key_size,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the CA certificate leaves are signed by.
    #[must_use]
    pub const fn ca_certificate(&self) -> &Certificate {
        self.ca.certificate()
    }

    /// Resolves an identity: reuse existing artifacts, or issue and
    /// persist new ones.
    ///
    /// Without `force`, a hit returns the stored bytes unchanged even if
    /// the requested SAN list differs from what was issued originally;
    /// the identity-keyed model accepts stale SAN lists on reuse. With
    /// `force`, both artifacts are regenerated and atomically replaced.
    ///
    /// # Errors
    ///
    /// - [`Error::ReservedName`] for the CA's reserved name.
    /// - [`Error::CorruptArtifact`] if stored artifacts fail to parse or
    ///   only half of a pair exists.
    /// - [`Error::Storage`], [`Error::Signing`], [`Error::PolicyViolation`]
    ///   from the underlying stages.
    pub fn resolve(&self, request: &IssueRequest) -> Result<ResolvedIdentity> {
        if sanitize_name(&request.name) == CA_RESERVED_NAME {
            return Err(Error::ReservedName(request.name.clone()));
        }

        let paths = leaf_paths(request.role, &request.name);
        let identity_key = paths.cert.display().to_string();
        let lock = self.lock_for(&identity_key);
        let result = {
            let _guard = lock.lock();
            self.resolve_locked(request, &paths)
        };
        self.release(&identity_key, &lock);
        result
    }

    /// Resolution body; the caller holds the identity's lock.
    fn resolve_locked(
        &self,
        request: &IssueRequest,
        paths: &ArtifactPaths,
    ) -> Result<ResolvedIdentity> {
        let key_bytes = self.storage.load(&paths.key)?;
        let cert_bytes = self.storage.load(&paths.cert)?;

        match (key_bytes, cert_bytes) {
            (Some(key_bytes), Some(cert_bytes)) if !request.force => {
                let key_pem = String::from_utf8(key_bytes)
                    .map_err(|e| Error::corrupt(&paths.key, format!("not UTF-8: {e}")))?;
                let key = PrivateKey::new(key_pem);
                key.to_key_pair()
                    .map_err(|e| Error::corrupt(&paths.key, e.to_string()))?;
                let certificate = Certificate::from_pem(&cert_bytes)
                    .map_err(|e| Error::corrupt(&paths.cert, e.to_string()))?;

                info!(role = %request.role, name = %request.name, "reusing existing identity");
                Ok(ResolvedIdentity {
                    key,
                    certificate,
                    reused: true,
                })
            }
            (Some(_), None) | (None, Some(_)) if !request.force => Err(Error::corrupt(
                &paths.key,
                "only half of the key/certificate pair exists",
            )),
            _ => {
                let (key, certificate) = issuer::issue(
                    &self.ca,
                    request.role,
                    &request.name,
                    &request.sans,
                    self.leaf_key_size,
                )?;

                self.storage
                    .atomic_save(&paths.key, key.pem().as_bytes())?;
                if let Err(e) = self
                    .storage
                    .atomic_save(&paths.cert, certificate.pem().as_bytes())
                {
                    // Do not leave a keyed identity without its certificate.
                    let _ = self.storage.remove(&paths.key);
                    return Err(e);
                }

                info!(
                    role = %request.role,
                    name = %request.name,
                    serial = certificate.serial(),
                    forced = request.force,
                    "identity issued and persisted"
                );
                Ok(ResolvedIdentity {
                    key,
                    certificate,
                    reused: false,
                })
            }
        }
    }

    /// Returns the mutex guarding one identity key.
    fn lock_for(&self, identity_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(identity_key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drops the map entry for an identity once no other resolve holds it.
    ///
    /// Clones of an entry are only handed out under the map mutex, so a
    /// strong count of two (the map's reference plus ours) means no other
    /// resolve is waiting and the entry can go. The map stays bounded by
    /// the number of in-flight resolutions instead of growing with every
    /// identity ever seen.
    fn release(&self, identity_key: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        if Arc::strong_count(lock) == 2 {
            locks.remove(identity_key);
        }
    }
}

impl std::fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("ca", &self.ca)
            .field("leaf_key_size", &self.leaf_key_size)
            .finish_non_exhaustive()
    }
}
