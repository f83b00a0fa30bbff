//! Root CA lifecycle.
//!
//! [`CaStore`] owns the CA's fixed storage locations and implements the
//! load-or-create contract: an existing CA is always reused as-is, a new
//! one is created and persisted exactly once per storage root.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::issuer::random_serial;
use crate::policy;
use crate::storage::{StorageBackend, ca_paths};
use crate::types::{Certificate, PrivateKey};

/// Configuration for CA creation.
#[derive(Debug, Clone)]
pub struct CaConfig {
    /// Common name of the CA certificate (subject = issuer).
    pub common_name: String,
    /// Organization name attribute.
    pub organization: String,
    /// RSA key size in bits.
    pub key_size: u32,
    /// Validity window in days.
    pub validity_days: i64,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            common_name: "Certsmith Root CA".into(),
            organization: "Certsmith".into(),
            key_size: 2048,
            validity_days: 3650,
        }
    }
}

impl CaConfig {
    /// Sets the RSA key size.
    #[must_use]
    pub const fn with_key_size(mut self, bits: u32) -> Self {
        self.key_size = bits;
        self
    }

    /// Sets the common name.
    #[must_use]
    pub fn with_common_name(mut self, name: impl Into<String>) -> Self {
        self.common_name = name.into();
        self
    }

    /// Sets the validity window in days.
    #[must_use]
    pub const fn with_validity_days(mut self, days: i64) -> Self {
        self.validity_days = days;
        self
    }
}

/// The root CA: certificate, private key and signing handle.
pub struct CertificateAuthority {
    cert: Certificate,
    key: PrivateKey,
    key_pair: KeyPair,
    /// Full subject DN, reused verbatim as the issuer DN of signed leaves.
    subject_dn: DistinguishedName,
}

impl CertificateAuthority {
    /// Creates a new self-signed CA from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if key generation or self-signing fails.
    pub fn create(config: &CaConfig) -> Result<Self> {
        info!(common_name = %config.common_name, key_size = config.key_size, "creating new CA");

        let (key, key_pair) = PrivateKey::generate_rsa(config.key_size)?;

        let mut subject_dn = DistinguishedName::new();
        subject_dn.push(DnType::CommonName, &config.common_name);
        subject_dn.push(DnType::OrganizationName, &config.organization);

        let mut params = CertificateParams::default();
        params.distinguished_name = subject_dn.clone();
        policy::ca_profile().apply(&mut params)?;
        params.serial_number = Some(random_serial());

        let now = Utc::now();
        params.not_before = to_rcgen_time(now - Duration::hours(1))?;
        params.not_after = to_rcgen_time(now + Duration::days(config.validity_days))?;

        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| Error::Signing(format!("failed to self-sign CA certificate: {e}")))?;
        let cert = Certificate::from_der(cert.der())?;

        debug!(serial = cert.serial(), "CA certificate created");

        Ok(Self {
            cert,
            key,
            key_pair,
            subject_dn,
        })
    }

    /// Reconstructs a CA from previously persisted artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the key or the certificate's subject
    /// does not parse.
    pub fn from_existing(cert: Certificate, key: PrivateKey) -> Result<Self> {
        let key_pair = key.to_key_pair()?;
        let subject_dn = subject_distinguished_name(&cert)?;
        Ok(Self {
            cert,
            key,
            key_pair,
            subject_dn,
        })
    }

    /// Returns the CA certificate.
    #[must_use]
    pub const fn certificate(&self) -> &Certificate {
        &self.cert
    }

    /// Returns the CA private key.
    #[must_use]
    pub const fn key(&self) -> &PrivateKey {
        &self.key
    }

    /// Returns the signing handle.
    pub(crate) const fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// Rebuilds an rcgen issuer certificate for signing leaves.
    ///
    /// The full subject DN is carried over so the issuer DN embedded in
    /// leaves is byte-identical to the CA certificate's subject (chain
    /// building compares the encoded names). Only the name and key
    /// identifier flow into signed leaves, so the ephemeral serial and
    /// validity here never appear anywhere.
    pub(crate) fn issuer_cert(&self) -> Result<rcgen::Certificate> {
        let mut params = CertificateParams::default();
        params.distinguished_name = self.subject_dn.clone();
        policy::ca_profile().apply(&mut params)?;

        params
            .self_signed(&self.key_pair)
            .map_err(|e| Error::Signing(format!("failed to rebuild issuer certificate: {e}")))
    }
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("cert", &self.cert)
            .field("key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Load-or-create access to the persisted CA.
///
/// One `CaStore` exists per storage root; concurrent first-run callers are
/// serialized internally so only one CA is ever created.
pub struct CaStore {
    storage: Arc<dyn StorageBackend>,
    config: CaConfig,
    init: Mutex<()>,
}

impl CaStore {
    /// Creates a store over the given backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, config: CaConfig) -> Self {
        Self {
            storage,
            config,
            init: Mutex::new(()),
        }
    }

    /// Loads the persisted CA, creating and persisting one if absent.
    ///
    /// An existing CA is returned unchanged, with no validation beyond
    /// parseability: validity or key-size mismatches with the current
    /// configuration are accepted as-is to preserve historical CAs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptArtifact`] if a persisted artifact fails to
    /// parse (never silently regenerated), or [`Error::Storage`] if the
    /// location is unreadable or unwritable.
    pub fn get_or_create(&self) -> Result<CertificateAuthority> {
        let _guard = self.init.lock();
        let paths = ca_paths();

        let key_bytes = self.storage.load(&paths.key)?;
        let cert_bytes = self.storage.load(&paths.cert)?;

        if let (Some(key_bytes), Some(cert_bytes)) = (key_bytes, cert_bytes) {
            let key_pem = String::from_utf8(key_bytes)
                .map_err(|e| Error::corrupt(&paths.key, format!("not UTF-8: {e}")))?;
            let key = PrivateKey::new(key_pem);
            key.to_key_pair()
                .map_err(|e| Error::corrupt(&paths.key, e.to_string()))?;
            let cert = Certificate::from_pem(&cert_bytes)
                .map_err(|e| Error::corrupt(&paths.cert, e.to_string()))?;

            info!(subject = cert.subject(), serial = cert.serial(), "loaded existing CA");
            return CertificateAuthority::from_existing(cert, key);
        }

        let ca = CertificateAuthority::create(&self.config)?;
        self.storage
            .atomic_save(&paths.key, ca.key().pem().as_bytes())?;
        self.storage
            .atomic_save(&paths.cert, ca.certificate().pem().as_bytes())?;
        info!(subject = ca.certificate().subject(), "CA persisted");
        Ok(ca)
    }
}

impl std::fmt::Debug for CaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Rebuilds the rcgen distinguished name from a certificate's subject.
///
/// Attribute order is preserved so a DN pushed through rcgen again
/// re-encodes to the same bytes. Values are re-encoded as UTF8String,
/// matching how every certificate this crate persists was built.
fn subject_distinguished_name(cert: &Certificate) -> Result<DistinguishedName> {
    use x509_parser::oid_registry::{
        OID_X509_COMMON_NAME, OID_X509_COUNTRY_NAME, OID_X509_LOCALITY_NAME,
        OID_X509_ORGANIZATIONAL_UNIT, OID_X509_ORGANIZATION_NAME,
        OID_X509_STATE_OR_PROVINCE_NAME,
    };
    use x509_parser::prelude::*;

    let (_, parsed) = X509Certificate::from_der(cert.der())
        .map_err(|e| Error::Parse(format!("failed to parse CA certificate: {e}")))?;

    let mut dn = DistinguishedName::new();
    for rdn in parsed.subject().iter() {
        for attr in rdn.iter() {
            let value = attr
                .as_str()
                .map_err(|e| Error::Parse(format!("failed to parse subject attribute: {e}")))?;
            let oid = attr.attr_type();
            let ty = if oid == &OID_X509_COMMON_NAME {
                DnType::CommonName
            } else if oid == &OID_X509_ORGANIZATION_NAME {
                DnType::OrganizationName
            } else if oid == &OID_X509_ORGANIZATIONAL_UNIT {
                DnType::OrganizationalUnitName
            } else if oid == &OID_X509_COUNTRY_NAME {
                DnType::CountryName
            } else if oid == &OID_X509_LOCALITY_NAME {
                DnType::LocalityName
            } else if oid == &OID_X509_STATE_OR_PROVINCE_NAME {
                DnType::StateOrProvinceName
            } else {
                let arcs = oid
                    .iter()
                    .ok_or_else(|| Error::Parse("subject attribute OID out of range".into()))?
                    .collect();
                DnType::CustomDnType(arcs)
            };
            dn.push(ty, value);
        }
    }
    Ok(dn)
}

/// Converts a chrono `DateTime` to an rcgen `OffsetDateTime`.
pub(crate) fn to_rcgen_time(dt: DateTime<Utc>) -> Result<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .map_err(|e| Error::Signing(format!("invalid timestamp: {e}")))
}
