//! Download bundle construction.
//!
//! Bundles are built fully in memory and handed out as zip bytes. Leaf
//! bundles carry the key, the certificate, a password-protected PKCS#12
//! container and the CA certificate; the CA bundle carries only the CA
//! certificate. Nothing bundle-related is ever persisted, in particular
//! the PKCS#12 container is rebuilt on every request.

use std::io::{Cursor, Write};

use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::stack::Stack;
use openssl::x509::X509;
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};
use crate::storage::sanitize_name;
use crate::types::{Certificate, PrivateKey};

/// Bundle construction parameters.
#[derive(Debug, Clone)]
pub struct BundleConfig {
    /// Password protecting the PKCS#12 container.
    pub password: String,
    /// PBE / MAC iteration count for the PKCS#12 KDF.
    pub kdf_rounds: u32,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            password: "password".into(),
            kdf_rounds: 50_000,
        }
    }
}

/// File name for a leaf identity's bundle download.
#[must_use]
pub fn leaf_bundle_name(name: &str) -> String {
    format!("{}.zip", sanitize_name(name))
}

/// File name for the CA bundle download.
#[must_use]
pub fn ca_bundle_name() -> String {
    "ca-cert.zip".into()
}

/// Builds the zip bundle for one leaf identity.
///
/// Entries, in order: `<safe>.key`, `<safe>.pem`, `<safe>.pfx`, `ca.pem`,
/// where `<safe>` is the sanitized identity name.
///
/// # Errors
///
/// Returns [`Error::Bundle`] if PKCS#12 assembly or zip writing fails.
pub fn leaf_bundle(
    config: &BundleConfig,
    name: &str,
    key: &PrivateKey,
    cert: &Certificate,
    ca_cert: &Certificate,
) -> Result<Vec<u8>> {
    let safe = sanitize_name(name);
    let pfx = build_pkcs12(config, name, key, cert, ca_cert)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    zip_entry(&mut writer, options, &format!("{safe}.key"), key.pem().as_bytes())?;
    zip_entry(&mut writer, options, &format!("{safe}.pem"), cert.pem().as_bytes())?;
    zip_entry(&mut writer, options, &format!("{safe}.pfx"), &pfx)?;
    zip_entry(&mut writer, options, "ca.pem", ca_cert.pem().as_bytes())?;

    let cursor = writer
        .finish()
        .map_err(|e| Error::Bundle(format!("failed to finish zip: {e}")))?;
    let bytes = cursor.into_inner();

    debug!(name, bytes = bytes.len(), "leaf bundle assembled");
    Ok(bytes)
}

/// Builds the CA bundle: a zip holding only `ca.pem`.
///
/// # Errors
///
/// Returns [`Error::Bundle`] if zip writing fails.
pub fn ca_bundle(ca_cert: &Certificate) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    zip_entry(
        &mut writer,
        SimpleFileOptions::default(),
        "ca.pem",
        ca_cert.pem().as_bytes(),
    )?;
    let cursor = writer
        .finish()
        .map_err(|e| Error::Bundle(format!("failed to finish zip: {e}")))?;
    Ok(cursor.into_inner())
}

/// Assembles the password-protected PKCS#12 container for a leaf.
fn build_pkcs12(
    config: &BundleConfig,
    name: &str,
    key: &PrivateKey,
    cert: &Certificate,
    ca_cert: &Certificate,
) -> Result<Vec<u8>> {
    let pkey = PKey::private_key_from_pem(key.pem().as_bytes())
        .map_err(|e| Error::Bundle(format!("failed to load private key: {e}")))?;
    let leaf = X509::from_pem(cert.pem().as_bytes())
        .map_err(|e| Error::Bundle(format!("failed to load certificate: {e}")))?;
    let ca = X509::from_pem(ca_cert.pem().as_bytes())
        .map_err(|e| Error::Bundle(format!("failed to load CA certificate: {e}")))?;

    let mut chain = Stack::new().map_err(|e| Error::Bundle(e.to_string()))?;
    chain.push(ca).map_err(|e| Error::Bundle(e.to_string()))?;

    let mut builder = Pkcs12::builder();
    builder
        .name(name)
        .pkey(&pkey)
        .cert(&leaf)
        .ca(chain)
        .key_iter(config.kdf_rounds)
        .mac_iter(config.kdf_rounds);

    let pkcs12 = builder
        .build2(&config.password)
        .map_err(|e| Error::Bundle(format!("failed to build PKCS#12: {e}")))?;
    pkcs12
        .to_der()
        .map_err(|e| Error::Bundle(format!("failed to encode PKCS#12: {e}")))
}

fn zip_entry(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entry: &str,
    bytes: &[u8],
) -> Result<()> {
    writer
        .start_file(entry, options)
        .map_err(|e| Error::Bundle(format!("failed to start zip entry {entry}: {e}")))?;
    writer
        .write_all(bytes)
        .map_err(|e| Error::Bundle(format!("failed to write zip entry {entry}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ca::{CaConfig, CertificateAuthority};
    use crate::issuer;
    use crate::types::{Role, SubjectAltName};
    use std::io::Read;

    fn test_identity() -> (CertificateAuthority, PrivateKey, Certificate) {
        let ca = CertificateAuthority::create(&CaConfig::default().with_key_size(1024)).unwrap();
        let sans = vec![SubjectAltName::classify("example.com").unwrap()];
        let (key, cert) = issuer::issue(&ca, Role::Server, "example.com", &sans, 1024).unwrap();
        (ca, key, cert)
    }

    fn fast_config() -> BundleConfig {
        BundleConfig {
            kdf_rounds: 64,
            ..BundleConfig::default()
        }
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_owned())
            .collect()
    }

    fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn leaf_bundle_has_all_four_entries() {
        let (ca, key, cert) = test_identity();
        let bytes =
            leaf_bundle(&fast_config(), "example.com", &key, &cert, ca.certificate()).unwrap();

        let names = entry_names(&bytes);
        assert_eq!(
            names,
            vec!["example.com.key", "example.com.pem", "example.com.pfx", "ca.pem"]
        );
    }

    #[test]
    fn leaf_bundle_entries_match_inputs() {
        let (ca, key, cert) = test_identity();
        let bytes =
            leaf_bundle(&fast_config(), "example.com", &key, &cert, ca.certificate()).unwrap();

        assert_eq!(read_entry(&bytes, "example.com.key"), key.pem().as_bytes());
        assert_eq!(read_entry(&bytes, "example.com.pem"), cert.pem().as_bytes());
        assert_eq!(read_entry(&bytes, "ca.pem"), ca.certificate().pem().as_bytes());
    }

    #[test]
    fn bundle_entry_names_are_sanitized() {
        let (ca, key, cert) = test_identity();
        let bytes = leaf_bundle(&fast_config(), "John Doe", &key, &cert, ca.certificate()).unwrap();

        let names = entry_names(&bytes);
        assert!(names.contains(&"John_Doe.key".to_owned()));
        assert!(names.contains(&"John_Doe.pfx".to_owned()));
        assert_eq!(leaf_bundle_name("John Doe"), "John_Doe.zip");
    }

    #[test]
    fn pkcs12_opens_with_configured_password() {
        let (ca, key, cert) = test_identity();
        let config = fast_config();
        let bytes = leaf_bundle(&config, "example.com", &key, &cert, ca.certificate()).unwrap();

        let pfx = read_entry(&bytes, "example.com.pfx");
        let parsed = Pkcs12::from_der(&pfx)
            .unwrap()
            .parse2(&config.password)
            .unwrap();
        assert!(parsed.pkey.is_some());
        assert!(parsed.cert.is_some());
        assert_eq!(parsed.ca.map(|s| s.len()), Some(1));
    }

    #[test]
    fn pkcs12_rejects_wrong_password() {
        let (ca, key, cert) = test_identity();
        let bytes =
            leaf_bundle(&fast_config(), "example.com", &key, &cert, ca.certificate()).unwrap();

        let pfx = read_entry(&bytes, "example.com.pfx");
        assert!(Pkcs12::from_der(&pfx).unwrap().parse2("wrong").is_err());
    }

    #[test]
    fn ca_bundle_has_only_the_ca_cert() {
        let (ca, _, _) = test_identity();
        let bytes = ca_bundle(ca.certificate()).unwrap();

        assert_eq!(entry_names(&bytes), vec!["ca.pem"]);
        assert_eq!(read_entry(&bytes, "ca.pem"), ca.certificate().pem().as_bytes());
        assert_eq!(ca_bundle_name(), "ca-cert.zip");
    }
}
