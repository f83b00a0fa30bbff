//! Role-based extension policy.
//!
//! Extension sets are plain data derived from the certificate role, applied
//! onto [`rcgen::CertificateParams`] in one place. Encoding correctness here
//! is what makes the issued certificates usable by real TLS stacks: a
//! missing AKI or a wrong EKU shows up as a downstream validation failure,
//! not as an error in this process.

use rcgen::{
    BasicConstraints, CertificateParams, ExtendedKeyUsagePurpose, Ia5String, IsCa,
    KeyUsagePurpose, SanType,
};

use crate::error::{Error, Result};
use crate::types::{Role, SubjectAltName};

/// The X.509 extension set for one certificate, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionProfile {
    /// BasicConstraints CA flag (always without a path length limit).
    pub is_ca: bool,
    /// KeyUsage bits.
    pub key_usages: Vec<KeyUsagePurpose>,
    /// ExtendedKeyUsage purposes.
    pub extended_key_usages: Vec<ExtendedKeyUsagePurpose>,
    /// Subject alternative names, in request order.
    pub subject_alt_names: Vec<SubjectAltName>,
}

/// Returns the extension profile for the root CA certificate.
#[must_use]
pub fn ca_profile() -> ExtensionProfile {
    ExtensionProfile {
        is_ca: true,
        key_usages: vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign],
        extended_key_usages: Vec::new(),
        subject_alt_names: Vec::new(),
    }
}

/// Returns the extension profile for a leaf certificate of the given role.
///
/// Server certificates carry the full ordered SAN list and the `serverAuth`
/// EKU; client certificates carry `clientAuth` and may have an empty SAN
/// set.
///
/// # Errors
///
/// Returns [`Error::PolicyViolation`] for a server profile with an empty
/// SAN list: such a certificate would be unusable for host verification.
pub fn leaf_profile(role: Role, sans: &[SubjectAltName]) -> Result<ExtensionProfile> {
    let extended_key_usage = match role {
        Role::Server => {
            if sans.is_empty() {
                return Err(Error::PolicyViolation(
                    "server certificate requires at least one SAN entry".into(),
                ));
            }
            ExtendedKeyUsagePurpose::ServerAuth
        }
        Role::Client => ExtendedKeyUsagePurpose::ClientAuth,
    };

    Ok(ExtensionProfile {
        is_ca: false,
        key_usages: vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ],
        extended_key_usages: vec![extended_key_usage],
        subject_alt_names: sans.to_vec(),
    })
}

impl ExtensionProfile {
    /// Applies this profile to certificate parameters.
    ///
    /// Leaf profiles additionally request the AuthorityKeyIdentifier
    /// extension, populated from the issuing CA's key identifier at signing
    /// time. rcgen always emits the SubjectKeyIdentifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PolicyViolation`] if a DNS SAN entry is not a valid
    /// IA5 string.
    pub fn apply(&self, params: &mut CertificateParams) -> Result<()> {
        params.is_ca = if self.is_ca {
            IsCa::Ca(BasicConstraints::Unconstrained)
        } else {
            IsCa::ExplicitNoCa
        };
        params.key_usages = self.key_usages.clone();
        params.extended_key_usages = self.extended_key_usages.clone();
        params.subject_alt_names = convert_sans(&self.subject_alt_names)?;
        params.use_authority_key_identifier_extension = !self.is_ca;
        Ok(())
    }
}

/// Converts SAN entries to rcgen `SanType`s.
fn convert_sans(sans: &[SubjectAltName]) -> Result<Vec<SanType>> {
    sans.iter()
        .map(|san| match san {
            SubjectAltName::Dns(dns) => {
                let ia5 = Ia5String::try_from(dns.clone())
                    .map_err(|e| Error::PolicyViolation(format!("invalid DNS name '{dns}': {e}")))?;
                Ok(SanType::DnsName(ia5))
            }
            SubjectAltName::Ip(ip) => Ok(SanType::IpAddress(*ip)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn ca_profile_is_signing_only() {
        let profile = ca_profile();
        assert!(profile.is_ca);
        assert_eq!(
            profile.key_usages,
            vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign]
        );
        assert!(profile.extended_key_usages.is_empty());
        assert!(profile.subject_alt_names.is_empty());
    }

    #[test]
    fn server_profile_carries_server_auth() {
        let sans = vec![SubjectAltName::Dns("example.com".into())];
        let profile = leaf_profile(Role::Server, &sans).unwrap();
        assert!(!profile.is_ca);
        assert_eq!(
            profile.extended_key_usages,
            vec![ExtendedKeyUsagePurpose::ServerAuth]
        );
        assert_eq!(profile.subject_alt_names, sans);
    }

    #[test]
    fn client_profile_carries_client_auth() {
        let profile = leaf_profile(Role::Client, &[]).unwrap();
        assert_eq!(
            profile.extended_key_usages,
            vec![ExtendedKeyUsagePurpose::ClientAuth]
        );
        assert!(profile.subject_alt_names.is_empty());
    }

    #[test]
    fn server_profile_requires_sans() {
        let result = leaf_profile(Role::Server, &[]);
        assert!(matches!(result, Err(crate::Error::PolicyViolation(_))));
    }

    #[test]
    fn leaf_key_usages_are_tls_bits() {
        let profile = leaf_profile(Role::Client, &[]).unwrap();
        assert_eq!(
            profile.key_usages,
            vec![
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyEncipherment
            ]
        );
    }

    #[test]
    fn apply_sets_params() {
        let sans = vec![
            SubjectAltName::Dns("*.example.com".into()),
            SubjectAltName::Ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
        ];
        let profile = leaf_profile(Role::Server, &sans).unwrap();
        let mut params = CertificateParams::default();
        profile.apply(&mut params).unwrap();

        assert!(matches!(params.is_ca, IsCa::ExplicitNoCa));
        assert_eq!(params.subject_alt_names.len(), 2);
        assert!(params.use_authority_key_identifier_extension);
    }

    #[test]
    fn apply_ca_skips_aki() {
        let mut params = CertificateParams::default();
        ca_profile().apply(&mut params).unwrap();
        assert!(matches!(params.is_ca, IsCa::Ca(_)));
        assert!(!params.use_authority_key_identifier_extension);
    }
}
