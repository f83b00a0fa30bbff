//! Leaf certificate issuance.
//!
//! Pure transformation: given a CA and identity inputs, produce a signed
//! key/certificate pair. No storage or network access happens here; the
//! registry decides when issuance runs.

use chrono::{Duration, Utc};
use rcgen::{CertificateParams, DnType, SerialNumber};
use tracing::debug;

use crate::ca::{CertificateAuthority, to_rcgen_time};
use crate::error::{Error, Result};
use crate::policy;
use crate::types::{Certificate, PrivateKey, Role, SubjectAltName};

/// Leaf validity window in days, well inside the CA's ten years.
pub const LEAF_VALIDITY_DAYS: i64 = 825;

/// Issues a signed leaf certificate and fresh key pair.
///
/// The subject CN is the canonical name, the issuer is the CA's subject,
/// the serial is freshly sampled, and the extension set comes from the
/// role policy.
///
/// # Errors
///
/// Returns [`Error::PolicyViolation`] for invalid identity inputs and
/// [`Error::Signing`] if key generation or signing fails.
pub fn issue(
    ca: &CertificateAuthority,
    role: Role,
    canonical_name: &str,
    sans: &[SubjectAltName],
    key_size: u32,
) -> Result<(PrivateKey, Certificate)> {
    if canonical_name.trim().is_empty() {
        return Err(Error::PolicyViolation("canonical name cannot be empty".into()));
    }

    let profile = policy::leaf_profile(role, sans)?;
    let (key, key_pair) = PrivateKey::generate_rsa(key_size)?;

    let mut params = CertificateParams::default();
    params
        .distinguished_name
        .push(DnType::CommonName, canonical_name);
    profile.apply(&mut params)?;
    params.serial_number = Some(random_serial());

    let now = Utc::now();
    params.not_before = to_rcgen_time(now - Duration::hours(1))?;
    // An aging CA caps the window: a leaf must never outlive its issuer.
    let not_after = (now + Duration::days(LEAF_VALIDITY_DAYS)).min(ca.certificate().not_after());
    params.not_after = to_rcgen_time(not_after)?;

    let issuer = ca.issuer_cert()?;
    let cert = params
        .signed_by(&key_pair, &issuer, ca.key_pair())
        .map_err(|e| Error::Signing(format!("failed to sign certificate: {e}")))?;
    let cert = Certificate::from_der(cert.der())?;

    debug!(
        role = %role,
        subject = canonical_name,
        serial = cert.serial(),
        "leaf certificate issued"
    );

    Ok((key, cert))
}

/// Samples a random 16-byte positive serial number.
///
/// Collision probability across one CA's lifetime is negligible; serials
/// are never reused because they are never derived from state.
pub(crate) fn random_serial() -> SerialNumber {
    use rand::RngCore;

    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    // Keep the leading byte positive and non-zero so the DER integer
    // encoding is stable.
    bytes[0] = (bytes[0] & 0x7f) | 0x40;
    SerialNumber::from(bytes.to_vec())
}
