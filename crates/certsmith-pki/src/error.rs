//! PKI error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for PKI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// PKI error variants.
#[derive(Debug, Error)]
pub enum Error {
    /// The storage location could not be read or written.
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        /// Path that failed, relative to the storage root.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An existing key or certificate on disk failed to parse.
    ///
    /// Surfaced instead of silently regenerating: a regenerated CA or leaf
    /// would invalidate trust relationships already established with the
    /// old artifact.
    #[error("corrupt artifact at {}: {reason}", path.display())]
    CorruptArtifact {
        /// Path of the unparseable artifact.
        path: PathBuf,
        /// Parse failure description.
        reason: String,
    },

    /// Invalid issuance inputs (bad SAN entry, empty name, empty server SAN set).
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// The underlying cryptographic signing operation failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Certificate or key parsing failed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The identity name is reserved for the CA itself.
    #[error("name '{0}' is reserved for the CA")]
    ReservedName(String),

    /// Bundle construction (PKCS#12 or archive) failed.
    #[error("bundle construction failed: {0}")]
    Bundle(String),
}

impl Error {
    /// Builds a [`Error::Storage`] from a path and I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Builds a [`Error::CorruptArtifact`] from a path and reason.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display_includes_path() {
        let err = Error::storage(
            "server/example.com.pem",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("server/example.com.pem"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn corrupt_artifact_display() {
        let err = Error::corrupt("ca.pem", "not a certificate");
        assert_eq!(
            err.to_string(),
            "corrupt artifact at ca.pem: not a certificate"
        );
    }

    #[test]
    fn reserved_name_display() {
        let err = Error::ReservedName("ca".into());
        assert_eq!(err.to_string(), "name 'ca' is reserved for the CA");
    }
}
