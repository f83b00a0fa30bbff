//! Certificate authority core for Certsmith.
#![forbid(unsafe_code)]
//!
//! This crate implements a small self-hosted CA: a persisted root
//! certificate, identity-keyed issuance of server and client leaf
//! certificates, and in-memory bundle construction for downloads.
//!
//! # Overview
//!
//! The `certsmith-pki` crate enables:
//! - Bootstrapping and persisting a root CA at a fixed storage location
//! - Resolving identities to key/certificate pairs with reuse-or-force
//!   semantics (same identity, same bytes, until explicitly rotated)
//! - Building zip bundles with PEM artifacts and a password-protected
//!   PKCS#12 container
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use certsmith_pki::{
//!     BundleConfig, DiskStorage, IdentityRegistry, IssueRequest, RegistryConfig, bundle,
//! };
//!
//! let storage = Arc::new(DiskStorage::open("./certs").unwrap());
//! let registry = IdentityRegistry::open(storage, RegistryConfig::default()).unwrap();
//!
//! let request = IssueRequest::server("example.com", &["www.example.com"]).unwrap();
//! let resolved = registry.resolve(&request).unwrap();
//!
//! let zip = bundle::leaf_bundle(
//!     &BundleConfig::default(),
//!     "example.com",
//!     &resolved.key,
//!     &resolved.certificate,
//!     registry.ca_certificate(),
//! )
//! .unwrap();
//! assert!(!zip.is_empty());
//! ```
//!
//! # Modules
//!
//! - [`ca`] - Root CA lifecycle and persistence
//! - [`registry`] - Identity-keyed resolution (reuse / issue / force)
//! - [`issuer`] - Leaf certificate issuance
//! - [`policy`] - Role extension profiles
//! - [`bundle`] - Zip and PKCS#12 bundle construction
//! - [`storage`] - Artifact storage backend and layout
//! - [`types`] - Core types (`Certificate`, `PrivateKey`, etc.)
//! - [`error`] - Error types

pub mod bundle;
pub mod ca;
pub mod error;
pub mod issuer;
pub mod policy;
pub mod registry;
pub mod storage;
pub mod types;

// Re-export commonly used types at crate root
pub use bundle::BundleConfig;
pub use ca::{CaConfig, CaStore, CertificateAuthority};
pub use error::{Error, Result};
pub use registry::{CA_RESERVED_NAME, IdentityRegistry, RegistryConfig, ResolvedIdentity};
pub use storage::{DiskStorage, StorageBackend, sanitize_name};
pub use types::{Certificate, IssueRequest, PrivateKey, Role, SubjectAltName};
