//! Shared state for the issuance service.

use std::sync::Arc;

use certsmith_pki::{BundleConfig, IdentityRegistry};

/// State shared across all request handlers.
#[derive(Debug)]
pub struct AppState {
    registry: Arc<IdentityRegistry>,
    bundle: BundleConfig,
}

impl AppState {
    /// Creates the shared state.
    #[must_use]
    pub fn new(registry: Arc<IdentityRegistry>, bundle: BundleConfig) -> Self {
        Self { registry, bundle }
    }

    /// Returns the identity registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    /// Returns the bundle configuration.
    #[must_use]
    pub const fn bundle(&self) -> &BundleConfig {
        &self.bundle
    }
}
