//! Issuance service server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use certsmith_pki::{BundleConfig, IdentityRegistry};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{ServerError, ServerResult};
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP issuance service.
///
/// Serves the CA certificate and resolves server/client identities into
/// downloadable bundles over plain HTTP. Meant for trusted networks
/// only; every client that can reach it can obtain certificates.
#[derive(Debug, Clone)]
pub struct IssuanceServer {
    state: Arc<AppState>,
}

impl IssuanceServer {
    /// Creates a new issuance server over the given registry.
    #[must_use]
    pub fn new(registry: Arc<IdentityRegistry>, bundle: BundleConfig) -> Self {
        let state = Arc::new(AppState::new(registry, bundle));
        Self { state }
    }

    /// Returns the shared state for external access.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Starts the server and listens for connections.
    ///
    /// Runs until the server encounters a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self, addr: SocketAddr) -> ServerResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;

        info!(addr = %addr, "issuance server listening");

        let router = create_router(self.state.clone());

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        Ok(())
    }

    /// Starts the server with graceful shutdown support.
    ///
    /// The server shuts down when the provided future completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> ServerResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;

        info!(addr = %addr, "issuance server listening");

        let router = create_router(self.state.clone());

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        info!("issuance server shut down");
        Ok(())
    }

    /// Creates the router without starting the server.
    ///
    /// Useful for testing or embedding in another server.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }
}
