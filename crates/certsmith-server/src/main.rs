//! Certsmith binary entrypoint.
//!
//! Bootstraps the CA, performs any direct issuance requested on the
//! command line, then optionally runs the HTTP issuance service.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use certsmith_pki::{
    BundleConfig, DiskStorage, IdentityRegistry, IssueRequest, RegistryConfig,
};
use certsmith_server::cli::Cli;
use certsmith_server::error::{ServerError, ServerResult};
use certsmith_server::server::IssuanceServer;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let registry = open_registry(&cli).await?;

    issue_from_cli(&cli, Arc::clone(&registry)).await?;

    if cli.serve {
        let bundle = BundleConfig {
            password: cli.password.clone(),
            kdf_rounds: cli.kdf_rounds,
        };
        let server = IssuanceServer::new(registry, bundle);
        server
            .serve_with_shutdown(cli.addr(), async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await?;
    }

    Ok(())
}

/// Opens the registry, creating the CA on first run.
///
/// RSA key generation can take a while for large sizes, so the open runs
/// on the blocking pool.
async fn open_registry(cli: &Cli) -> ServerResult<Arc<IdentityRegistry>> {
    let storage = Arc::new(DiskStorage::open(&cli.output_dir).map_err(ServerError::from)?);
    let config = RegistryConfig::default().with_key_size(cli.key_size);

    let registry = tokio::task::spawn_blocking(move || IdentityRegistry::open(storage, config))
        .await
        .map_err(|e| ServerError::TaskFailed(e.to_string()))??;

    info!(
        dir = %cli.output_dir.display(),
        ca = registry.ca_certificate().subject(),
        "registry ready"
    );
    Ok(Arc::new(registry))
}

/// Resolves all identities named on the command line.
async fn issue_from_cli(cli: &Cli, registry: Arc<IdentityRegistry>) -> ServerResult<()> {
    let mut requests = Vec::new();

    for group in &cli.domains {
        let (name, extras) = group
            .split_first()
            .ok_or_else(|| ServerError::Internal("empty domain group".into()))?;
        requests.push(IssueRequest::server(name, extras).map_err(ServerError::from)?);
    }
    for name in &cli.clients {
        requests.push(IssueRequest::client(name).map_err(ServerError::from)?);
    }

    if requests.is_empty() {
        return Ok(());
    }

    let force = cli.force;
    tokio::task::spawn_blocking(move || -> certsmith_pki::Result<()> {
        for request in requests {
            let request = request.force(force);
            let resolved = registry.resolve(&request)?;
            info!(
                role = %request.role,
                name = %request.name,
                reused = resolved.reused,
                serial = resolved.certificate.serial(),
                "identity resolved"
            );
        }
        Ok(())
    })
    .await
    .map_err(|e| ServerError::TaskFailed(e.to_string()))??;

    Ok(())
}
