//! HTTP issuance service and CLI for Certsmith.
#![forbid(unsafe_code)]
//!
//! This crate wraps [`certsmith_pki`] in an operational surface: a clap
//! CLI for direct issuance and an axum HTTP service that hands out
//! certificate bundles as zip downloads.
//!
//! # Routes
//!
//! - `GET /ca` - CA certificate bundle
//! - `GET /server/{*spec}` - server identity bundle
//! - `GET /client/{*spec}` - client identity bundle
//!
//! The spec tail is `name[,san...][/force]`; see [`request`].
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface
//! - [`server`] - HTTP server lifecycle
//! - [`routes`] - Router configuration
//! - [`handlers`] - Request handlers
//! - [`request`] - Identity spec parsing
//! - [`state`] - Shared handler state
//! - [`error`] - Error types

pub mod cli;
pub mod error;
pub mod handlers;
pub mod request;
pub mod routes;
pub mod server;
pub mod state;

pub use cli::Cli;
pub use error::{ServerError, ServerResult};
pub use routes::create_router;
pub use server::IssuanceServer;
pub use state::AppState;
