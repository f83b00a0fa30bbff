//! Identity spec parsing for issuance routes.
//!
//! The wildcard tail of `/server/{*spec}` and `/client/{*spec}` carries
//! the whole identity spec: a comma-separated name list, optionally
//! followed by `/force`. Examples:
//!
//! - `example.com`
//! - `example.com,www.example.com,10.0.0.1`
//! - `example.com/force`

use certsmith_pki::{IssueRequest, Role};

use crate::error::{ServerError, ServerResult};

/// Parses a route spec into an issuance request.
///
/// The first comma-separated entry is the canonical name. For server
/// roles the remaining entries are extra SANs; client specs accept only
/// a single name. A trailing `/force` segment sets the force flag; any
/// other trailing segment is treated as an unknown route.
///
/// # Errors
///
/// Returns [`ServerError::RouteNotFound`] for malformed trailing
/// segments and [`ServerError::Pki`] for names that fail validation.
pub fn parse_spec(role: Role, spec: &str) -> ServerResult<IssueRequest> {
    let mut segments = spec.split('/');
    let names = segments.next().unwrap_or_default();

    let force = match (segments.next(), segments.next()) {
        (None, _) => false,
        (Some("force"), None) => true,
        _ => return Err(ServerError::RouteNotFound(format!("/{role}/{spec}"))),
    };

    let mut entries = names.split(',').map(str::trim);
    let name = entries.next().unwrap_or_default();

    let request = match role {
        Role::Server => {
            let extras: Vec<&str> = entries.collect();
            IssueRequest::server(name, &extras)?
        }
        Role::Client => {
            if entries.next().is_some() {
                return Err(ServerError::Pki(certsmith_pki::Error::PolicyViolation(
                    "client identities take a single name".into(),
                )));
            }
            IssueRequest::client(name)?
        }
    };

    Ok(request.force(force))
}
