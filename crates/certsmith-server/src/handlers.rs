//! Request handlers for the issuance routes.
//!
//! Issuance does RSA key generation and PKCS#12 KDF work, so every
//! handler moves the resolve-and-bundle step onto the blocking pool
//! instead of stalling the async runtime.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::info;

use certsmith_pki::{Role, bundle};

use crate::error::{ServerError, ServerResult};
use crate::request::parse_spec;
use crate::state::AppState;

/// `GET /ca` - download the CA certificate bundle.
pub async fn get_ca(State(state): State<Arc<AppState>>) -> ServerResult<Response> {
    let bytes = tokio::task::spawn_blocking(move || {
        bundle::ca_bundle(state.registry().ca_certificate())
    })
    .await
    .map_err(|e| ServerError::TaskFailed(e.to_string()))??;

    info!(bytes = bytes.len(), "CA bundle served");
    Ok(zip_response(&bundle::ca_bundle_name(), bytes))
}

/// `GET /server/{*spec}` - resolve a server identity and download its bundle.
pub async fn get_server_bundle(
    State(state): State<Arc<AppState>>,
    Path(spec): Path<String>,
) -> ServerResult<Response> {
    issue_bundle(state, Role::Server, spec).await
}

/// `GET /client/{*spec}` - resolve a client identity and download its bundle.
pub async fn get_client_bundle(
    State(state): State<Arc<AppState>>,
    Path(spec): Path<String>,
) -> ServerResult<Response> {
    issue_bundle(state, Role::Client, spec).await
}

/// Resolves one identity and assembles its download bundle.
async fn issue_bundle(state: Arc<AppState>, role: Role, spec: String) -> ServerResult<Response> {
    let request = parse_spec(role, &spec)?;
    let name = request.name.clone();

    let (bytes, reused) = tokio::task::spawn_blocking(move || -> certsmith_pki::Result<_> {
        let resolved = state.registry().resolve(&request)?;
        let bytes = bundle::leaf_bundle(
            state.bundle(),
            &request.name,
            &resolved.key,
            &resolved.certificate,
            state.registry().ca_certificate(),
        )?;
        Ok((bytes, resolved.reused))
    })
    .await
    .map_err(|e| ServerError::TaskFailed(e.to_string()))??;

    info!(role = %role, name, reused, bytes = bytes.len(), "identity bundle served");
    Ok(zip_response(&bundle::leaf_bundle_name(&name), bytes))
}

/// Wraps zip bytes as a download response.
fn zip_response(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn zip_response_sets_download_headers() {
        let response = zip_response("example.com.zip", vec![0x50, 0x4b, 0x03, 0x04]);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/zip"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"example.com.zip\""
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..2], b"PK");
    }
}
