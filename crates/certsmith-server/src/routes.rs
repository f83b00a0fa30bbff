//! Route configuration for the issuance service.

use std::sync::Arc;

use axum::routing::{Router, get};
use tower_http::trace::TraceLayer;

use crate::handlers::{get_ca, get_client_bundle, get_server_bundle};
use crate::state::AppState;

/// Creates the issuance service router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // CA certificate download
        .route("/ca", get(get_ca))
        // Identity issuance, spec tail carries name list and /force
        .route("/server/{*spec}", get(get_server_bundle))
        .route("/client/{*spec}", get(get_client_bundle))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use certsmith_pki::{BundleConfig, DiskStorage, IdentityRegistry, RegistryConfig};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn make_test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let storage = Arc::new(DiskStorage::open(dir.path()).unwrap());
        let registry = Arc::new(
            IdentityRegistry::open(storage, RegistryConfig::default().with_key_size(1024)).unwrap(),
        );
        let bundle = BundleConfig {
            kdf_rounds: 64,
            ..BundleConfig::default()
        };
        Arc::new(AppState::new(registry, bundle))
    }

    async fn get_response(app: Router, uri: &str) -> axum::response::Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn ca_endpoint_serves_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(make_test_state(&dir));

        let response = get_response(app, "/ca").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/zip"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"ca-cert.zip\""
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn server_endpoint_issues_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_test_state(&dir);

        let response = get_response(
            create_router(state.clone()),
            "/server/example.com,www.example.com",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"example.com.zip\""
        );
        assert!(dir.path().join("server/example.com.pem").exists());
        assert!(dir.path().join("server/example.com.key").exists());

        // A second request reuses the persisted identity.
        let again = get_response(create_router(state), "/server/example.com").await;
        assert_eq!(again.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn client_endpoint_handles_encoded_names() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(make_test_state(&dir));

        let response = get_response(app, "/client/John%20Doe").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"John_Doe.zip\""
        );
        assert!(dir.path().join("client/John_Doe.pem").exists());
    }

    #[tokio::test]
    async fn force_segment_rotates_the_identity() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_test_state(&dir);

        let first = get_response(create_router(state.clone()), "/client/node-1").await;
        assert_eq!(first.status(), StatusCode::OK);
        let before = std::fs::read(dir.path().join("client/node-1.pem")).unwrap();

        let forced = get_response(create_router(state), "/client/node-1/force").await;
        assert_eq!(forced.status(), StatusCode::OK);
        let after = std::fs::read(dir.path().join("client/node-1.pem")).unwrap();

        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn invalid_server_name_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(make_test_state(&dir));

        let response = get_response(app, "/server/not%20a%20hostname").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "policy_violation");
    }

    #[tokio::test]
    async fn reserved_name_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(make_test_state(&dir));

        let response = get_response(app, "/client/ca").await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "reserved_name");
    }

    #[tokio::test]
    async fn unknown_trailing_segment_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(make_test_state(&dir));

        let response = get_response(app, "/server/example.com/renew").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(make_test_state(&dir));

        let response = get_response(app, "/intermediate/example.com").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
