//! HTTP server implementation using Axum.

use crate::handlers::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use ngramkit::{ConfigCache, SearchPlanner, SearchSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Maximum number of requests handled at once.
const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Application state shared across handlers.
pub struct AppState {
    /// Settings the server was started with
    pub settings: SearchSettings,
    /// Record type configurations, shared with the planner
    pub configs: Arc<ConfigCache>,
    /// Planner for the configured dialect
    pub planner: SearchPlanner,
}

impl AppState {
    /// Build state from settings, registering the configured record types.
    pub fn new(settings: SearchSettings) -> ngramkit::Result<Self> {
        let configs = Arc::new(ConfigCache::new());
        settings.register_record_types(&configs)?;
        let planner = SearchPlanner::new(settings.dialect, Arc::clone(&configs));

        Ok(Self {
            settings,
            configs,
            planner,
        })
    }
}

/// Build the router with all endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Configure CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .with_state(state)
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    settings: SearchSettings,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let dialect = settings.dialect;
    let state = Arc::new(AppState::new(settings)?);
    let app = build_router(state);

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    // Bind to the address
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {} (dialect: {})", actual_addr, dialect);

    // Spawn the server in the background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use ngramkit::SqlDialect;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_server_starts() {
        let addr = start_server(SearchSettings::default(), "127.0.0.1", 0)
            .await
            .unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_start_server_rejects_bad_host() {
        assert!(start_server(SearchSettings::default(), "not a host", 0)
            .await
            .is_err());
    }

    #[test]
    fn test_state_registers_configured_types() {
        let settings = SearchSettings::from_json_str(
            r#"{"dialect":"sqlite","recordTypes":{"note":{"mode":"words","minLength":2,"maxLength":9}}}"#,
        )
        .unwrap();
        let state = AppState::new(settings).unwrap();
        assert_eq!(state.planner.dialect(), SqlDialect::Sqlite);
        assert!(state.configs.contains("note"));
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = build_router(Arc::new(AppState::new(SearchSettings::default()).unwrap()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"status": "ok"}));
    }
}
