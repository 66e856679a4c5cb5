//! Route table and middleware

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{self, AppState};

/// Build the service router
///
/// Handlers extract `ConnectInfo<SocketAddr>`, so serve with
/// `into_make_service_with_connect_info::<SocketAddr>()` (or add
/// `MockConnectInfo` in tests).
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/detect", post(handlers::detect))
        .route("/object_qa", post(handlers::object_qa))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        // enforced by the extractors, so oversized bodies get the handlers' JSON errors
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
