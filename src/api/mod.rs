//! HTTP surface: `POST /detect`, `POST /object_qa`, health and metrics

pub mod handlers;
pub mod models;
pub mod routes;

use std::net::SocketAddr;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::Result;

pub use handlers::AppState;
pub use models::{DetectResponse, QaRequest, QaResponse};
pub use routes::build_router;

/// Bind and serve until Ctrl-C
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = config.bind_addr();
    let key_strategy = state.key_strategy;
    let router = build_router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        "Listening on http://{} (session keys: {})",
        addr,
        key_strategy.as_str()
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
