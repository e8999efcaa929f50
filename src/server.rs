use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::handlers::{chat, health};
use crate::services::genie::GenieService;

/// Build the dev backend router. Browser clients come from arbitrary
/// origins, so CORS is wide open.
pub fn router(genie: Arc<GenieService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(genie)
}

/// Run the dev backend until the process is stopped.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let genie = Arc::new(GenieService::new(config.default_coordinate()));
    let app = router(genie);

    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("🌍 Dev backend listening on {}", addr);
    info!("Chat endpoint at http://127.0.0.1:{}/chat", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
