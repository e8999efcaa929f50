pub mod chat;

use axum::{response::IntoResponse, Json};

pub use chat::{chat, ApiError};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "compass-genie",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
