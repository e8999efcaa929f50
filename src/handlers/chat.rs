use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, info};

use crate::{
    models::{ChatRequest, ChatResponse},
    services::genie::GenieService,
};

/// Error reply in the shape the client expects: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

/// Handle one chat message.
///
/// This endpoint:
/// 1. Rejects messages that carry neither text nor an image
/// 2. Verifies any attached image is valid base64
/// 3. Hands the request to the genie service for an answer
pub async fn chat(
    State(genie): State<Arc<GenieService>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    debug!(
        query = %request.query,
        has_location = request.location.is_some(),
        has_image = request.image.is_some(),
        "chat request"
    );

    if request.query.trim().is_empty() && request.image.is_none() {
        return Err(ApiError::unprocessable("Query or image is required."));
    }

    if let Some(image) = &request.image {
        match general_purpose::STANDARD.decode(image) {
            Ok(bytes) => info!(image_bytes = bytes.len(), "image attachment received"),
            Err(_) => return Err(ApiError::unprocessable("Image is not valid base64.")),
        }
    }

    let response = genie.answer(&request);
    info!(has_map = response.map_data.is_some(), "chat answered");
    Ok(Json(response))
}
