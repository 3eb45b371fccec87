use axum::response::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::xml::API_VERSION;

pub type AppState<S> = Arc<S>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub api_version: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        api_version: API_VERSION.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
