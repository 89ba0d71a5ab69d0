//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{infrastructure::dto::http::StatsDto, ui::state::AppState};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Number of users currently connected
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsDto> {
    Json(StatsDto {
        active_users: state.active_users.count(),
    })
}
