//! Liveness and occupancy reporting.

use super::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub num_users: usize,
    pub num_rooms: usize,
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        num_users: state.users.num_users(),
        num_rooms: state.rooms.num_rooms().await,
    })
}
