//! Handlers for user accounts

use super::AppState;
use crate::{core::Error, extractor::ValidJson, store::User};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc};
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/start", post(create_user))
}

#[derive(Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(max = 50, message = "Must be at most 50 characters"))]
    pub username: Option<String>,
}

/// Create a user; an empty or missing username gets a server-assigned
/// anonymous name.
async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> Result<Json<User>, Error> {
    let user = state.users.create(req.username)?;
    tracing::info!(username = %user.username, "user created");
    Ok(Json(user))
}

async fn list_users(State(state): State<Arc<AppState>>) -> Json<HashMap<String, User>> {
    Json(state.users.list())
}
