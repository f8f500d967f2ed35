use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{api_errors::AppError, app_state::AppState};

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
}

pub async fn login(
    State(st): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let role = match st.credentials.authenticate(&req.username, &req.password) {
        Some(role) => role,
        None => {
            tracing::warn!("Failed login for username={}", req.username);
            return Err(AppError::unauthorized("Invalid credentials"));
        }
    };

    let token = st.tokens.issue(&req.username, role)?;
    tracing::info!("Login: username={}, role={}", req.username, role);
    Ok(Json(LoginResponse { token }))
}
