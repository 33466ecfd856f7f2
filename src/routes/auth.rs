use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::session::{auth_key, generate_token};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
}

#[derive(Deserialize)]
pub struct ConnectRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct ConnectResponse {
    pub token: String,
}

/// POST /connect — exchange email/password for a session token.
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> AppResult<Json<ConnectResponse>> {
    let user = users::get_by_email(&state.db, &req.email)?.ok_or(AppError::NotFound)?;

    let valid = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("bcrypt verify: {e}")))?;
    if !valid {
        return Err(AppError::Unauthorized);
    }

    let token = generate_token();
    let ttl = Duration::from_secs(state.config.auth.token_ttl_secs);
    state.sessions.set(&auth_key(&token), &user.id, ttl).await?;

    tracing::debug!(user_id = %user.id, "session opened");
    Ok(Json(ConnectResponse { token }))
}

/// POST /disconnect — drop the session behind the `token` header.
pub async fn disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let token = headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("token header missing".into()))?;

    if !state.sessions.delete(&auth_key(token)).await? {
        return Err(AppError::Unauthorized);
    }
    Ok(StatusCode::NO_CONTENT)
}
