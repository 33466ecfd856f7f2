pub mod auth;
pub mod posts;
pub mod uploads;
pub mod users;

use axum::extract::multipart::{Field, Multipart};
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(posts::router())
        .merge(uploads::router())
}

// Shared multipart plumbing for the upload-bearing handlers.

pub(crate) async fn next_field(multipart: &mut Multipart) -> AppResult<Option<Field<'_>>> {
    multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))
}

pub(crate) async fn text(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid field: {e}")))
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
