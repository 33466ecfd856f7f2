use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/uploads/{name}", get(serve))
}

/// GET /uploads/{name} — serve a stored image.
pub async fn serve(State(state): State<AppState>, Path(name): Path<String>) -> AppResult<Response> {
    match state.blobs.load(&name).await? {
        Some(data) => {
            let mime = mime_guess::from_path(&name).first_or_octet_stream();
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                data,
            )
                .into_response())
        }
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}
