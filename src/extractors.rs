use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::users;
use crate::error::AppError;
use crate::session::auth_key;
use crate::state::AppState;

/// The currently authenticated user, resolved from the `token` header
/// through the session cache.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub picture: Option<String>,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("token")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let user_id = state
            .sessions
            .get(&auth_key(token))
            .await?
            .ok_or(AppError::Unauthorized)?;

        // The session may outlive the record when the user was deleted
        // on another request.
        let user = users::get_by_id(&state.db, &user_id)?.ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser {
            id: user.id,
            name: user.name,
            picture: user.picture,
        })
    }
}
