use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::cascade;
use crate::db::users::{self, NewUser, UserUpdate};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::routes::{next_field, non_empty, text};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(signup))
        .route("/users/{user_id}", put(edit_user))
        .route("/users/{user_id}", delete(delete_user))
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// POST /users — multipart signup: name, email and password are
/// required text fields; age, gender, about and a `picture` file are
/// optional.
pub async fn signup(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let mut name = None;
    let mut email = None;
    let mut password = None;
    let mut age = None;
    let mut gender = None;
    let mut about = None;
    let mut picture = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => name = non_empty(text(field).await?),
            Some("email") => email = non_empty(text(field).await?),
            Some("password") => password = non_empty(text(field).await?),
            Some("gender") => gender = non_empty(text(field).await?),
            Some("about") => about = non_empty(text(field).await?),
            Some("age") => age = parse_age(&text(field).await?)?,
            Some("picture") => {
                let original = field.file_name().unwrap_or("picture").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
                picture = Some(state.blobs.store(data, &original).await?);
            }
            // anything outside the whitelist is dropped
            _ => {}
        }
    }

    let (Some(name), Some(email), Some(password)) = (name, email, password) else {
        return Err(AppError::BadRequest(
            "name, email and password needed".into(),
        ));
    };

    let password_hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("bcrypt hash: {e}")))?;

    let id = users::insert(
        &state.db,
        NewUser {
            name,
            email,
            password_hash,
            age,
            gender,
            about,
            picture,
        },
    )?;

    tracing::info!(user_id = %id, "user created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[derive(Deserialize, Default)]
pub struct EditUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub about: Option<String>,
    pub picture: Option<String>,
}

/// PUT /users/{user_id} — whitelist edit of the caller's own record.
/// Edits that change the display name or picture re-sync the owner
/// snapshot on every post the user owns.
pub async fn edit_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    current: CurrentUser,
    Json(req): Json<EditUserRequest>,
) -> AppResult<StatusCode> {
    if current.id != user_id {
        return Err(AppError::Unauthorized);
    }

    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(plain) => Some(
            bcrypt::hash(plain, bcrypt::DEFAULT_COST)
                .map_err(|e| AppError::Internal(format!("bcrypt hash: {e}")))?,
        ),
        None => None,
    };

    let update = UserUpdate {
        name: req.name.filter(|s| !s.is_empty()),
        email: req.email.filter(|s| !s.is_empty()),
        password_hash,
        age: req.age,
        gender: req.gender.filter(|s| !s.is_empty()),
        about: req.about.filter(|s| !s.is_empty()),
        picture: req.picture.filter(|s| !s.is_empty()),
    };

    if update.is_empty() {
        return Err(AppError::BadRequest("no editable fields provided".into()));
    }

    let sync_snapshot = update.touches_owner_snapshot();
    users::update(&state.db, &user_id, &update)?;

    if sync_snapshot {
        let user = users::get_by_id(&state.db, &user_id)?.ok_or(AppError::NotFound)?;
        let touched =
            crate::db::posts::sync_owner(&state.db, &user_id, &user.name, user.picture.as_deref())?;
        tracing::debug!(%user_id, touched, "owner snapshots re-synced");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /users/{user_id} — cascade delete of the caller's own account.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    current: CurrentUser,
) -> AppResult<StatusCode> {
    if current.id != user_id {
        return Err(AppError::Unauthorized);
    }

    cascade::delete_user(&state.db, state.blobs.as_ref(), &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_age(value: &str) -> AppResult<Option<i64>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| AppError::BadRequest("age must be a number".into()))
}
