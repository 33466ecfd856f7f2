use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::{Comment, Post, PostOwner};
use crate::db::{posts, users};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::reactions::{toggle_reaction, ReactionKind};
use crate::routes::users::CreatedResponse;
use crate::routes::{next_field, non_empty, text};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(all_posts))
        .route("/posts", post(create_post))
        .route("/users/{user_id}/posts", get(user_posts))
        .route("/posts/{post_id}", put(edit_post))
        .route("/posts/{post_id}", delete(delete_post))
        .route("/posts/{post_id}/like", put(like_post))
        .route("/posts/{post_id}/dislike", put(dislike_post))
        .route("/posts/{post_id}/comments", post(add_comment))
}

/// GET /posts — every post, newest first.
pub async fn all_posts(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(posts::list_all(&state.db)?))
}

/// GET /users/{user_id}/posts — one user's posts, newest first.
pub async fn user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<Post>>> {
    if users::get_by_id(&state.db, &user_id)?.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(Json(posts::list_by_owner(&state.db, &user_id)?))
}

/// Text fields and stored uploads pulled out of a post form.
#[derive(Default)]
struct PostForm {
    name: Option<String>,
    post_type: Option<String>,
    content: Option<String>,
    pictures: Vec<String>,
}

/// Walk a multipart body, whitelisting name/type/content and storing
/// every `pictures` file as it streams in (upload order preserved).
async fn read_post_form(state: &AppState, multipart: &mut Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();

    while let Some(field) = next_field(multipart).await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => form.name = non_empty(text(field).await?),
            Some("type") => form.post_type = non_empty(text(field).await?),
            Some("content") => form.content = non_empty(text(field).await?),
            Some("pictures") => {
                let original = field.file_name().unwrap_or("picture").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
                let stored = state.blobs.store(data, &original).await?;
                form.pictures.push(stored);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /posts — multipart: `name` required, `type`/`content` optional,
/// repeated `pictures` files attached in order.
pub async fn create_post(
    State(state): State<AppState>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let form = read_post_form(&state, &mut multipart).await?;
    let Some(name) = form.name else {
        return Err(AppError::BadRequest("post name needed".into()));
    };

    let id = posts::insert(
        &state.db,
        posts::NewPost {
            owner: PostOwner {
                id: current.id,
                name: current.name,
                picture: current.picture,
            },
            name,
            post_type: form.post_type,
            content: form.content,
            pictures: form.pictures,
        },
    )?;

    tracing::info!(post_id = %id, "post created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// PUT /posts/{post_id} — owner-only edit; new pictures are appended,
/// never replacing the existing sequence.
pub async fn edit_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<StatusCode> {
    let existing = posts::get(&state.db, &post_id)?.ok_or(AppError::NotFound)?;
    if existing.owner.id != current.id {
        return Err(AppError::Unauthorized);
    }

    let form = read_post_form(&state, &mut multipart).await?;
    posts::update(
        &state.db,
        &post_id,
        &posts::PostUpdate {
            name: form.name,
            post_type: form.post_type,
            content: form.content,
        },
    )?;
    for picture in &form.pictures {
        posts::push_picture(&state.db, &post_id, picture)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /posts/{post_id} — owner-only. Attached blobs go first so a
/// crash leaves a retryable post record rather than orphaned blobs.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    current: CurrentUser,
) -> AppResult<StatusCode> {
    let existing = posts::get(&state.db, &post_id)?.ok_or(AppError::NotFound)?;
    if existing.owner.id != current.id {
        return Err(AppError::Unauthorized);
    }

    for picture in &existing.pictures {
        if let Err(e) = state.blobs.delete(picture).await {
            tracing::warn!(blob = %picture, error = %e, "failed to delete blob, continuing");
        }
    }
    posts::delete(&state.db, &post_id)?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /posts/{post_id}/like — toggle the caller's like.
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    current: CurrentUser,
) -> AppResult<StatusCode> {
    let outcome = toggle_reaction(
        &state.db,
        &post_id,
        &current.id,
        &current.name,
        ReactionKind::Like,
    )?;
    tracing::debug!(%post_id, user_id = %current.id, ?outcome, "like toggled");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /posts/{post_id}/dislike — toggle the caller's dislike.
pub async fn dislike_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    current: CurrentUser,
) -> AppResult<StatusCode> {
    let outcome = toggle_reaction(
        &state.db,
        &post_id,
        &current.id,
        &current.name,
        ReactionKind::Dislike,
    )?;
    tracing::debug!(%post_id, user_id = %current.id, ?outcome, "dislike toggled");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub comment: Option<String>,
}

/// POST /posts/{post_id}/comments — append a comment.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    current: CurrentUser,
    Json(req): Json<CommentRequest>,
) -> AppResult<StatusCode> {
    let Some(comment) = req.comment.filter(|c| !c.is_empty()) else {
        return Err(AppError::BadRequest("comment missing".into()));
    };

    posts::push_comment(
        &state.db,
        &post_id,
        &Comment {
            id: current.id,
            name: current.name,
            comment,
        },
    )?;

    Ok(StatusCode::NO_CONTENT)
}
