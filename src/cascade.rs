//! Cascade-delete coordinator: remove a user and every trace of their
//! activity.
//!
//! Steps run sequentially, best effort, in a fixed order:
//!
//! 1. pull the user's comments from every post
//! 2. pull the user's likes
//! 3. pull the user's dislikes
//! 4. for each post the user owns: delete its image blobs, then the
//!    post record
//! 5. delete the user's profile picture blob
//! 6. delete the user record (zero rows matched means the user did not
//!    exist and the whole call is NotFound)
//!
//! Blobs are deleted before the record that references them: a crash
//! mid-delete leaves an orphaned post that a retry can clean up, never
//! an unreferenced blob nothing points at. A single blob failing to
//! delete is logged and skipped; it does not abort the cascade.

use crate::db::{posts, users};
use crate::error::{AppError, AppResult};
use crate::reactions::ReactionKind;
use crate::state::DbPool;
use crate::storage::BlobStore;

pub async fn delete_user(pool: &DbPool, blobs: &dyn BlobStore, user_id: &str) -> AppResult<()> {
    let comments = posts::pull_comments_by_author(pool, user_id)?;
    let likes = posts::pull_reactions_by_user(pool, ReactionKind::Like, user_id)?;
    let dislikes = posts::pull_reactions_by_user(pool, ReactionKind::Dislike, user_id)?;
    tracing::debug!(
        user_id,
        comments,
        likes,
        dislikes,
        "purged activity on other posts"
    );

    let owned = posts::list_by_owner(pool, user_id)?;
    for post in owned {
        for picture in &post.pictures {
            delete_blob_best_effort(blobs, picture).await;
        }
        posts::delete(pool, &post.id)?;
    }

    let user = users::get_by_id(pool, user_id)?.ok_or(AppError::NotFound)?;
    if let Some(ref picture) = user.picture {
        delete_blob_best_effort(blobs, picture).await;
    }

    if users::delete_record(pool, user_id)? == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(user_id, "user deleted");
    Ok(())
}

/// One blob failing to delete must not abort the rest of the cascade.
async fn delete_blob_best_effort(blobs: &dyn BlobStore, name: &str) {
    if let Err(e) = blobs.delete(name).await {
        tracing::warn!(blob = name, error = %e, "failed to delete blob, continuing");
    }
}
