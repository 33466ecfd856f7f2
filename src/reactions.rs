//! Reaction engine: like/dislike toggling with mutual exclusivity.
//!
//! A user holds at most one reaction per post across both kinds. The
//! opposite-kind removal and the new-kind addition are two separate
//! persisted updates, so a concurrent reader may transiently observe
//! neither reaction present; see DESIGN.md for the strengthening
//! options a stricter deployment could pick.

use crate::db::models::ReactionEntry;
use crate::db::posts;
use crate::error::AppResult;
use crate::state::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    /// JSON array column holding this kind's entries.
    pub fn column(self) -> &'static str {
        match self {
            ReactionKind::Like => "likes",
            ReactionKind::Dislike => "dislikes",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            ReactionKind::Like => ReactionKind::Dislike,
            ReactionKind::Dislike => ReactionKind::Like,
        }
    }
}

/// What a toggle call did to the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// No prior reaction; the new one was added.
    Added,
    /// Same-kind reaction existed; it was removed.
    Removed,
    /// Opposite-kind reaction existed; it was replaced by the new kind.
    Switched,
}

/// Toggle `user_id`'s reaction of `kind` on the post.
///
/// Same kind present: remove it. Opposite kind present: remove the
/// opposite first, then add the new kind. Neither present: add. Each
/// branch persists through single-record updates; a post that cannot
/// be found on the initial membership check is NotFound.
pub fn toggle_reaction(
    pool: &DbPool,
    post_id: &str,
    user_id: &str,
    user_name: &str,
    kind: ReactionKind,
) -> AppResult<ToggleOutcome> {
    if posts::has_reaction(pool, post_id, kind, user_id)? {
        posts::pull_reaction(pool, post_id, kind, user_id)?;
        return Ok(ToggleOutcome::Removed);
    }

    let entry = ReactionEntry {
        id: user_id.to_string(),
        name: user_name.to_string(),
    };

    if posts::has_reaction(pool, post_id, kind.opposite(), user_id)? {
        posts::pull_reaction(pool, post_id, kind.opposite(), user_id)?;
        posts::push_reaction(pool, post_id, kind, &entry)?;
        return Ok(ToggleOutcome::Switched);
    }

    posts::push_reaction(pool, post_id, kind, &entry)?;
    Ok(ToggleOutcome::Added)
}
