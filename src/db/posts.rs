//! Repository for the `posts` collection.
//!
//! Likes, dislikes, comments and pictures live inside the post record
//! as JSON arrays, manipulated with SQLite's JSON functions so every
//! push/pull is a single UPDATE statement against one record.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::models::{Comment, Post, PostOwner, ReactionEntry};
use crate::error::{AppError, AppResult};
use crate::reactions::ReactionKind;
use crate::state::DbPool;

pub struct NewPost {
    pub owner: PostOwner,
    pub name: String,
    pub post_type: Option<String>,
    pub content: Option<String>,
    pub pictures: Vec<String>,
}

/// Whitelisted content fields a post edit may touch.
#[derive(Default)]
pub struct PostUpdate {
    pub name: Option<String>,
    pub post_type: Option<String>,
    pub content: Option<String>,
}

const POST_COLUMNS: &str = "id, owner_id, owner_name, owner_picture, name, post_type, content,
     pictures, likes, dislikes, comments, created_at";

struct RawPost {
    id: String,
    owner_id: String,
    owner_name: String,
    owner_picture: Option<String>,
    name: String,
    post_type: Option<String>,
    content: Option<String>,
    pictures: String,
    likes: String,
    dislikes: String,
    comments: String,
    created_at: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPost> {
    Ok(RawPost {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        owner_name: row.get(2)?,
        owner_picture: row.get(3)?,
        name: row.get(4)?,
        post_type: row.get(5)?,
        content: row.get(6)?,
        pictures: row.get(7)?,
        likes: row.get(8)?,
        dislikes: row.get(9)?,
        comments: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn raw_to_post(raw: RawPost) -> AppResult<Post> {
    Ok(Post {
        id: raw.id,
        owner: PostOwner {
            id: raw.owner_id,
            name: raw.owner_name,
            picture: raw.owner_picture,
        },
        name: raw.name,
        post_type: raw.post_type,
        content: raw.content,
        pictures: serde_json::from_str(&raw.pictures)?,
        likes: serde_json::from_str(&raw.likes)?,
        dislikes: serde_json::from_str(&raw.dislikes)?,
        comments: serde_json::from_str(&raw.comments)?,
        created_at: raw.created_at,
    })
}

pub fn insert(pool: &DbPool, post: NewPost) -> AppResult<String> {
    let conn = pool.get()?;
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO posts (id, owner_id, owner_name, owner_picture, name, post_type, content,
                            pictures, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            post.owner.id,
            post.owner.name,
            post.owner.picture,
            post.name,
            post.post_type,
            post.content,
            serde_json::to_string(&post.pictures)?,
            Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(id)
}

pub fn get(pool: &DbPool, id: &str) -> AppResult<Option<Post>> {
    let conn = pool.get()?;
    let raw = conn
        .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            params![id],
            row_to_raw,
        )
        .optional()?;
    raw.map(raw_to_post).transpose()
}

/// All posts, newest first.
pub fn list_all(pool: &DbPool) -> AppResult<Vec<Post>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC"
    ))?;
    let raws = stmt
        .query_map([], row_to_raw)?
        .collect::<Result<Vec<_>, _>>()?;
    raws.into_iter().map(raw_to_post).collect()
}

/// One user's posts, newest first.
pub fn list_by_owner(pool: &DbPool, owner_id: &str) -> AppResult<Vec<Post>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE owner_id = ?1 ORDER BY created_at DESC"
    ))?;
    let raws = stmt
        .query_map(params![owner_id], row_to_raw)?
        .collect::<Result<Vec<_>, _>>()?;
    raws.into_iter().map(raw_to_post).collect()
}

pub fn update(pool: &DbPool, id: &str, update: &PostUpdate) -> AppResult<()> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref name) = update.name {
        sets.push("name = ?");
        values.push(Box::new(name.clone()));
    }
    if let Some(ref post_type) = update.post_type {
        sets.push("post_type = ?");
        values.push(Box::new(post_type.clone()));
    }
    if let Some(ref content) = update.content {
        sets.push("content = ?");
        values.push(Box::new(content.clone()));
    }

    if sets.is_empty() {
        return Ok(());
    }

    let sql = format!("UPDATE posts SET {} WHERE id = ?", sets.join(", "));
    values.push(Box::new(id.to_string()));

    let conn = pool.get()?;
    let changed = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
    if changed == 0 {
        return Err(AppError::Internal(format!(
            "post update matched no record for id {id}"
        )));
    }
    Ok(())
}

/// Append an uploaded picture to the end of the post's picture list.
pub fn push_picture(pool: &DbPool, id: &str, blob_name: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE posts SET pictures = json_insert(pictures, '$[#]', ?2) WHERE id = ?1",
        params![id, blob_name],
    )?;
    if changed == 0 {
        return Err(AppError::Internal(format!(
            "picture append matched no record for id {id}"
        )));
    }
    Ok(())
}

pub fn delete(pool: &DbPool, id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(AppError::Internal(format!(
            "post delete matched no record for id {id}"
        )));
    }
    Ok(())
}

/// Whether `user_id` already has a reaction of `kind` on the post.
/// A missing post is NotFound, distinct from "no reaction".
pub fn has_reaction(
    pool: &DbPool,
    post_id: &str,
    kind: ReactionKind,
    user_id: &str,
) -> AppResult<bool> {
    let conn = pool.get()?;
    let sql = format!(
        "SELECT EXISTS(
             SELECT 1 FROM json_each(posts.{col})
             WHERE json_extract(json_each.value, '$.id') = ?2
         )
         FROM posts WHERE id = ?1",
        col = kind.column()
    );
    conn.query_row(&sql, params![post_id, user_id], |row| row.get(0))
        .optional()?
        .ok_or(AppError::NotFound)
}

/// Add a reaction entry to the post's `kind` array.
pub fn push_reaction(
    pool: &DbPool,
    post_id: &str,
    kind: ReactionKind,
    entry: &ReactionEntry,
) -> AppResult<()> {
    let conn = pool.get()?;
    let sql = format!(
        "UPDATE posts SET {col} = json_insert({col}, '$[#]', json(?2)) WHERE id = ?1",
        col = kind.column()
    );
    let changed = conn.execute(&sql, params![post_id, serde_json::to_string(entry)?])?;
    if changed == 0 {
        return Err(AppError::Internal(format!(
            "reaction push matched no record for post {post_id}"
        )));
    }
    Ok(())
}

/// Remove `user_id`'s entry from the post's `kind` array.
pub fn pull_reaction(
    pool: &DbPool,
    post_id: &str,
    kind: ReactionKind,
    user_id: &str,
) -> AppResult<()> {
    let conn = pool.get()?;
    let sql = format!(
        "UPDATE posts SET {col} = (
             SELECT COALESCE(json_group_array(json(value)), '[]')
             FROM json_each(posts.{col})
             WHERE json_extract(value, '$.id') <> ?2
         )
         WHERE id = ?1",
        col = kind.column()
    );
    let changed = conn.execute(&sql, params![post_id, user_id])?;
    if changed == 0 {
        return Err(AppError::Internal(format!(
            "reaction pull matched no record for post {post_id}"
        )));
    }
    Ok(())
}

/// Strip `user_id`'s `kind` reactions from every post that carries one.
/// Returns the number of posts touched; zero is a valid outcome.
pub fn pull_reactions_by_user(
    pool: &DbPool,
    kind: ReactionKind,
    user_id: &str,
) -> AppResult<usize> {
    let conn = pool.get()?;
    let sql = format!(
        "UPDATE posts SET {col} = (
             SELECT COALESCE(json_group_array(json(value)), '[]')
             FROM json_each(posts.{col})
             WHERE json_extract(value, '$.id') <> ?1
         )
         WHERE EXISTS (
             SELECT 1 FROM json_each(posts.{col})
             WHERE json_extract(json_each.value, '$.id') = ?1
         )",
        col = kind.column()
    );
    Ok(conn.execute(&sql, params![user_id])?)
}

/// Strip every comment authored by `user_id` from every post.
pub fn pull_comments_by_author(pool: &DbPool, user_id: &str) -> AppResult<usize> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE posts SET comments = (
             SELECT COALESCE(json_group_array(json(value)), '[]')
             FROM json_each(posts.comments)
             WHERE json_extract(value, '$.id') <> ?1
         )
         WHERE EXISTS (
             SELECT 1 FROM json_each(posts.comments)
             WHERE json_extract(json_each.value, '$.id') = ?1
         )",
        params![user_id],
    )?;
    Ok(changed)
}

/// Append a comment to the post. Comments are append-only and a user
/// may comment any number of times.
pub fn push_comment(pool: &DbPool, post_id: &str, comment: &Comment) -> AppResult<()> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE posts SET comments = json_insert(comments, '$[#]', json(?2)) WHERE id = ?1",
        params![post_id, serde_json::to_string(comment)?],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Re-sync the denormalized owner snapshot on every post owned by
/// `owner_id`. Touches only the snapshot columns, never post content.
pub fn sync_owner(
    pool: &DbPool,
    owner_id: &str,
    name: &str,
    picture: Option<&str>,
) -> AppResult<usize> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE posts SET owner_name = ?2, owner_picture = ?3 WHERE owner_id = ?1",
        params![owner_id, name, picture],
    )?;
    Ok(changed)
}
