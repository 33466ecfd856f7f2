//! Repository for the `users` collection.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub about: Option<String>,
    pub picture: Option<String>,
}

/// Whitelisted fields an edit may touch. `None` means "leave alone".
#[derive(Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub about: Option<String>,
    pub picture: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.about.is_none()
            && self.picture.is_none()
    }

    /// True when the edit touches a field mirrored into post owner
    /// snapshots, so the caller must re-sync them.
    pub fn touches_owner_snapshot(&self) -> bool {
        self.name.is_some() || self.picture.is_some()
    }
}

fn map_constraint(e: rusqlite::Error) -> AppError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Conflict("email already exists".into())
        }
        _ => AppError::Database(e),
    }
}

pub fn insert(pool: &DbPool, user: NewUser) -> AppResult<String> {
    if get_by_email(pool, &user.email)?.is_some() {
        return Err(AppError::Conflict("email already exists".into()));
    }

    let conn = pool.get()?;
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, age, gender, about, picture, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            user.name,
            user.email,
            user.password_hash,
            user.age,
            user.gender,
            user.about,
            user.picture,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(map_constraint)?;

    Ok(id)
}

pub fn get_by_id(pool: &DbPool, id: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            "SELECT id, name, email, password_hash, age, gender, about, picture, created_at
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

pub fn get_by_email(pool: &DbPool, email: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            "SELECT id, name, email, password_hash, age, gender, about, picture, created_at
             FROM users WHERE email = ?1",
            params![email],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Apply a whitelist edit. An update that matches no record signals a
/// consistency error: the caller resolved the id through a live session.
pub fn update(pool: &DbPool, id: &str, update: &UserUpdate) -> AppResult<()> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref name) = update.name {
        sets.push("name = ?");
        values.push(Box::new(name.clone()));
    }
    if let Some(ref email) = update.email {
        sets.push("email = ?");
        values.push(Box::new(email.clone()));
    }
    if let Some(ref hash) = update.password_hash {
        sets.push("password_hash = ?");
        values.push(Box::new(hash.clone()));
    }
    if let Some(age) = update.age {
        sets.push("age = ?");
        values.push(Box::new(age));
    }
    if let Some(ref gender) = update.gender {
        sets.push("gender = ?");
        values.push(Box::new(gender.clone()));
    }
    if let Some(ref about) = update.about {
        sets.push("about = ?");
        values.push(Box::new(about.clone()));
    }
    if let Some(ref picture) = update.picture {
        sets.push("picture = ?");
        values.push(Box::new(picture.clone()));
    }

    if sets.is_empty() {
        return Err(AppError::BadRequest("no editable fields provided".into()));
    }

    let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
    values.push(Box::new(id.to_string()));

    let conn = pool.get()?;
    let changed = conn
        .execute(&sql, rusqlite::params_from_iter(values.iter()))
        .map_err(map_constraint)?;

    if changed == 0 {
        return Err(AppError::Internal(format!(
            "user update matched no record for id {id}"
        )));
    }
    Ok(())
}

/// Remove the user record. Returns the number of rows deleted (0 or 1);
/// the cascade coordinator turns 0 into NotFound.
pub fn delete_record(pool: &DbPool, id: &str) -> AppResult<usize> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(deleted)
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        age: row.get(4)?,
        gender: row.get(5)?,
        about: row.get(6)?,
        picture: row.get(7)?,
        created_at: row.get(8)?,
    })
}
