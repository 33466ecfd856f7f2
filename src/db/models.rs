use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub about: Option<String>,
    pub picture: Option<String>,
    pub created_at: String,
}

/// Denormalized copy of a user's display identity, embedded in each of
/// their posts. Re-synced when the user's name or picture changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostOwner {
    pub id: String,
    pub name: String,
    pub picture: Option<String>,
}

/// One like or dislike entry on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub name: String,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: String,
    pub owner: PostOwner,
    pub name: String,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub content: Option<String>,
    /// Blob names, in upload order; newest appended last.
    pub pictures: Vec<String>,
    pub likes: Vec<ReactionEntry>,
    pub dislikes: Vec<ReactionEntry>,
    /// Append-only; insertion order is meaningful.
    pub comments: Vec<Comment>,
    #[serde(skip_serializing)]
    pub created_at: String,
}
