//! Blob store port for uploaded images, plus the filesystem
//! implementation used in production.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Opaque store for uploaded image bytes. Stores hand back a generated
/// name; callers persist only that name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the bytes and return the generated blob name.
    async fn store(&self, data: Bytes, original_name: &str) -> AppResult<String>;

    /// Fetch a blob's bytes, or None when no such blob exists.
    async fn load(&self, name: &str) -> AppResult<Option<Bytes>>;

    /// Delete a blob by its generated name.
    async fn delete(&self, name: &str) -> AppResult<()>;
}

/// Blobs as flat files under a single directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, data: Bytes, original_name: &str) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("creating upload dir: {e}")))?;

        let name = generate_name(original_name);
        let path = self.root.join(&name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| AppError::Internal(format!("writing blob {name}: {e}")))?;

        Ok(name)
    }

    async fn load(&self, name: &str) -> AppResult<Option<Bytes>> {
        if name.contains('/') || name.contains("..") {
            return Err(AppError::BadRequest("invalid blob name".into()));
        }
        match tokio::fs::read(self.root.join(name)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Internal(format!("reading blob {name}: {e}"))),
        }
    }

    async fn delete(&self, name: &str) -> AppResult<()> {
        // Generated names never contain separators; reject anything that
        // could escape the upload directory.
        if name.contains('/') || name.contains("..") {
            return Err(AppError::BadRequest("invalid blob name".into()));
        }
        tokio::fs::remove_file(self.root.join(name))
            .await
            .map_err(|e| AppError::Internal(format!("deleting blob {name}: {e}")))
    }
}

/// Generated name: millisecond timestamp, a random nonce so two uploads
/// of the same file in the same instant cannot collide, the sanitized
/// original stem, and a normalized extension.
fn generate_name(original_name: &str) -> String {
    let path = Path::new(original_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");

    let nonce: u32 = rand::thread_rng().gen_range(0..0x1000000);
    format!(
        "{}_{:06x}_{}.{}",
        Utc::now().timestamp_millis(),
        nonce,
        sanitize(stem),
        normalize_extension(ext)
    )
}

/// Keep the stem filesystem-safe: alphanumerics, dash and underscore.
fn sanitize(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .take(64)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Unsupported extensions are normalized; jpeg variants collapse to jpg.
fn normalize_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        "jpg" | "jpeg" | "jfif" => "jpg",
        _ => "jpg",
    }
}

/// In-memory blob store. Records every store and delete; used by tests
/// that assert on cascade cleanup.
#[derive(Default)]
pub struct MemoryBlobStore {
    inner: std::sync::Mutex<MemoryBlobs>,
}

#[derive(Default)]
struct MemoryBlobs {
    blobs: std::collections::HashMap<String, Bytes>,
    deleted: Vec<String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored_names(&self) -> Vec<String> {
        self.inner.lock().unwrap().blobs.keys().cloned().collect()
    }

    pub fn deleted_names(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().unwrap().blobs.contains_key(name)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, data: Bytes, original_name: &str) -> AppResult<String> {
        let name = generate_name(original_name);
        self.inner
            .lock()
            .unwrap()
            .blobs
            .insert(name.clone(), data);
        Ok(name)
    }

    async fn load(&self, name: &str) -> AppResult<Option<Bytes>> {
        Ok(self.inner.lock().unwrap().blobs.get(name).cloned())
    }

    async fn delete(&self, name: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.deleted.push(name.to_string());
        if inner.blobs.remove(name).is_none() {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
