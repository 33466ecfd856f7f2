//! Session cache port: opaque token -> user id, with TTL expiry.
//!
//! The cache is injectable so a networked key-value store can stand in;
//! the in-process implementation below is the default.

use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::AppResult;

/// Prefix for session keys in the cache.
pub const AUTH_KEY_PREFIX: &str = "auth_";

/// Cache key for a session token.
pub fn auth_key(token: &str) -> String {
    format!("{AUTH_KEY_PREFIX}{token}")
}

/// Generate a cryptographically random 32-byte hex token.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Map `key` to `user_id` for `ttl`.
    async fn set(&self, key: &str, user_id: &str, ttl: Duration) -> AppResult<()>;

    /// Resolve `key`; expired or absent entries are None.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Remove `key`. Returns false when the key was absent.
    async fn delete(&self, key: &str) -> AppResult<bool>;
}

/// In-process session cache with lazy expiry: stale entries are dropped
/// when they are next looked up.
#[derive(Default)]
pub struct MemorySessionCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn set(&self, key: &str, user_id: &str, ttl: Duration) -> AppResult<()> {
        let expires = Instant::now() + ttl;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (user_id.to_string(), expires));
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((user_id, expires)) if *expires > Instant::now() => Ok(Some(user_id.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }
}
