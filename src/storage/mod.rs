//! Durable client-side storage.
//!
//! Everything the portal persists lives under one key namespace so that a
//! logout can remove it with a single prefix delete.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::AppError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage key layout.
pub mod keys {
    pub const NAMESPACE: &str = "exam_app:";
    pub const USER: &str = "exam_app:user";
    pub const AUTH_TOKEN: &str = "exam_app:auth_token";
    pub const PAID_EXAM_IDS: &str = "exam_app:paid_exam_ids";
    pub const EXAM_PRICES: &str = "exam_app:exam_prices";
    pub const RESULTS_PREFIX: &str = "exam_app:results_";

    pub fn results(user_id: &str) -> String {
        format!("{}{}", RESULTS_PREFIX, user_id)
    }
}

/// A string key/value store in the manner of browser local storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Writes all entries or none.
    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), AppError>;

    async fn remove(&self, key: &str) -> Result<(), AppError>;

    /// Removes every key starting with `prefix` in one step. Returns how many went away.
    async fn remove_prefix(&self, prefix: &str) -> Result<u64, AppError>;

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppError>;
}

/// Reads and decodes a JSON value. A corrupt value is logged and treated as absent.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, AppError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Ignoring unreadable value under {}: {}", key, e);
            Ok(None)
        }
    }
}

pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), AppError> {
    let raw = serde_json::to_string(value)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    store.set(key, &raw).await
}
