//! Persisted bot state
//!
//! Everything the bot must remember across restarts is a small JSON value under a fixed
//! key: settings, the update cursor, the dedup window, the in-flight marker and the
//! operator log. [`StateRepository`] gives those keys types; the backing
//! [`KeyValueStore`] is SQLite in production and [`MemoryStore`] in tests.

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{BotSettings, LogEntry};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// SQLite-backed state store
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(path: &str) -> Result<Self> {
        let path = shellexpand::tilde(path).into_owned();
        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| crate::error::BotError::Internal(format!("create {}: {}", parent.display(), e)))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        tracing::debug!("State database ready at {}", path);
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.map(|(v,)| v))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_state (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

const KEY_SETTINGS: &str = "settings";
const KEY_CURSOR: &str = "last_update_id";
const KEY_DEDUP: &str = "processed_ids";
const KEY_MARKER: &str = "processing_marker";
const KEY_LOGS: &str = "log_buffer";

/// Typed access to the persisted keys
#[derive(Clone)]
pub struct StateRepository {
    store: Arc<dyn KeyValueStore>,
}

impl StateRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable state under '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw).await
    }

    pub async fn load_settings(&self) -> Result<Option<BotSettings>> {
        self.get_json(KEY_SETTINGS).await
    }

    pub async fn save_settings(&self, settings: &BotSettings) -> Result<()> {
        self.set_json(KEY_SETTINGS, settings).await
    }

    /// Last update id seen, 0 when nothing was ever polled
    pub async fn cursor(&self) -> Result<i64> {
        Ok(self.get_json(KEY_CURSOR).await?.unwrap_or(0))
    }

    pub async fn set_cursor(&self, cursor: i64) -> Result<()> {
        self.set_json(KEY_CURSOR, &cursor).await
    }

    pub async fn dedup_ids(&self) -> Result<Vec<String>> {
        Ok(self.get_json(KEY_DEDUP).await?.unwrap_or_default())
    }

    pub async fn save_dedup_ids(&self, ids: &[String]) -> Result<()> {
        self.set_json(KEY_DEDUP, ids).await
    }

    pub async fn marker(&self) -> Result<Option<String>> {
        self.get_json(KEY_MARKER).await
    }

    pub async fn set_marker(&self, key: &str) -> Result<()> {
        self.set_json(KEY_MARKER, key).await
    }

    pub async fn clear_marker(&self) -> Result<()> {
        self.store.delete(KEY_MARKER).await
    }

    pub async fn log_entries(&self) -> Result<Vec<LogEntry>> {
        Ok(self.get_json(KEY_LOGS).await?.unwrap_or_default())
    }

    pub async fn save_log_entries(&self, entries: &[LogEntry]) -> Result<()> {
        self.set_json(KEY_LOGS, entries).await
    }
}
