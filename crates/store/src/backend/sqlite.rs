//! SQLite-backed medium for the desktop/CLI build.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{StorageBackend, entry_cost};
use crate::error::BackendError;

/// One `kv_store` table holding namespaced keys and serialized envelopes.
///
/// The pool is capped at a single connection: writes are serialised, and an
/// in-memory database stays the same database across calls. File databases
/// run in WAL mode so several processes can share one store.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
    quota: Option<u64>,
}

impl SqliteBackend {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &Path, quota: Option<u64>) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory at {:?}", parent))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite store at {:?}", path))?;

        Self::init(pool, quota).await
    }

    /// Open the database at the default location, `{data_dir}/matchng/store.db`.
    pub async fn open_default(quota: Option<u64>) -> anyhow::Result<Self> {
        let path = default_db_path()?;
        Self::open(&path, quota).await
    }

    /// Private in-memory database; gone when the backend is dropped.
    pub async fn in_memory(quota: Option<u64>) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory SQLite URL")?;
        // The database lives exactly as long as its one connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("failed to open in-memory SQLite store")?;

        Self::init(pool, quota).await
    }

    async fn init(pool: SqlitePool, quota: Option<u64>) -> anyhow::Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create kv_store table")?;

        Ok(Self { pool, quota })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(io)?;

        match row {
            Some(row) => Ok(Some(row.try_get::<String, _>("value").map_err(io)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut tx = self.pool.begin().await.map_err(io)?;

        if let Some(quota) = self.quota {
            let rows = sqlx::query("SELECT key, value FROM kv_store WHERE key != ?1")
                .bind(key)
                .fetch_all(&mut *tx)
                .await
                .map_err(io)?;

            let mut needed = entry_cost(key, value);
            for row in rows {
                let k: String = row.try_get("key").map_err(io)?;
                let v: String = row.try_get("value").map_err(io)?;
                needed += entry_cost(&k, &v);
            }
            if needed > quota {
                return Err(BackendError::QuotaExceeded { needed, quota });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await
        .map_err(io)?;

        tx.commit().await.map_err(io)
    }

    async fn remove(&self, key: &str) -> Result<(), BackendError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(io)?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, BackendError> {
        let rows = sqlx::query("SELECT key FROM kv_store ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(io)?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("key").map_err(io))
            .collect()
    }
}

fn io(err: sqlx::Error) -> BackendError {
    BackendError::Io(err.to_string())
}

/// `{app_data_dir}/matchng/store.db`, falling back to `~/.local/share`.
fn default_db_path() -> anyhow::Result<PathBuf> {
    let mut dir = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    dir.push("matchng");
    dir.push("store.db");
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove_round_trip() {
        let backend = SqliteBackend::in_memory(None).await.unwrap();
        backend.set("matchNG:v1:a", "1").await.unwrap();
        backend.set("matchNG:v1:a", "2").await.unwrap();
        assert_eq!(backend.get("matchNG:v1:a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(backend.keys().await.unwrap(), vec!["matchNG:v1:a".to_string()]);

        backend.remove("matchNG:v1:a").await.unwrap();
        assert_eq!(backend.get("matchNG:v1:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn quota_is_enforced_inside_the_transaction() {
        let backend = SqliteBackend::in_memory(Some(20)).await.unwrap();
        backend.set("k", "1234").await.unwrap();
        let err = backend.set("j", "12345").await.unwrap_err();
        assert!(matches!(err, BackendError::QuotaExceeded { .. }));
        assert_eq!(backend.get("j").await.unwrap(), None);
    }
}
