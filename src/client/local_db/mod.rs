//! # Local Database Module
//!
//! Durable key-value storage for the offline core. Everything the device
//! must remember across restarts (queued actions, dead letters, cached
//! collections, the last sync time) is a JSON string under a fixed key.
//!
//! ## Key Components
//!
//! - `KeyValueStore`: async get/set/multi-get/multi-remove contract
//! - `LocalDatabase`: SQLite implementation (WAL, one `kv_store` table)
//! - `MemoryStore`: in-process implementation for tests and previews
//! - `keys`: the storage keys in use
//!
//! ## Usage
//!
//! ```rust,no_run
//! use siteforce_offline::client::local_db::{keys, KeyValueStore, LocalDatabase};
//!
//! # async fn example() -> Result<(), siteforce_offline::client::error::StorageError> {
//! let db = LocalDatabase::new().await?;
//! db.set(keys::LAST_SYNC_TIME, "\"2024-01-01T00:00:00Z\"").await?;
//! let value = db.get(keys::LAST_SYNC_TIME).await?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod schema;

pub use memory::MemoryStore;

use crate::client::error::StorageError;
use crate::shared::AppConfig;
use futures_util::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Result type for local storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage keys
pub mod keys {
    /// JSON array of pending actions, FIFO order
    pub const QUEUED_ACTIONS: &str = "queued_actions";
    /// JSON array of dead-lettered actions
    pub const FAILED_ACTIONS: &str = "failed_actions";
    /// RFC 3339 timestamp of the last successful drain
    pub const LAST_SYNC_TIME: &str = "last_sync_time";

    /// Key holding the cached snapshot for a domain, e.g. `cached_tasks`
    pub fn cached(domain: &str) -> String {
        format!("cached_{}", domain)
    }
}

/// Async key-value storage
///
/// Values are opaque strings; callers store JSON.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Values for `keys`, in the same order, `None` for missing keys
    fn multi_get<'a>(&'a self, keys: &'a [String])
        -> BoxFuture<'a, Result<Vec<(String, Option<String>)>>>;

    fn multi_remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<()>>;
}

/// Read and deserialize a JSON value
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON value
pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

/// SQLite-backed key-value store
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create the database at the platform data directory
    pub async fn new() -> Result<Self> {
        Self::open(&Self::default_db_path()).await
    }

    /// Open the database at the configured `db_path`, or the default one
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        match &config.db_path {
            Some(path) => Self::open(path).await,
            None => Self::new().await,
        }
    }

    /// Open or create the database at `path`
    ///
    /// Creates the parent directory if needed and initializes the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        tracing::debug!("Opened local database at {}", path.display());

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Private in-memory database, gone when dropped
    pub async fn in_memory() -> Result<Self> {
        // A single connection; every new in-memory connection is a new database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Get database file path
    ///
    /// Uses the system's data directory when available.
    pub fn default_db_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("siteforce");
        path.push("offline.db");
        path
    }

    /// Run any pending migrations
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(schema::CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await?;

        let current_version: (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        if !schema::needs_migration(current_version.0) {
            return Ok(());
        }

        for version in schema::get_pending_migrations(current_version.0) {
            let Some(sql) = schema::migration_sql(version) else {
                continue;
            };

            let mut tx = self.pool.begin().await?;
            sqlx::query(sql).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!("Applied local database migration {}", version);
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database statistics
    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS key_count, COALESCE(SUM(LENGTH(value)), 0) AS bytes FROM kv_store",
        )
        .fetch_one(&self.pool)
        .await?;

        let key_count: i64 = row.try_get("key_count")?;
        let bytes: i64 = row.try_get("bytes")?;

        Ok(DatabaseStats {
            key_count: key_count as u64,
            total_value_bytes: bytes as u64,
        })
    }
}

impl KeyValueStore for LocalDatabase {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        async move {
            let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

            match row {
                Some(row) => Ok(Some(row.try_get("value")?)),
                None => Ok(None),
            }
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            sqlx::query(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(())
        }
        .boxed()
    }

    fn multi_get<'a>(
        &'a self,
        keys: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<(String, Option<String>)>>> {
        async move {
            if keys.is_empty() {
                return Ok(Vec::new());
            }

            let mut query =
                QueryBuilder::<Sqlite>::new("SELECT key, value FROM kv_store WHERE key IN (");
            let mut separated = query.separated(", ");
            for key in keys {
                separated.push_bind(key.as_str());
            }
            separated.push_unseparated(")");

            let rows = query.build().fetch_all(&self.pool).await?;
            let mut found = HashMap::with_capacity(rows.len());
            for row in rows {
                let key: String = row.try_get("key")?;
                let value: String = row.try_get("value")?;
                found.insert(key, value);
            }

            Ok(keys
                .iter()
                .map(|key| (key.clone(), found.remove(key)))
                .collect())
        }
        .boxed()
    }

    fn multi_remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut tx = self.pool.begin().await?;
            for key in keys {
                sqlx::query("DELETE FROM kv_store WHERE key = ?")
                    .bind(key)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok(())
        }
        .boxed()
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// Number of stored keys
    pub key_count: u64,
    /// Sum of stored value lengths
    pub total_value_bytes: u64,
}
