// SPDX-License-Identifier: MIT
//! SQLite persistence.
//!
//! One [`Storage`] owns the connection pool; the per-domain stores
//! ([`TaskStore`], [`WorkbasketStore`], [`HistoryStore`]) are cheap handles
//! sharing it. The database runs in WAL mode with `synchronous = NORMAL`;
//! schema is owned by the embedded migrations under `src/storage/migrations`.

pub mod history;
pub mod tasks;
pub mod workbaskets;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use tracing::info;

use crate::config::StorageConfig;
use crate::error::{Error, Result};

pub use history::{HistoryStore, TaskHistoryEvent};
pub use tasks::TaskStore;
pub use workbaskets::WorkbasketStore;

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking callers indefinitely.
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute a future with the standard query timeout.
pub(crate) async fn with_timeout<T>(
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::QueryTimeout(QUERY_TIMEOUT.as_secs())),
    }
}

/// INTEGER microsecond representation used by every timestamp column.
pub(crate) fn ts_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

pub(crate) fn ts_from_micros(micros: i64, column: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        Error::Database(sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: format!("timestamp out of range: {micros}").into(),
        })
    })
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_config(data_dir, &StorageConfig::default()).await
    }

    /// Create storage under `data_dir` with the given tuning applied.
    ///
    /// Statements slower than `slow_query_threshold_ms` are logged at WARN;
    /// set it to 0 to disable slow-statement logging.
    pub async fn new_with_config(data_dir: &Path, config: &StorageConfig) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("taskgate.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true)
                .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        if config.slow_query_threshold_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                Duration::from_millis(config.slow_query_threshold_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        info!(path = %db_path.display(), "storage ready");
        Ok(Self { pool })
    }

    /// In-memory database for tests and ephemeral embedders.
    ///
    /// The pool is pinned to a single connection: every additional SQLite
    /// `:memory:` connection would open its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap, Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub fn tasks(&self) -> TaskStore {
        TaskStore::new(self.pool.clone())
    }

    pub fn workbaskets(&self) -> WorkbasketStore {
        WorkbasketStore::new(self.pool.clone())
    }

    pub fn history(&self) -> HistoryStore {
        HistoryStore::new(self.pool.clone())
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("src/storage/migrations").run(pool).await?;
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
