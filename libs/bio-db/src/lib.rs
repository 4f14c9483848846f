//! Database plumbing for the bio server.
//!
//! The crate owns three concerns:
//! - [`DbHandle`]: a pooled SeaORM connection built from a DSN (PostgreSQL or SQLite).
//! - [`UnitOfWork`] / [`TxHandle`]: begin, commit and best-effort rollback of one
//!   logical operation, with a pass-through mode for connections that should not
//!   open transactions.
//! - [`query::count_then_fetch`]: the count-then-page list protocol shared by every
//!   list operation.
//!
//! ```rust,no_run
//! # async fn demo() -> bio_db::Result<()> {
//! use bio_db::{ConnectOpts, DbHandle};
//! use tokio_util::sync::CancellationToken;
//!
//! let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
//! let uow = db.unit_of_work(true);
//! let tx = uow.begin(&CancellationToken::new()).await?;
//! tx.commit().await?;
//! db.close().await;
//! # Ok(())
//! # }
//! ```

pub mod query;
pub mod uow;

pub use query::{apply_page, count_then_fetch};
pub use uow::{cancellable, TxHandle, UnitOfWork};

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::{DatabaseConnection, SqlxPostgresConnector, SqlxSqliteConnector};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Opening a transaction failed.
    #[error("failed to begin transaction: {0}")]
    Transaction(#[source] sea_orm::DbErr),

    /// The transaction could not be committed; its writes are not durable.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] sea_orm::DbErr),

    /// The caller's cancellation signal fired before the work finished.
    #[error("operation canceled")]
    Canceled,

    /// A resolved order column does not exist on the queried entity.
    #[error("unknown order column: {0}")]
    UnknownColumn(String),
}

impl DbError {
    /// The underlying SeaORM error, if this error wraps one.
    pub fn as_db_err(&self) -> Option<&sea_orm::DbErr> {
        match self {
            DbError::Sea(e) | DbError::Transaction(e) | DbError::Commit(e) => Some(e),
            _ => None,
        }
    }
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Pool options. Each driver applies the subset it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// SQLite lock wait. Ignored for PostgreSQL.
    pub busy_timeout: Duration,
    /// For SQLite file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            busy_timeout: Duration::from_millis(5000),
            create_sqlite_dirs: true,
        }
    }
}

/// Main handle.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    dsn: String,
    sea: Arc<DatabaseConnection>,
}

impl DbHandle {
    /// Detect engine by DSN scheme. The tail (credentials etc.) is not inspected.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_string()))
        }
    }

    /// Connect and build handle.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        let sea = match engine {
            DbEngine::Postgres => {
                let mut o = PgPoolOptions::new();
                if let Some(n) = opts.max_conns {
                    o = o.max_connections(n);
                }
                if let Some(n) = opts.min_conns {
                    o = o.min_connections(n);
                }
                if let Some(t) = opts.acquire_timeout {
                    o = o.acquire_timeout(t);
                }
                let pool = o.connect(dsn).await?;
                SqlxPostgresConnector::from_sqlx_postgres_pool(pool)
            }
            DbEngine::Sqlite => {
                let dsn = prepare_sqlite_path(dsn, opts.create_sqlite_dirs)?;
                let in_memory = is_memory_dsn(&dsn);

                let mut o = SqlitePoolOptions::new();
                if in_memory {
                    // Every pooled connection to `:memory:` would see its own empty
                    // database, so pin the pool to one long-lived connection.
                    o = o
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None);
                } else {
                    if let Some(n) = opts.max_conns {
                        o = o.max_connections(n);
                    }
                    if let Some(n) = opts.min_conns {
                        o = o.min_connections(n);
                    }
                }
                if let Some(t) = opts.acquire_timeout {
                    o = o.acquire_timeout(t);
                }

                let busy_ms = i64::try_from(opts.busy_timeout.as_millis()).unwrap_or(i64::MAX);
                o = o.after_connect(move |conn, _meta| {
                    Box::pin(async move {
                        let journal = if in_memory { "DELETE" } else { "WAL" };
                        sqlx::query(&format!("PRAGMA journal_mode = {journal}"))
                            .execute(&mut *conn)
                            .await?;
                        sqlx::query("PRAGMA synchronous = NORMAL")
                            .execute(&mut *conn)
                            .await?;
                        sqlx::query("PRAGMA foreign_keys = ON")
                            .execute(&mut *conn)
                            .await?;
                        if !in_memory {
                            sqlx::query(&format!("PRAGMA busy_timeout = {busy_ms}"))
                                .execute(&mut *conn)
                                .await?;
                        }
                        Ok(())
                    })
                });

                let connect = SqliteConnectOptions::from_str(&dsn)?.create_if_missing(true);
                let pool = o.connect_with(connect).await?;
                SqlxSqliteConnector::from_sqlx_sqlite_pool(pool)
            }
        };

        tracing::debug!(engine = ?engine, "database pool ready");
        Ok(Self {
            engine,
            dsn: dsn.to_string(),
            sea: Arc::new(sea),
        })
    }

    /// Graceful pool close. Only the last owner of the pool can close it;
    /// otherwise the pool shuts down when the remaining owners drop it.
    pub async fn close(self) {
        match Arc::try_unwrap(self.sea) {
            Ok(sea) => {
                if let Err(e) = sea.close().await {
                    tracing::warn!(error = %e, "error while closing database pool");
                }
            }
            Err(shared) => tracing::warn!(
                owners = Arc::strong_count(&shared),
                "database pool still shared; skipping explicit close"
            ),
        }
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Shared SeaORM connection.
    pub fn sea(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.sea)
    }

    pub fn seaorm(&self) -> &DatabaseConnection {
        &self.sea
    }

    /// Build a unit of work over this pool. With `transactional == false` every
    /// statement runs directly on the pool and commit/rollback are no-ops.
    pub fn unit_of_work(&self, transactional: bool) -> UnitOfWork {
        if transactional {
            UnitOfWork::new(self.sea())
        } else {
            UnitOfWork::pass_through(self.sea())
        }
    }
}

// ===================== helpers =====================

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> Result<String> {
    if !create_dirs || is_memory_dsn(dsn) {
        return Ok(dsn.to_string());
    }

    // Handles "sqlite:/path" and "sqlite://path". URI forms like
    // "sqlite:file:memdb?..." have no directory to create.
    let raw = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);

    if !raw.starts_with("file:") {
        let path = raw.split('?').next().unwrap_or(raw);
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                // One-time blocking call during startup.
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    Ok(dsn.to_string())
}
