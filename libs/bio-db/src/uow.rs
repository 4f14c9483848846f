//! Unit of Work: one transaction per logical operation.
//!
//! A service begins a [`TxHandle`], passes `&tx` to every repository call that
//! makes up the operation, and finishes it exactly once: commit on success,
//! rollback on any error. Rollback failures are logged and swallowed so the
//! caller always sees the error that caused the rollback.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, ExecResult,
    IsolationLevel, QueryResult, Statement, TransactionTrait,
};
use tokio_util::sync::CancellationToken;

use crate::DbError;

/// Factory for [`TxHandle`]s over one connection pool.
///
/// The connection is shared through an `Arc`: `DatabaseConnection` is not
/// `Clone` when SeaORM's `mock` feature is on.
#[derive(Clone, Debug)]
pub struct UnitOfWork {
    conn: Arc<DatabaseConnection>,
    transactional: bool,
}

impl UnitOfWork {
    /// Unit of work that opens a real transaction per operation.
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self {
            conn,
            transactional: true,
        }
    }

    /// Unit of work for connections without transaction support. Handles run
    /// statements directly on the pool; commit and rollback do nothing.
    pub fn pass_through(conn: Arc<DatabaseConnection>) -> Self {
        Self {
            conn,
            transactional: false,
        }
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }


    /// Open a handle for one operation.
    ///
    /// PostgreSQL transactions run at READ COMMITTED. SQLite has no per-transaction
    /// isolation setting and serializes writers on its own.
    pub async fn begin(&self, cancel: &CancellationToken) -> Result<TxHandle, DbError> {
        if cancel.is_cancelled() {
            return Err(DbError::Canceled);
        }
        if !self.transactional {
            return Ok(TxHandle::Direct(Arc::clone(&self.conn)));
        }

        let isolation = match self.conn.get_database_backend() {
            DbBackend::Postgres => Some(IsolationLevel::ReadCommitted),
            _ => None,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DbError::Canceled),
            res = self.conn.begin_with_config(isolation, None) => {
                res.map(TxHandle::Tx).map_err(DbError::Transaction)
            }
        }
    }
}

/// Connection scope for one operation. Implements [`ConnectionTrait`], so any
/// SeaORM query can execute against it.
pub enum TxHandle {
    Tx(DatabaseTransaction),
    Direct(Arc<DatabaseConnection>),
}

impl fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxHandle::Tx(_) => f.write_str("TxHandle::Tx"),
            TxHandle::Direct(_) => f.write_str("TxHandle::Direct"),
        }
    }
}

impl TxHandle {
    pub fn is_transactional(&self) -> bool {
        matches!(self, TxHandle::Tx(_))
    }

    /// Make the operation's writes durable.
    pub async fn commit(self) -> Result<(), DbError> {
        match self {
            TxHandle::Tx(tx) => tx.commit().await.map_err(DbError::Commit),
            TxHandle::Direct(_) => Ok(()),
        }
    }

    /// Discard the operation's writes. Never fails: an error here is logged
    /// and dropped.
    pub async fn rollback(self) {
        if let TxHandle::Tx(tx) = self {
            if let Err(e) = tx.rollback().await {
                tracing::error!(error = %e, "transaction rollback failed");
            }
        }
    }

    /// Finish the operation: commit on `Ok`, roll back on `Err`.
    ///
    /// A failed commit replaces the successful result with the commit error.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        match result {
            Ok(v) => {
                self.commit().await?;
                Ok(v)
            }
            Err(e) => {
                self.rollback().await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ConnectionTrait for TxHandle {
    fn get_database_backend(&self) -> DbBackend {
        match self {
            TxHandle::Tx(tx) => tx.get_database_backend(),
            TxHandle::Direct(c) => c.get_database_backend(),
        }
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        match self {
            TxHandle::Tx(tx) => tx.execute(stmt).await,
            TxHandle::Direct(c) => c.execute(stmt).await,
        }
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        match self {
            TxHandle::Tx(tx) => tx.execute_unprepared(sql).await,
            TxHandle::Direct(c) => c.execute_unprepared(sql).await,
        }
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        match self {
            TxHandle::Tx(tx) => tx.query_one(stmt).await,
            TxHandle::Direct(c) => c.query_one(stmt).await,
        }
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        match self {
            TxHandle::Tx(tx) => tx.query_all(stmt).await,
            TxHandle::Direct(c) => c.query_all(stmt).await,
        }
    }

    fn support_returning(&self) -> bool {
        match self {
            TxHandle::Tx(tx) => tx.support_returning(),
            TxHandle::Direct(c) => c.support_returning(),
        }
    }

    fn is_mock_connection(&self) -> bool {
        match self {
            TxHandle::Tx(tx) => tx.is_mock_connection(),
            TxHandle::Direct(c) => c.is_mock_connection(),
        }
    }
}

/// Run `fut` unless `cancel` fires first, in which case the future is dropped
/// and [`DbError::Canceled`] is returned.
pub async fn cancellable<T, E, F>(cancel: &CancellationToken, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DbError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DbError::Canceled.into()),
        res = fut => res,
    }
}
