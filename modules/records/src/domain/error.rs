use bio_db::DbError;
use paging::PageError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{field} {requested} exceeds maximum of {max}")]
    InvalidPagination {
        field: &'static str,
        requested: u64,
        max: u64,
    },

    #[error("unsupported sort key: {key}")]
    InvalidSortKey { key: String },

    #[error("constraint violated: {message}")]
    Constraint { message: String },

    #[error("update carries no fields")]
    NoOpUpdate,

    #[error("failed to begin transaction: {message}")]
    Transaction { message: String },

    #[error("failed to commit transaction: {message}")]
    Commit { message: String },

    #[error("cannot decode stored row: {message}")]
    Decode { message: String },

    #[error("operation canceled")]
    ContextCanceled,

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Errors the caller caused, as opposed to storage faults.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DomainError::NotFound { .. }
                | DomainError::InvalidPagination { .. }
                | DomainError::InvalidSortKey { .. }
                | DomainError::NoOpUpdate
                | DomainError::Validation { .. }
        )
    }
}

impl From<PageError> for DomainError {
    fn from(e: PageError) -> Self {
        match e {
            PageError::InvalidLimit { requested, max } => DomainError::InvalidPagination {
                field: "limit",
                requested,
                max,
            },
            PageError::InvalidOffset { requested, max } => DomainError::InvalidPagination {
                field: "offset",
                requested,
                max,
            },
            PageError::InvalidSortKey { key } => DomainError::InvalidSortKey { key },
        }
    }
}

impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message))
            | Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
                return DomainError::Constraint { message }
            }
            _ => {}
        }
        match e {
            DbErr::Type(message) | DbErr::Json(message) => DomainError::Decode { message },
            e @ DbErr::TryIntoErr { .. } => DomainError::decode(e.to_string()),
            other => DomainError::storage(other.to_string()),
        }
    }
}

impl From<DbError> for DomainError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Transaction(inner) => DomainError::Transaction {
                message: inner.to_string(),
            },
            DbError::Commit(inner) => DomainError::Commit {
                message: inner.to_string(),
            },
            DbError::Canceled => DomainError::ContextCanceled,
            DbError::Sea(inner) => DomainError::from(inner),
            other => DomainError::storage(other.to_string()),
        }
    }
}
