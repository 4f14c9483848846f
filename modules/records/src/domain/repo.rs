use async_trait::async_trait;
use bio_db::TxHandle;
use chrono::{DateTime, Utc};
use paging::{Page, ResolvedPagination};
use uuid::Uuid;

use crate::contract::model::{
    Application, ApplicationFilter, ApplicationPatch, ApplicationSubtype, ApplicationType,
    SubtypeFilter, User, UserFilter,
};
use crate::domain::error::DomainError;

// Every port runs its statements on the unit of work's handle, so one service
// call sees one consistent transaction (or the plain pool in pass-through mode).

/// Port for application storage.
#[async_trait]
pub trait ApplicationsRepository: Send + Sync {
    async fn insert(&self, tx: &TxHandle, app: &Application) -> Result<(), DomainError>;

    async fn find_by_id(&self, tx: &TxHandle, id: Uuid)
        -> Result<Option<Application>, DomainError>;

    /// Write the set fields of `patch` plus `updated_at`. Returns `false` when no
    /// row has this id.
    async fn update(
        &self,
        tx: &TxHandle,
        id: Uuid,
        patch: &ApplicationPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    async fn list(
        &self,
        tx: &TxHandle,
        filter: &ApplicationFilter,
        page: &ResolvedPagination,
    ) -> Result<Page<Application>, DomainError>;
}

/// Port for user storage. Soft-deleted rows are invisible to every read.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn insert(&self, tx: &TxHandle, user: &User) -> Result<(), DomainError>;

    async fn find_active(&self, tx: &TxHandle, id: Uuid) -> Result<Option<User>, DomainError>;

    async fn list(
        &self,
        tx: &TxHandle,
        filter: &UserFilter,
        page: &ResolvedPagination,
    ) -> Result<Page<User>, DomainError>;

    /// Stamp `deleted_at`. Returns `false` when no live row has this id.
    async fn soft_delete(
        &self,
        tx: &TxHandle,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;
}

/// Port for the read-only type/subtype catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_types(
        &self,
        tx: &TxHandle,
        page: &ResolvedPagination,
    ) -> Result<Page<ApplicationType>, DomainError>;

    async fn list_subtypes(
        &self,
        tx: &TxHandle,
        filter: &SubtypeFilter,
        page: &ResolvedPagination,
    ) -> Result<Page<ApplicationSubtype>, DomainError>;
}
