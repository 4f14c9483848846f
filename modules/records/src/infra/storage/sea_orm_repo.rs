//! SeaORM-backed implementations of the domain ports.
//!
//! The repositories hold no connection of their own: every call receives the
//! unit of work's [`TxHandle`], which is either an open transaction or the
//! plain pool in pass-through mode.

use async_trait::async_trait;
use bio_db::{count_then_fetch, TxHandle};
use chrono::{DateTime, Utc};
use paging::{Page, ResolvedPagination};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::contract::model::{
    Application, ApplicationFilter, ApplicationPatch, ApplicationSubtype, ApplicationType,
    SubtypeFilter, User, UserFilter,
};
use crate::domain::error::DomainError;
use crate::domain::repo::{ApplicationsRepository, CatalogRepository, UsersRepository};
use crate::infra::storage::entity::{application, application_subtype, application_type, user};
use crate::infra::storage::filters;
use crate::infra::storage::mapper::photo_ids_to_json;

#[derive(Debug, Clone, Copy, Default)]
pub struct SeaOrmApplicationsRepository;

#[derive(Debug, Clone, Copy, Default)]
pub struct SeaOrmUsersRepository;

#[derive(Debug, Clone, Copy, Default)]
pub struct SeaOrmCatalogRepository;

#[async_trait]
impl ApplicationsRepository for SeaOrmApplicationsRepository {
    async fn insert(&self, tx: &TxHandle, app: &Application) -> Result<(), DomainError> {
        let m = application::ActiveModel {
            id: Set(app.id),
            created_at: Set(app.created_at),
            creator_id: Set(app.creator_id),
            updated_at: Set(app.updated_at),
            status: Set(app.status.as_str().to_string()),
            type_id: Set(app.type_id),
            subtype_id: Set(app.subtype_id),
            text: Set(app.text.clone()),
            photo_ids: Set(photo_ids_to_json(&app.photo_ids)),
            performer_id: Set(app.performer_id),
            performer_time: Set(app.performer_time),
        };
        application::Entity::insert(m)
            .exec_without_returning(tx)
            .await?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        tx: &TxHandle,
        id: Uuid,
    ) -> Result<Option<Application>, DomainError> {
        application::Entity::find_by_id(id)
            .one(tx)
            .await?
            .map(Application::try_from)
            .transpose()
    }

    async fn update(
        &self,
        tx: &TxHandle,
        id: Uuid,
        patch: &ApplicationPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let set = filters::application_update(patch, updated_at).ok_or(DomainError::NoOpUpdate)?;
        let res = application::Entity::update_many()
            .set(set)
            .filter(application::Column::Id.eq(id))
            .exec(tx)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn list(
        &self,
        tx: &TxHandle,
        filter: &ApplicationFilter,
        page: &ResolvedPagination,
    ) -> Result<Page<Application>, DomainError> {
        let select = application::Entity::find()
            .join(JoinType::InnerJoin, application::Relation::ApplicationType.def())
            .filter(filters::application_condition(filter));
        let rows = count_then_fetch(
            tx,
            select,
            page,
            application::Column::CreatedAt,
            application::Column::Id,
        )
        .await?;
        rows.try_map_items(Application::try_from)
    }
}

#[async_trait]
impl UsersRepository for SeaOrmUsersRepository {
    async fn insert(&self, tx: &TxHandle, u: &User) -> Result<(), DomainError> {
        let m = user::ActiveModel {
            id: Set(u.id),
            created_at: Set(u.created_at),
            first_name: Set(u.first_name.clone()),
            last_name: Set(u.last_name.clone()),
            role: Set(u.role.clone()),
            phone: Set(u.phone.clone()),
            deleted_at: Set(None),
        };
        user::Entity::insert(m).exec_without_returning(tx).await?;
        Ok(())
    }

    async fn find_active(&self, tx: &TxHandle, id: Uuid) -> Result<Option<User>, DomainError> {
        let found = user::Entity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(tx)
            .await?;
        Ok(found.map(Into::into))
    }

    async fn list(
        &self,
        tx: &TxHandle,
        filter: &UserFilter,
        page: &ResolvedPagination,
    ) -> Result<Page<User>, DomainError> {
        let select = user::Entity::find().filter(filters::user_condition(filter));
        let rows =
            count_then_fetch(tx, select, page, user::Column::CreatedAt, user::Column::Id).await?;
        Ok(rows.map_items(User::from))
    }

    async fn soft_delete(
        &self,
        tx: &TxHandle,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let res = user::Entity::update_many()
            .col_expr(user::Column::DeletedAt, Expr::value(at))
            .filter(user::Column::Id.eq(id))
            .filter(user::Column::DeletedAt.is_null())
            .exec(tx)
            .await?;
        Ok(res.rows_affected > 0)
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmCatalogRepository {
    async fn list_types(
        &self,
        tx: &TxHandle,
        page: &ResolvedPagination,
    ) -> Result<Page<ApplicationType>, DomainError> {
        let rows = count_then_fetch(
            tx,
            application_type::Entity::find(),
            page,
            application_type::Column::Title,
            application_type::Column::Id,
        )
        .await?;
        Ok(rows.map_items(ApplicationType::from))
    }

    async fn list_subtypes(
        &self,
        tx: &TxHandle,
        filter: &SubtypeFilter,
        page: &ResolvedPagination,
    ) -> Result<Page<ApplicationSubtype>, DomainError> {
        let select = application_subtype::Entity::find()
            .join(
                JoinType::InnerJoin,
                application_subtype::Relation::ApplicationType.def(),
            )
            .filter(filters::subtype_condition(filter));
        let rows = count_then_fetch(
            tx,
            select,
            page,
            application_subtype::Column::Title,
            application_subtype::Column::Id,
        )
        .await?;
        Ok(rows.map_items(ApplicationSubtype::from))
    }
}
