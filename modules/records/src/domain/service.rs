use std::sync::Arc;

use bio_db::{cancellable, UnitOfWork};
use chrono::{DateTime, SubsecRound, Utc};
use paging::{Page, PageRequest, PaginationPolicy, SortRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::RecordsConfig;
use crate::contract::model::{
    Application, ApplicationFilter, ApplicationPatch, ApplicationStatus, ApplicationSubtype,
    ApplicationType, NewApplication, NewUser, SubtypeFilter, User, UserFilter,
};
use crate::domain::error::DomainError;
use crate::domain::repo::{ApplicationsRepository, CatalogRepository, UsersRepository};

/// Domain service for applications, users and the type catalog.
///
/// Every operation runs inside one unit of work: begin, do the repository calls
/// on the same handle, then commit on success or roll back on any failure
/// (cancellation included). Paging input is validated before anything touches
/// the database.
#[derive(Clone)]
pub struct Service {
    uow: UnitOfWork,
    applications: Arc<dyn ApplicationsRepository>,
    users: Arc<dyn UsersRepository>,
    catalog: Arc<dyn CatalogRepository>,
    config: ServiceConfig,
}

/// Paging policies, one per listing.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub applications: PaginationPolicy,
    pub users: PaginationPolicy,
    pub catalog: PaginationPolicy,
}

impl From<&RecordsConfig> for ServiceConfig {
    fn from(cfg: &RecordsConfig) -> Self {
        Self {
            applications: cfg.applications_policy(),
            users: cfg.users_policy(),
            catalog: cfg.catalog_policy(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from(&RecordsConfig::default())
    }
}

/// Timestamps are kept at microsecond precision so they survive a round trip
/// through PostgreSQL unchanged.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl Service {
    pub fn new(
        uow: UnitOfWork,
        applications: Arc<dyn ApplicationsRepository>,
        users: Arc<dyn UsersRepository>,
        catalog: Arc<dyn CatalogRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            uow,
            applications,
            users,
            catalog,
            config,
        }
    }

    // --- applications ---

    #[instrument(
        name = "records.service.create_application",
        skip(self, new_app, cancel),
        fields(creator_id = %new_app.creator_id)
    )]
    pub async fn create_application(
        &self,
        new_app: NewApplication,
        cancel: &CancellationToken,
    ) -> Result<Application, DomainError> {
        info!("Creating new application");
        if new_app.text.trim().is_empty() {
            return Err(DomainError::validation("text", "must not be empty"));
        }

        let at = now();
        let app = Application {
            id: Uuid::new_v4(),
            created_at: at,
            creator_id: new_app.creator_id,
            updated_at: at,
            status: ApplicationStatus::Created,
            type_id: new_app.type_id,
            subtype_id: new_app.subtype_id,
            text: new_app.text,
            photo_ids: new_app.photo_ids,
            performer_id: None,
            performer_time: None,
        };

        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async {
            self.applications.insert(&tx, &app).await?;
            self.applications
                .find_by_id(&tx, app.id)
                .await?
                .ok_or_else(|| DomainError::not_found("application", app.id))
        })
        .await;
        let created = tx.finish(res).await?;

        info!(application_id = %created.id, "Successfully created application");
        Ok(created)
    }

    #[instrument(name = "records.service.get_application", skip(self, cancel), fields(application_id = %id))]
    pub async fn get_application(
        &self,
        id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Application, DomainError> {
        debug!("Getting application by id");
        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async {
            self.applications
                .find_by_id(&tx, id)
                .await?
                .ok_or_else(|| DomainError::not_found("application", id))
        })
        .await;
        tx.finish(res).await
    }

    #[instrument(
        name = "records.service.list_applications",
        skip(self, filter, cancel),
        fields(limit = ?page.limit, offset = ?page.offset)
    )]
    pub async fn list_applications(
        &self,
        filter: ApplicationFilter,
        page: &PageRequest,
        sort: Option<&SortRequest>,
        cancel: &CancellationToken,
    ) -> Result<Page<Application>, DomainError> {
        let resolved = self.config.applications.resolve(page, sort)?;
        debug!(limit = resolved.limit, offset = resolved.offset, "Listing applications");

        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async {
            self.applications.list(&tx, &filter, &resolved).await
        })
        .await;
        let page = tx.finish(res).await?;

        debug!(total = page.total, returned = page.items.len(), "Listed applications");
        Ok(page)
    }

    #[instrument(name = "records.service.update_application", skip(self, patch, cancel), fields(application_id = %id))]
    pub async fn update_application(
        &self,
        id: Uuid,
        patch: ApplicationPatch,
        cancel: &CancellationToken,
    ) -> Result<Application, DomainError> {
        info!("Updating application");
        if patch.is_empty() {
            return Err(DomainError::NoOpUpdate);
        }

        let at = now();
        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async {
            if !self.applications.update(&tx, id, &patch, at).await? {
                return Err(DomainError::not_found("application", id));
            }
            self.applications
                .find_by_id(&tx, id)
                .await?
                .ok_or_else(|| DomainError::not_found("application", id))
        })
        .await;
        let updated = tx.finish(res).await?;

        info!("Successfully updated application");
        Ok(updated)
    }

    // --- catalog ---

    #[instrument(name = "records.service.list_application_types", skip(self, cancel))]
    pub async fn list_application_types(
        &self,
        page: &PageRequest,
        sort: Option<&SortRequest>,
        cancel: &CancellationToken,
    ) -> Result<Page<ApplicationType>, DomainError> {
        let resolved = self.config.catalog.resolve(page, sort)?;
        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async { self.catalog.list_types(&tx, &resolved).await }).await;
        tx.finish(res).await
    }

    #[instrument(name = "records.service.list_application_subtypes", skip(self, cancel))]
    pub async fn list_application_subtypes(
        &self,
        filter: SubtypeFilter,
        page: &PageRequest,
        sort: Option<&SortRequest>,
        cancel: &CancellationToken,
    ) -> Result<Page<ApplicationSubtype>, DomainError> {
        let resolved = self.config.catalog.resolve(page, sort)?;
        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async {
            self.catalog.list_subtypes(&tx, &filter, &resolved).await
        })
        .await;
        tx.finish(res).await
    }

    // --- users ---

    #[instrument(name = "records.service.create_user", skip(self, new_user, cancel))]
    pub async fn create_user(
        &self,
        new_user: NewUser,
        cancel: &CancellationToken,
    ) -> Result<User, DomainError> {
        info!("Creating new user");
        self.validate_new_user(&new_user)?;

        let user = User {
            id: Uuid::new_v4(),
            created_at: now(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            phone: new_user.phone,
        };

        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async {
            self.users.insert(&tx, &user).await?;
            self.users
                .find_active(&tx, user.id)
                .await?
                .ok_or_else(|| DomainError::not_found("user", user.id))
        })
        .await;
        let created = tx.finish(res).await?;

        info!(user_id = %created.id, "Successfully created user");
        Ok(created)
    }

    #[instrument(name = "records.service.get_user", skip(self, cancel), fields(user_id = %id))]
    pub async fn get_user(&self, id: Uuid, cancel: &CancellationToken) -> Result<User, DomainError> {
        debug!("Getting user by id");
        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async {
            self.users
                .find_active(&tx, id)
                .await?
                .ok_or_else(|| DomainError::not_found("user", id))
        })
        .await;
        tx.finish(res).await
    }

    #[instrument(
        name = "records.service.list_users",
        skip(self, filter, cancel),
        fields(limit = ?page.limit, offset = ?page.offset)
    )]
    pub async fn list_users(
        &self,
        filter: UserFilter,
        page: &PageRequest,
        sort: Option<&SortRequest>,
        cancel: &CancellationToken,
    ) -> Result<Page<User>, DomainError> {
        let resolved = self.config.users.resolve(page, sort)?;
        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async { self.users.list(&tx, &filter, &resolved).await }).await;
        let page = tx.finish(res).await?;

        debug!(total = page.total, returned = page.items.len(), "Listed users");
        Ok(page)
    }

    #[instrument(name = "records.service.delete_user", skip(self, cancel), fields(user_id = %id))]
    pub async fn delete_user(&self, id: Uuid, cancel: &CancellationToken) -> Result<(), DomainError> {
        info!("Deleting user");
        let at = now();
        let tx = self.uow.begin(cancel).await?;
        let res = cancellable(cancel, async {
            if self.users.soft_delete(&tx, id, at).await? {
                Ok(())
            } else {
                Err(DomainError::not_found("user", id))
            }
        })
        .await;
        tx.finish(res).await?;

        info!("Successfully deleted user");
        Ok(())
    }

    // --- validation helpers ---

    fn validate_new_user(&self, new_user: &NewUser) -> Result<(), DomainError> {
        if new_user.first_name.trim().is_empty() {
            return Err(DomainError::validation("firstName", "must not be empty"));
        }
        if new_user.last_name.trim().is_empty() {
            return Err(DomainError::validation("lastName", "must not be empty"));
        }
        Ok(())
    }
}
