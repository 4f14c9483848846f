//! Service-level behavior against in-memory SQLite (and SeaORM's mock backend
//! where the statement log matters).

mod common;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bio_db::{TxHandle, UnitOfWork};
use chrono::{DateTime, Utc};
use paging::{Page, PageRequest, ResolvedPagination, SortDir, SortRequest};
use records::contract::model::{
    Application, ApplicationFilter, ApplicationPatch, ApplicationStatus, SubtypeFilter,
    UserFilter,
};
use records::domain::error::DomainError;
use records::domain::repo::ApplicationsRepository;
use records::domain::service::{Service, ServiceConfig};
use records::infra::storage::entity::application;
use records::infra::storage::sea_orm_repo::{
    SeaOrmApplicationsRepository, SeaOrmCatalogRepository, SeaOrmUsersRepository,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, EntityTrait, MockDatabase, Set, Transaction};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use common::{new_user, seed_catalog, setup, setup_with};

fn page(limit: Option<u64>, offset: Option<u64>) -> PageRequest {
    PageRequest::new(limit, offset)
}

/// Statement log of a mock connection whose other owners are gone.
fn transaction_log(conn: Arc<DatabaseConnection>) -> Vec<Transaction> {
    Arc::try_unwrap(conn)
        .expect("mock connection is still shared")
        .into_transaction_log()
}

#[tokio::test]
async fn create_then_get_returns_equal_application() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    let creator = Uuid::new_v4();

    let before = Utc::now();
    let mut new_app = env.new_application(creator, "water on the stairs");
    new_app.photo_ids = vec![Uuid::new_v4(), Uuid::new_v4()];
    let created = svc.create_application(new_app.clone(), &cancel).await?;

    assert_eq!(created.status, ApplicationStatus::Created);
    assert_eq!(created.creator_id, creator);
    assert_eq!(created.created_at, created.updated_at);
    assert!(created.created_at >= before - chrono::Duration::milliseconds(1));
    assert_eq!(created.photo_ids, new_app.photo_ids);
    assert!(created.performer_id.is_none());

    let fetched = svc.get_application(created.id, &cancel).await?;
    assert_eq!(fetched, created);
    Ok(())
}

#[tokio::test]
async fn list_total_matches_items_when_page_covers_everything() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    for i in 0..3 {
        svc.create_application(env.new_application(Uuid::new_v4(), &format!("app {i}")), &cancel)
            .await?;
    }

    let res = svc
        .list_applications(ApplicationFilter::default(), &page(None, None), None, &cancel)
        .await?;
    assert_eq!(res.total, 3);
    assert_eq!(res.items.len() as u64, res.total);
    Ok(())
}

#[tokio::test]
async fn empty_result_is_an_empty_vec() -> Result<()> {
    let env = setup().await?;
    let res = env
        .records
        .service()
        .list_applications(
            ApplicationFilter::default(),
            &page(None, None),
            None,
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(res.total, 0);
    assert!(res.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn offset_past_the_signed_range_is_rejected() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    svc.create_application(env.new_application(Uuid::new_v4(), "only"), &cancel)
        .await?;

    let err = svc
        .list_applications(
            ApplicationFilter::default(),
            &page(None, Some(u64::MAX)),
            None,
            &cancel,
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::InvalidPagination {
            field: "offset",
            requested: u64::MAX,
            max: paging::MAX_OFFSET,
        }
    );

    let res = svc
        .list_applications(
            ApplicationFilter::default(),
            &page(None, Some(paging::MAX_OFFSET)),
            None,
            &cancel,
        )
        .await?;
    assert_eq!(res.total, 1);
    assert!(res.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn limit_bounds_are_enforced() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    for i in 0..3 {
        svc.create_application(env.new_application(Uuid::new_v4(), &format!("app {i}")), &cancel)
            .await?;
    }

    let err = svc
        .list_applications(ApplicationFilter::default(), &page(Some(51), None), None, &cancel)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::InvalidPagination {
            field: "limit",
            requested: 51,
            max: 50
        }
    );

    // Zero means "use the default".
    let res = svc
        .list_applications(ApplicationFilter::default(), &page(Some(0), None), None, &cancel)
        .await?;
    assert_eq!(res.items.len(), 3);

    let res = svc
        .list_applications(ApplicationFilter::default(), &page(Some(2), None), None, &cancel)
        .await?;
    assert_eq!(res.items.len(), 2);
    assert_eq!(res.total, 3);
    Ok(())
}

#[tokio::test]
async fn pages_cover_all_rows_exactly_once() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    let mut created = HashSet::new();
    for i in 0..3 {
        let app = svc
            .create_application(env.new_application(Uuid::new_v4(), &format!("app {i}")), &cancel)
            .await?;
        created.insert(app.id);
    }

    let mut seen = Vec::new();
    for offset in [0, 2] {
        let res = svc
            .list_applications(
                ApplicationFilter::default(),
                &page(Some(2), Some(offset)),
                None,
                &cancel,
            )
            .await?;
        assert_eq!(res.total, 3);
        seen.extend(res.items.into_iter().map(|a| a.id));
    }
    assert_eq!(seen.len(), 3);
    assert_eq!(seen.into_iter().collect::<HashSet<_>>(), created);
    Ok(())
}

#[tokio::test]
async fn unknown_sort_key_fails_before_any_statement() {
    let conn = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let svc = Service::new(
        UnitOfWork::new(Arc::clone(&conn)),
        Arc::new(SeaOrmApplicationsRepository),
        Arc::new(SeaOrmUsersRepository),
        Arc::new(SeaOrmCatalogRepository),
        ServiceConfig::default(),
    );

    let sort = SortRequest::new("performer_id", SortDir::Asc);
    let err = svc
        .list_applications(
            ApplicationFilter::default(),
            &page(None, None),
            Some(&sort),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::InvalidSortKey {
            key: "performer_id".into()
        }
    );
    drop(svc);
    assert!(transaction_log(conn).is_empty());
}

#[tokio::test]
async fn zero_count_skips_the_page_query() -> Result<()> {
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[BTreeMap::from([(
            "num_items",
            sea_orm::Value::BigInt(Some(0)),
        )])]])
        .into_connection();
    let conn = Arc::new(conn);
    let svc = Service::new(
        UnitOfWork::pass_through(Arc::clone(&conn)),
        Arc::new(SeaOrmApplicationsRepository),
        Arc::new(SeaOrmUsersRepository),
        Arc::new(SeaOrmCatalogRepository),
        ServiceConfig::default(),
    );

    let res = svc
        .list_applications(
            ApplicationFilter {
                status: Some(ApplicationStatus::Done),
                ..Default::default()
            },
            &page(None, None),
            None,
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(res.total, 0);
    assert!(res.items.is_empty());
    drop(svc);
    assert_eq!(transaction_log(conn).len(), 1);
    Ok(())
}

#[tokio::test]
async fn sort_by_status_descending() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();

    let a = svc
        .create_application(env.new_application(Uuid::new_v4(), "a"), &cancel)
        .await?;
    let b = svc
        .create_application(env.new_application(Uuid::new_v4(), "b"), &cancel)
        .await?;
    svc.update_application(
        b.id,
        ApplicationPatch {
            status: Some(ApplicationStatus::InProgress),
            ..Default::default()
        },
        &cancel,
    )
    .await?;
    svc.update_application(
        a.id,
        ApplicationPatch {
            status: Some(ApplicationStatus::Done),
            ..Default::default()
        },
        &cancel,
    )
    .await?;

    let sort = SortRequest::new("status", SortDir::Desc);
    let res = svc
        .list_applications(ApplicationFilter::default(), &page(None, None), Some(&sort), &cancel)
        .await?;
    let statuses: Vec<_> = res.items.iter().map(|a| a.status).collect();
    assert_eq!(
        statuses,
        vec![ApplicationStatus::InProgress, ApplicationStatus::Done]
    );
    Ok(())
}

#[tokio::test]
async fn filters_are_combined_with_and() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    let alice = Uuid::new_v4();
    let performer = Uuid::new_v4();

    let mine = svc
        .create_application(env.new_application(alice, "mine"), &cancel)
        .await?;
    svc.create_application(env.new_application(alice, "also mine"), &cancel)
        .await?;
    svc.create_application(env.new_application(Uuid::new_v4(), "someone else"), &cancel)
        .await?;
    svc.update_application(
        mine.id,
        ApplicationPatch {
            performer_id: Some(performer),
            status: Some(ApplicationStatus::InProgress),
            ..Default::default()
        },
        &cancel,
    )
    .await?;

    let by_creator = svc
        .list_applications(
            ApplicationFilter {
                creator_id: Some(alice),
                ..Default::default()
            },
            &page(None, None),
            None,
            &cancel,
        )
        .await?;
    assert_eq!(by_creator.total, 2);

    let narrowed = svc
        .list_applications(
            ApplicationFilter {
                creator_id: Some(alice),
                performer_id: Some(performer),
                status: Some(ApplicationStatus::InProgress),
                type_id: Some(env.type_id),
            },
            &page(None, None),
            None,
            &cancel,
        )
        .await?;
    assert_eq!(narrowed.total, 1);
    assert_eq!(narrowed.items[0].id, mine.id);
    Ok(())
}

#[tokio::test]
async fn update_writes_patch_and_bumps_updated_at() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    let created = svc
        .create_application(env.new_application(Uuid::new_v4(), "door"), &cancel)
        .await?;

    let performer = Uuid::new_v4();
    let when: DateTime<Utc> = "2030-01-02T03:04:05Z".parse()?;
    let updated = svc
        .update_application(
            created.id,
            ApplicationPatch {
                status: Some(ApplicationStatus::InProgress),
                performer_id: Some(performer),
                performer_time: Some(when),
            },
            &cancel,
        )
        .await?;

    assert_eq!(updated.status, ApplicationStatus::InProgress);
    assert_eq!(updated.performer_id, Some(performer));
    assert_eq!(updated.performer_time, Some(when));
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.text, created.text);
    Ok(())
}

#[tokio::test]
async fn empty_patch_is_a_no_op_error() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    let created = svc
        .create_application(env.new_application(Uuid::new_v4(), "window"), &cancel)
        .await?;

    let err = svc
        .update_application(created.id, ApplicationPatch::default(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::NoOpUpdate);

    let fetched = svc.get_application(created.id, &cancel).await?;
    assert_eq!(fetched.updated_at, created.updated_at);
    Ok(())
}

#[tokio::test]
async fn missing_application_is_not_found() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    let id = Uuid::new_v4();

    assert!(matches!(
        svc.get_application(id, &cancel).await,
        Err(DomainError::NotFound { .. })
    ));
    let patch = ApplicationPatch {
        status: Some(ApplicationStatus::Done),
        ..Default::default()
    };
    assert!(matches!(
        svc.update_application(id, patch, &cancel).await,
        Err(DomainError::NotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn unknown_type_reference_is_a_constraint_error() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    let mut new_app = env.new_application(Uuid::new_v4(), "ghost type");
    new_app.type_id = Uuid::new_v4();

    let err = svc.create_application(new_app, &cancel).await.unwrap_err();
    assert!(matches!(err, DomainError::Constraint { .. }), "{err:?}");

    let res = svc
        .list_applications(ApplicationFilter::default(), &page(None, None), None, &cancel)
        .await?;
    assert_eq!(res.total, 0);
    Ok(())
}

#[tokio::test]
async fn undecodable_row_fails_the_whole_list() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    svc.create_application(env.new_application(Uuid::new_v4(), "fine"), &cancel)
        .await?;

    let now = Utc::now();
    application::Entity::insert(application::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        creator_id: Set(Uuid::new_v4()),
        updated_at: Set(now),
        status: Set("archived".into()),
        type_id: Set(env.type_id),
        subtype_id: Set(env.subtype_id),
        text: Set("legacy".into()),
        photo_ids: Set(None),
        performer_id: Set(None),
        performer_time: Set(None),
    })
    .exec_without_returning(env.db.seaorm())
    .await?;

    let err = svc
        .list_applications(ApplicationFilter::default(), &page(None, None), None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Decode { .. }), "{err:?}");
    Ok(())
}

/// Delegates to the SeaORM repository but fails the re-read after insert.
struct FailingReread;

#[async_trait]
impl ApplicationsRepository for FailingReread {
    async fn insert(&self, tx: &TxHandle, app: &Application) -> Result<(), DomainError> {
        SeaOrmApplicationsRepository.insert(tx, app).await
    }

    async fn find_by_id(
        &self,
        _tx: &TxHandle,
        _id: Uuid,
    ) -> Result<Option<Application>, DomainError> {
        Err(DomainError::storage("re-read failed"))
    }

    async fn update(
        &self,
        tx: &TxHandle,
        id: Uuid,
        patch: &ApplicationPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        SeaOrmApplicationsRepository
            .update(tx, id, patch, updated_at)
            .await
    }

    async fn list(
        &self,
        tx: &TxHandle,
        filter: &ApplicationFilter,
        page: &ResolvedPagination,
    ) -> Result<Page<Application>, DomainError> {
        SeaOrmApplicationsRepository.list(tx, filter, page).await
    }
}

#[tokio::test]
async fn failure_after_insert_rolls_everything_back() -> Result<()> {
    let env = setup().await?;
    let svc = Service::new(
        env.db.unit_of_work(true),
        Arc::new(FailingReread),
        Arc::new(SeaOrmUsersRepository),
        Arc::new(SeaOrmCatalogRepository),
        ServiceConfig::default(),
    );
    let cancel = CancellationToken::new();

    let err = svc
        .create_application(env.new_application(Uuid::new_v4(), "lost"), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::storage("re-read failed"));

    let res = svc
        .list_applications(ApplicationFilter::default(), &page(None, None), None, &cancel)
        .await?;
    assert_eq!(res.total, 0);
    assert!(res.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn canceled_request_writes_nothing() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = svc
        .create_application(env.new_application(Uuid::new_v4(), "too late"), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::ContextCanceled);

    let res = svc
        .list_applications(
            ApplicationFilter::default(),
            &page(None, None),
            None,
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(res.total, 0);
    Ok(())
}

/// Delegates to the SeaORM repository, fires the request's cancellation
/// right after the insert and then never answers the re-read.
struct CancelAfterInsert {
    cancel: CancellationToken,
}

#[async_trait]
impl ApplicationsRepository for CancelAfterInsert {
    async fn insert(&self, tx: &TxHandle, app: &Application) -> Result<(), DomainError> {
        SeaOrmApplicationsRepository.insert(tx, app).await?;
        self.cancel.cancel();
        Ok(())
    }

    async fn find_by_id(
        &self,
        _tx: &TxHandle,
        _id: Uuid,
    ) -> Result<Option<Application>, DomainError> {
        std::future::pending().await
    }

    async fn update(
        &self,
        tx: &TxHandle,
        id: Uuid,
        patch: &ApplicationPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        SeaOrmApplicationsRepository
            .update(tx, id, patch, updated_at)
            .await
    }

    async fn list(
        &self,
        tx: &TxHandle,
        filter: &ApplicationFilter,
        page: &ResolvedPagination,
    ) -> Result<Page<Application>, DomainError> {
        SeaOrmApplicationsRepository.list(tx, filter, page).await
    }
}

#[tokio::test]
async fn cancellation_mid_operation_rolls_back_the_insert() -> Result<()> {
    let env = setup().await?;
    let cancel = CancellationToken::new();
    let svc = Service::new(
        env.db.unit_of_work(true),
        Arc::new(CancelAfterInsert {
            cancel: cancel.clone(),
        }),
        Arc::new(SeaOrmUsersRepository),
        Arc::new(SeaOrmCatalogRepository),
        ServiceConfig::default(),
    );

    let err = svc
        .create_application(env.new_application(Uuid::new_v4(), "interrupted"), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::ContextCanceled);

    let res = env
        .records
        .service()
        .list_applications(
            ApplicationFilter::default(),
            &page(None, None),
            None,
            &CancellationToken::new(),
        )
        .await?;
    assert_eq!(res.total, 0);
    assert!(res.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn pass_through_mode_still_serves_requests() -> Result<()> {
    let env = setup_with(false).await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();

    let created = svc
        .create_application(env.new_application(Uuid::new_v4(), "no tx"), &cancel)
        .await?;
    assert_eq!(svc.get_application(created.id, &cancel).await?, created);
    Ok(())
}

#[tokio::test]
async fn soft_deleted_user_is_not_listed() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();

    let keep = svc.create_user(new_user("Ann", "Lee", "tenant"), &cancel).await?;
    let gone = svc.create_user(new_user("Bob", "Ray", "tenant"), &cancel).await?;
    assert_eq!(svc.get_user(keep.id, &cancel).await?, keep);

    svc.delete_user(gone.id, &cancel).await?;

    let res = svc
        .list_users(UserFilter::default(), &page(None, None), None, &cancel)
        .await?;
    assert_eq!(res.total, 1);
    assert_eq!(res.items, vec![keep]);

    let by_id = svc
        .list_users(
            UserFilter {
                id: Some(gone.id),
                ..Default::default()
            },
            &page(None, None),
            None,
            &cancel,
        )
        .await?;
    assert_eq!(by_id.total, 0);

    assert!(matches!(
        svc.get_user(gone.id, &cancel).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        svc.delete_user(gone.id, &cancel).await,
        Err(DomainError::NotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn user_creation_requires_names() -> Result<()> {
    let env = setup().await?;
    let err = env
        .records
        .service()
        .create_user(new_user("", "Lee", "tenant"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
    Ok(())
}

#[tokio::test]
async fn users_sort_by_last_name_and_filter_by_role() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    for (first, last, role) in [
        ("Cy", "Zed", "tenant"),
        ("Di", "Abe", "tenant"),
        ("Ed", "Moe", "worker"),
    ] {
        svc.create_user(new_user(first, last, role), &cancel).await?;
    }

    let sort = SortRequest::new("last_name", SortDir::Asc);
    let res = svc
        .list_users(
            UserFilter {
                role: Some("tenant".into()),
                ..Default::default()
            },
            &page(None, None),
            Some(&sort),
            &cancel,
        )
        .await?;
    let names: Vec<_> = res.items.iter().map(|u| u.last_name.as_str()).collect();
    assert_eq!(names, vec!["Abe", "Zed"]);
    Ok(())
}

#[tokio::test]
async fn subtypes_filter_by_type_and_sort_by_title() -> Result<()> {
    let env = setup().await?;
    let svc = env.records.service();
    let cancel = CancellationToken::new();
    let (electric, _) = seed_catalog(&env.db, "Electric", "Wiring").await?;

    let types = svc
        .list_application_types(&page(None, None), None, &cancel)
        .await?;
    let titles: Vec<_> = types.items.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Electric", "Plumbing"]);

    let subtypes = svc
        .list_application_subtypes(
            SubtypeFilter {
                type_id: Some(electric),
            },
            &page(None, None),
            None,
            &cancel,
        )
        .await?;
    assert_eq!(subtypes.total, 1);
    assert_eq!(subtypes.items[0].title, "Wiring");
    assert_eq!(subtypes.items[0].type_id, electric);

    let catalog_over_max = svc
        .list_application_types(&page(Some(101), None), None, &cancel)
        .await;
    assert!(matches!(
        catalog_over_max,
        Err(DomainError::InvalidPagination { max: 100, .. })
    ));
    Ok(())
}
