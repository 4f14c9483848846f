#![allow(dead_code)]

use anyhow::Result;
use bio_db::{ConnectOpts, DbHandle};
use records::api::rest::auth::issue_token;
use records::config::RecordsConfig;
use records::contract::model::{NewApplication, NewUser};
use records::infra::storage::entity::{application_subtype, application_type};
use records::infra::storage::schema::ensure_schema;
use records::Records;
use sea_orm::{EntityTrait, Set};
use uuid::Uuid;

pub const SECRET: &str = "test-secret";

pub struct TestEnv {
    pub db: DbHandle,
    pub records: Records,
    pub type_id: Uuid,
    pub subtype_id: Uuid,
}

impl TestEnv {
    pub fn new_application(&self, creator_id: Uuid, text: &str) -> NewApplication {
        NewApplication {
            creator_id,
            type_id: self.type_id,
            subtype_id: self.subtype_id,
            text: text.to_string(),
            photo_ids: vec![],
        }
    }
}

pub fn test_config() -> RecordsConfig {
    RecordsConfig {
        jwt_secret: SECRET.to_string(),
        ..RecordsConfig::default()
    }
}

/// Fresh in-memory SQLite with the schema and one type/subtype pair.
pub async fn setup() -> Result<TestEnv> {
    setup_with(true).await
}

pub async fn setup_with(transactional: bool) -> Result<TestEnv> {
    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
    ensure_schema(db.seaorm()).await?;
    let (type_id, subtype_id) = seed_catalog(&db, "Plumbing", "Leak").await?;
    let records = Records::new(db.unit_of_work(transactional), &test_config());
    Ok(TestEnv {
        db,
        records,
        type_id,
        subtype_id,
    })
}

pub async fn seed_catalog(db: &DbHandle, type_title: &str, subtype_title: &str) -> Result<(Uuid, Uuid)> {
    let type_id = Uuid::new_v4();
    let subtype_id = Uuid::new_v4();
    application_type::Entity::insert(application_type::ActiveModel {
        id: Set(type_id),
        title: Set(type_title.to_string()),
    })
    .exec_without_returning(db.seaorm())
    .await?;
    application_subtype::Entity::insert(application_subtype::ActiveModel {
        id: Set(subtype_id),
        title: Set(subtype_title.to_string()),
        type_id: Set(type_id),
    })
    .exec_without_returning(db.seaorm())
    .await?;
    Ok((type_id, subtype_id))
}

pub fn new_user(first: &str, last: &str, role: &str) -> NewUser {
    NewUser {
        first_name: first.to_string(),
        last_name: last.to_string(),
        role: role.to_string(),
        phone: "+10000000000".to_string(),
    }
}

pub fn token_for(user_id: Uuid) -> String {
    issue_token(SECRET, user_id).expect("sign test token")
}
