//! Table bootstrap for development and tests.
//!
//! Production databases are expected to be provisioned ahead of time; this only
//! creates what is missing and never alters existing tables.

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::infra::storage::entity::{application, application_subtype, application_type, user};

async fn create_if_missing<C, E>(conn: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = conn.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    conn.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Create the record tables if they do not exist. Referenced tables come first
/// so foreign keys resolve.
pub async fn ensure_schema<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let schema = Schema::new(conn.get_database_backend());
    create_if_missing(conn, &schema, application_type::Entity).await?;
    create_if_missing(conn, &schema, application_subtype::Entity).await?;
    create_if_missing(conn, &schema, user::Entity).await?;
    create_if_missing(conn, &schema, application::Entity).await?;
    info!("records schema ready");
    Ok(())
}
