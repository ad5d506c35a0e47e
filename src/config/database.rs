//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. The one constraint entities cannot express, the composite
//! `(pool_id, user_id)` uniqueness on memberships, is created explicitly here.

use crate::entities::{Membership, Pool, Purchase, User, membership};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/groupbuy.sqlite?mode=rwc";

/// Name of the unique index that enforces one membership per user and pool.
pub const MEMBERSHIP_UNIQUE_INDEX: &str = "idx_memberships_pool_user";

/// Gets the database URL from the `DATABASE_URL` environment variable or
/// returns the default local `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(dir) = sqlite_file_path(&database_url).and_then(Path::parent) {
        std::fs::create_dir_all(dir)?;
    }
    debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Filesystem path of a file-backed `SQLite` URL.
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(Path::new(path))
}

/// Creates all tables (if missing) plus the membership uniqueness index.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Referenced tables first
    create_table(db, &schema, User).await?;
    create_table(db, &schema, Pool).await?;
    create_table(db, &schema, Membership).await?;
    create_table(db, &schema, Purchase).await?;

    let unique_membership = Index::create()
        .if_not_exists()
        .name(MEMBERSHIP_UNIQUE_INDEX)
        .table(Membership)
        .col(membership::Column::PoolId)
        .col(membership::Column::UserId)
        .unique()
        .to_owned();
    db.execute(builder.build(&unique_membership)).await?;

    info!("Database tables ensured");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}
