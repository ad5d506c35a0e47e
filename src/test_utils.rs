//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::GroupBuySettings,
    core::{GroupBuyEngine, user, voucher::VoucherIssuer},
    entities::{self, Pool, PoolState, pool},
    errors::{Error, Result},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Installs a tracing subscriber that writes through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Connections in the pool of [`setup_file_test_db`].
pub const FILE_DB_CONNECTIONS: u32 = 8;

/// Creates a file-backed `SQLite` database with several pooled connections.
///
/// The in-memory database is limited to one connection, so concurrent tests
/// use this one to get real lock contention. Keep the returned directory
/// alive for as long as the connection is used.
pub async fn setup_file_test_db() -> Result<(TempDir, DatabaseConnection)> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("groupbuy.sqlite").display());
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(FILE_DB_CONNECTIONS)
        .min_connections(FILE_DB_CONNECTIONS)
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((dir, db))
}

/// Settings with the given target and defaults for everything else.
#[must_use]
pub fn test_settings(target_count: u32) -> GroupBuySettings {
    GroupBuySettings {
        target_count,
        ..GroupBuySettings::default()
    }
}

/// Engine over a fresh database with a fixed voucher seed.
pub async fn setup_test_engine(target_count: u32) -> Result<GroupBuyEngine> {
    let db = setup_test_db().await?;
    let settings = test_settings(target_count);
    let issuer = VoucherIssuer::seeded(1234, settings.voucher_validity_months);
    Ok(GroupBuyEngine::new(db, settings).with_issuer(issuer))
}

/// Registers `count` users named `user0`, `user1`, ...
pub async fn create_test_users(
    db: &DatabaseConnection,
    count: usize,
) -> Result<Vec<entities::user::Model>> {
    let mut users = Vec::with_capacity(count);
    for i in 0..count {
        users.push(user::register_user(db, &format!("010-0000-{i:04}"), &format!("user{i}")).await?);
    }
    Ok(users)
}

/// Inserts an open pool directly, without enrolling anyone.
pub async fn insert_raw_pool(
    db: &DatabaseConnection,
    product_id: i64,
    creator_id: i64,
    target_count: i32,
) -> Result<pool::Model> {
    let now = chrono::Utc::now();
    pool::ActiveModel {
        product_id: Set(product_id),
        creator_id: Set(creator_id),
        discount_rate: Set(20),
        target_count: Set(target_count),
        state: Set(PoolState::Open),
        created_at: Set(now),
        end_time: Set(now + chrono::TimeDelta::hours(24)),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Forces a pool to complete without issuing vouchers.
pub async fn mark_complete(db: &DatabaseConnection, pool_id: i64) -> Result<()> {
    Pool::update_many()
        .col_expr(pool::Column::State, Expr::value(PoolState::Complete))
        .filter(pool::Column::Id.eq(pool_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Current state of a pool.
pub async fn pool_state(db: &DatabaseConnection, pool_id: i64) -> Result<PoolState> {
    Pool::find_by_id(pool_id)
        .one(db)
        .await?
        .map(|p| p.state)
        .ok_or(Error::PoolNotFound { pool_id })
}
