//! Core business logic - framework-agnostic group-buy coordination.
//!
//! The submodules expose free functions over any `SeaORM` connection or
//! transaction. [`GroupBuyEngine`] bundles a connection with the settings and
//! the voucher issuer, and is what the bot layer talks to.

/// Completion fan-out: open to complete plus one voucher per member
pub mod completion;
/// Exactly-once membership
pub mod enrollment;
/// Product page read model
pub mod listing;
/// Opening and joining pools
pub mod pool;
/// Purchase queries
pub mod purchase;
/// Minimal user directory
pub mod user;
/// Voucher codes and expiry dates
pub mod voucher;

use crate::{
    config::GroupBuySettings,
    entities::{purchase as purchase_entity, user as user_entity},
    errors::Result,
};
use completion::Completion;
use listing::PoolSummary;
use pool::JoinOutcome;
use sea_orm::DatabaseConnection;
use voucher::VoucherIssuer;

/// Entry point for the boundary operations of the engine.
#[derive(Debug)]
pub struct GroupBuyEngine {
    db: DatabaseConnection,
    settings: GroupBuySettings,
    issuer: VoucherIssuer,
}

impl GroupBuyEngine {
    /// Engine with an entropy-seeded voucher issuer.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: GroupBuySettings) -> Self {
        let issuer = VoucherIssuer::new(settings.voucher_validity_months);
        Self {
            db,
            settings,
            issuer,
        }
    }

    /// Replaces the voucher issuer, e.g. with a seeded one.
    #[must_use]
    pub fn with_issuer(mut self, issuer: VoucherIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    /// Underlying database connection.
    #[must_use]
    pub const fn database(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Rules applied to new pools.
    #[must_use]
    pub const fn settings(&self) -> &GroupBuySettings {
        &self.settings
    }

    /// Joins the oldest open pool for the product or opens a new one.
    pub async fn create_or_join(
        &self,
        product_id: i64,
        user_id: i64,
        discount_rate: Option<i32>,
    ) -> Result<JoinOutcome> {
        pool::open_or_join(
            &self.db,
            &self.settings,
            &self.issuer,
            product_id,
            user_id,
            discount_rate,
        )
        .await
    }

    /// Joins a specific open pool.
    pub async fn join(&self, pool_id: i64, user_id: i64) -> Result<JoinOutcome> {
        pool::join_existing(&self.db, &self.issuer, pool_id, user_id).await
    }

    /// Completes a pool that has reached its target, if nobody has yet.
    pub async fn complete(&self, pool_id: i64) -> Result<Completion> {
        completion::complete(&self.db, &self.issuer, pool_id).await
    }

    /// Pools for a product, open first, newest first.
    pub async fn pools_for_product(
        &self,
        product_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<PoolSummary>> {
        listing::pools_for_product(&self.db, product_id, limit).await
    }

    /// Purchases owned by a user, newest first.
    pub async fn purchases_for_user(&self, user_id: i64) -> Result<Vec<purchase_entity::Model>> {
        purchase::get_purchases_for_user(&self.db, user_id).await
    }

    /// Finds or registers the user behind an external identity.
    pub async fn ensure_user(&self, external_id: &str, nickname: &str) -> Result<user_entity::Model> {
        user::ensure_user(&self.db, external_id, nickname).await
    }
}
