//! Pool lifecycle - opening pools, joining them and settling the threshold.
//!
//! A join is one transaction: enroll the member, then run the completion check
//! on the same transaction. If the fan-out fails the enrollment is rolled back
//! with it, so a retried join starts from a clean state and can trigger the
//! completion again.

use crate::{
    config::GroupBuySettings,
    core::{
        completion,
        enrollment::{self, Enrollment},
        voucher::VoucherIssuer,
    },
    entities::{Pool, PoolState, pool},
    errors::{Error, Result},
};
use chrono::TimeDelta;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// How many times `open_or_join` re-selects a pool that closed under it.
pub const MAX_OPEN_OR_JOIN_ATTEMPTS: usize = 3;

/// Result of opening or joining a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    /// Pool the user is now a member of
    pub pool_id: i64,
    /// Whether the pool is complete when the call returns
    pub complete: bool,
}

/// Finds a pool by its id.
pub async fn get_pool_by_id<C>(db: &C, pool_id: i64) -> Result<Option<pool::Model>>
where
    C: ConnectionTrait,
{
    Pool::find_by_id(pool_id).one(db).await.map_err(Into::into)
}

/// The open pool for `product_id` that was created first, if any.
///
/// New demand goes to the oldest pool so that it fills up instead of the
/// product collecting many small pools.
pub async fn find_oldest_open_pool<C>(db: &C, product_id: i64) -> Result<Option<pool::Model>>
where
    C: ConnectionTrait,
{
    Pool::find()
        .filter(pool::Column::ProductId.eq(product_id))
        .filter(pool::Column::State.eq(PoolState::Open))
        .order_by_asc(pool::Column::CreatedAt)
        .order_by_asc(pool::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Joins the oldest open pool for the product, or opens a new one.
///
/// # Errors
/// Returns:
/// - [`Error::InvalidInput`] for non-positive ids, a discount outside 0..=100
///   or an unknown user
/// - [`Error::AlreadyJoined`] if the user is already in the oldest open pool
/// - [`Error::StorageConflict`] if the selected pool kept closing under the call
#[instrument(skip(db, settings, issuer))]
pub async fn open_or_join<C>(
    db: &C,
    settings: &GroupBuySettings,
    issuer: &VoucherIssuer,
    product_id: i64,
    user_id: i64,
    discount_rate: Option<i32>,
) -> Result<JoinOutcome>
where
    C: ConnectionTrait + TransactionTrait,
{
    validate_id("product id", product_id)?;
    validate_id("user id", user_id)?;
    let discount_rate = discount_rate.unwrap_or(settings.default_discount_rate);
    if !(0..=100).contains(&discount_rate) {
        return Err(Error::InvalidInput {
            message: format!("discount rate {discount_rate} is not between 0 and 100"),
        });
    }

    for attempt in 1..=MAX_OPEN_OR_JOIN_ATTEMPTS {
        let Some(existing) = find_oldest_open_pool(db, product_id).await? else {
            return open_pool(db, settings, issuer, product_id, user_id, discount_rate).await;
        };

        match join_existing(db, issuer, existing.id, user_id).await {
            Err(Error::PoolNotFound { pool_id }) => {
                warn!(pool_id, attempt, "selected pool closed before joining, retrying");
            }
            other => return other,
        }
    }

    Err(Error::StorageConflict {
        message: format!(
            "no joinable pool for product {product_id} after {MAX_OPEN_OR_JOIN_ATTEMPTS} attempts"
        ),
    })
}

/// Joins a specific pool.
///
/// # Errors
/// Returns:
/// - [`Error::PoolNotFound`] if the pool does not exist or is complete
/// - [`Error::AlreadyJoined`] if the user is already a member
/// - [`Error::InvalidInput`] for non-positive ids or an unknown user
#[instrument(skip(db, issuer))]
pub async fn join_existing<C>(
    db: &C,
    issuer: &VoucherIssuer,
    pool_id: i64,
    user_id: i64,
) -> Result<JoinOutcome>
where
    C: TransactionTrait,
{
    validate_id("pool id", pool_id)?;
    validate_id("user id", user_id)?;

    let txn = db.begin().await?;
    if enrollment::enroll(&txn, pool_id, user_id).await? == Enrollment::AlreadyJoined {
        txn.rollback().await?;
        return Err(Error::AlreadyJoined { pool_id, user_id });
    }
    let complete = completion::complete(&txn, issuer, pool_id)
        .await?
        .is_complete();
    txn.commit().await?;

    Ok(JoinOutcome { pool_id, complete })
}

/// Opens a pool with the creator as its first member.
///
/// A pool whose target is one completes right here, exactly as if the
/// creator had joined an existing pool.
async fn open_pool<C>(
    db: &C,
    settings: &GroupBuySettings,
    issuer: &VoucherIssuer,
    product_id: i64,
    creator_id: i64,
    discount_rate: i32,
) -> Result<JoinOutcome>
where
    C: TransactionTrait,
{
    let target_count = i32::try_from(settings.target_count).map_err(|_| Error::Config {
        message: format!("target_count {} is too large", settings.target_count),
    })?;
    let now = chrono::Utc::now();
    let end_time = TimeDelta::try_hours(settings.pool_duration_hours)
        .and_then(|duration| now.checked_add_signed(duration))
        .ok_or_else(|| Error::Config {
            message: format!(
                "pool_duration_hours {} is out of range",
                settings.pool_duration_hours
            ),
        })?;

    let txn = db.begin().await?;
    let pool = pool::ActiveModel {
        product_id: Set(product_id),
        creator_id: Set(creator_id),
        discount_rate: Set(discount_rate),
        target_count: Set(target_count),
        state: Set(PoolState::Open),
        created_at: Set(now),
        end_time: Set(end_time),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    enrollment::enroll(&txn, pool.id, creator_id).await?;
    let complete = completion::complete(&txn, issuer, pool.id)
        .await?
        .is_complete();
    txn.commit().await?;

    info!(pool_id = pool.id, product_id, creator_id, target_count, "group buy opened");
    Ok(JoinOutcome {
        pool_id: pool.id,
        complete,
    })
}

fn validate_id(what: &str, id: i64) -> Result<()> {
    if id <= 0 {
        return Err(Error::InvalidInput {
            message: format!("{what} is required"),
        });
    }
    Ok(())
}
