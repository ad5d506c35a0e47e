//! Participant enrollment.
//!
//! Adding a member never relies on a read-then-write check. Two store-level
//! guards make it safe under parallel callers:
//!
//! 1. The pool row is claimed with `UPDATE pools SET state = state WHERE id = ?
//!    AND state = 'open'`. No matching row means the pool is gone or complete.
//!    The write lock taken here orders the enrollment against the completion
//!    transition, so nobody is added to a pool whose vouchers are issued.
//! 2. The membership insert relies on the unique `(pool_id, user_id)` index.
//!    A violation means the user is already a member.

use crate::{
    entities::{Membership, Pool, PoolState, membership, pool},
    errors::{Error, Result},
};
use sea_orm::sea_query::Expr;
use sea_orm::{PaginatorTrait, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use tracing::{debug, instrument};

/// Result of an enrollment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrollment {
    /// A new membership row was written
    Enrolled(membership::Model),
    /// The user was already a member; nothing changed
    AlreadyJoined,
}

/// Adds `user_id` to the open pool `pool_id`.
///
/// Runs in its own transaction, which becomes a savepoint when `db` is
/// already a transaction.
///
/// # Errors
/// Returns:
/// - [`Error::PoolNotFound`] if the pool does not exist or is complete
/// - [`Error::InvalidInput`] if the user does not exist
/// - a storage error if the store fails
#[instrument(skip(db))]
pub async fn enroll<C>(db: &C, pool_id: i64, user_id: i64) -> Result<Enrollment>
where
    C: TransactionTrait,
{
    let txn = db.begin().await?;

    if !claim_open_pool(&txn, pool_id).await? {
        return Err(Error::PoolNotFound { pool_id });
    }

    let inserted = membership::ActiveModel {
        pool_id: Set(pool_id),
        user_id: Set(user_id),
        joined_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await;

    match inserted {
        Ok(member) => {
            txn.commit().await?;
            debug!(pool_id, user_id, "member enrolled");
            Ok(Enrollment::Enrolled(member))
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            txn.rollback().await?;
            debug!(pool_id, user_id, "already a member");
            Ok(Enrollment::AlreadyJoined)
        }
        Err(err) => Err(err.into()),
    }
}

/// Write-locks the pool row if it is still open.
///
/// Returns `false` when no open pool matched. Issued as the first statement
/// of a transaction, it makes SQLite callers queue on the write lock instead
/// of failing to upgrade a read lock.
pub(crate) async fn claim_open_pool<C>(db: &C, pool_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let claimed = Pool::update_many()
        .col_expr(pool::Column::State, Expr::col(pool::Column::State).into())
        .filter(pool::Column::Id.eq(pool_id))
        .filter(pool::Column::State.eq(PoolState::Open))
        .exec(db)
        .await?;

    Ok(claimed.rows_affected > 0)
}

/// Number of members of a pool, always derived from the membership rows.
pub async fn member_count<C>(db: &C, pool_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Membership::find()
        .filter(membership::Column::PoolId.eq(pool_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Members of a pool in join order.
pub async fn members<C>(db: &C, pool_id: i64) -> Result<Vec<membership::Model>>
where
    C: ConnectionTrait,
{
    Membership::find()
        .filter(membership::Column::PoolId.eq(pool_id))
        .order_by_asc(membership::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
