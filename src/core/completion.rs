//! Completion fan-out.
//!
//! Completing a pool flips it from open to complete and writes one purchase
//! with a fresh voucher for every member, all in one transaction. The
//! transaction opens by claiming the open pool row, so concurrent callers wait
//! for each other on the write lock. The first one issues vouchers; the rest
//! find the pool complete and do nothing.

use crate::{
    core::{enrollment, voucher::VoucherIssuer},
    entities::{Pool, PoolState, pool, purchase},
    errors::{Error, Result},
};
use sea_orm::sea_query::Expr;
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// What a call to [`complete`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// This call completed the pool; one purchase per member
    Completed(Vec<purchase::Model>),
    /// Another call completed the pool first; nothing was written
    AlreadyComplete,
    /// The pool is open but short of its target; nothing was written
    BelowThreshold {
        /// Current member count
        count: u64,
        /// Members needed
        target: u64,
    },
}

impl Completion {
    /// Whether the pool is complete after the call.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::AlreadyComplete)
    }
}

/// Completes `pool_id` if it is open and has reached its target.
///
/// Either every member receives a purchase and the pool becomes complete, or
/// nothing changes and the pool stays open.
///
/// # Errors
/// Returns [`Error::PoolNotFound`] if the pool does not exist, or a storage
/// error; in both cases no state changed.
#[instrument(skip(db, issuer))]
pub async fn complete<C>(db: &C, issuer: &VoucherIssuer, pool_id: i64) -> Result<Completion>
where
    C: TransactionTrait,
{
    let txn = db.begin().await?;

    if !enrollment::claim_open_pool(&txn, pool_id).await? {
        let exists = Pool::find_by_id(pool_id).one(&txn).await?.is_some();
        txn.rollback().await?;
        if !exists {
            return Err(Error::PoolNotFound { pool_id });
        }
        debug!(pool_id, "already complete");
        return Ok(Completion::AlreadyComplete);
    }

    let pool = Pool::find_by_id(pool_id)
        .one(&txn)
        .await?
        .ok_or(Error::PoolNotFound { pool_id })?;

    let count = enrollment::member_count(&txn, pool_id).await?;
    if count < pool.target() {
        txn.rollback().await?;
        return Ok(Completion::BelowThreshold {
            count,
            target: pool.target(),
        });
    }

    let transitioned = Pool::update_many()
        .col_expr(pool::Column::State, Expr::value(PoolState::Complete))
        .filter(pool::Column::Id.eq(pool_id))
        .filter(pool::Column::State.eq(PoolState::Open))
        .exec(&txn)
        .await?;
    if transitioned.rows_affected == 0 {
        txn.rollback().await?;
        debug!(pool_id, "lost the completion race");
        return Ok(Completion::AlreadyComplete);
    }

    let purchases = issue_purchases(&txn, issuer, &pool).await?;
    txn.commit().await?;

    info!(
        pool_id,
        product_id = pool.product_id,
        vouchers = purchases.len(),
        "group buy completed"
    );
    Ok(Completion::Completed(purchases))
}

async fn issue_purchases<C>(
    db: &C,
    issuer: &VoucherIssuer,
    pool: &pool::Model,
) -> Result<Vec<purchase::Model>>
where
    C: ConnectionTrait,
{
    let members = enrollment::members(db, pool.id).await?;
    let now = chrono::Utc::now();
    let today = now.date_naive();

    // Vouchers are drawn up front so the issuer lock is never held across an await.
    let vouchers = members
        .iter()
        .map(|_| issuer.issue(today))
        .collect::<Result<Vec<_>>>()?;

    let mut purchases = Vec::with_capacity(members.len());
    for (member, voucher) in members.iter().zip(vouchers) {
        let purchase = purchase::ActiveModel {
            user_id: Set(member.user_id),
            product_id: Set(pool.product_id),
            pool_id: Set(Some(pool.id)),
            quantity: Set(1),
            voucher_code: Set(voucher.code),
            expiry_date: Set(voucher.expiry_date),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        purchases.push(purchase);
    }
    Ok(purchases)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::enrollment::enroll;
    use crate::core::purchase::get_purchases_for_pool;
    use crate::test_utils::*;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    #[tokio::test]
    async fn test_complete_issues_one_purchase_per_member() -> Result<()> {
        let db = setup_test_db().await?;
        let issuer = VoucherIssuer::seeded(1, 3);
        let users = create_test_users(&db, 3).await?;
        let pool = insert_raw_pool(&db, 42, users[0].id, 3).await?;
        for user in &users {
            enroll(&db, pool.id, user.id).await?;
        }

        let Completion::Completed(purchases) = complete(&db, &issuer, pool.id).await? else {
            panic!("expected completion");
        };

        assert_eq!(purchases.len(), 3);
        let today = chrono::Utc::now().date_naive();
        for (purchase, user) in purchases.iter().zip(&users) {
            assert_eq!(purchase.user_id, user.id);
            assert_eq!(purchase.product_id, 42);
            assert_eq!(purchase.pool_id, Some(pool.id));
            assert_eq!(purchase.quantity, 1);
            assert_eq!(purchase.voucher_code.len(), 5);
            assert_eq!(
                purchase.expiry_date,
                crate::core::voucher::expiry_date(today, 3).unwrap()
            );
        }
        assert_eq!(pool_state(&db, pool.id).await?, PoolState::Complete);
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_twice_is_noop() -> Result<()> {
        let db = setup_test_db().await?;
        let issuer = VoucherIssuer::seeded(2, 3);
        let users = create_test_users(&db, 2).await?;
        let pool = insert_raw_pool(&db, 1, users[0].id, 2).await?;
        for user in &users {
            enroll(&db, pool.id, user.id).await?;
        }

        assert!(matches!(
            complete(&db, &issuer, pool.id).await?,
            Completion::Completed(_)
        ));
        assert_eq!(
            complete(&db, &issuer, pool.id).await?,
            Completion::AlreadyComplete
        );
        assert_eq!(get_purchases_for_pool(&db, pool.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_below_threshold() -> Result<()> {
        let db = setup_test_db().await?;
        let issuer = VoucherIssuer::seeded(3, 3);
        let users = create_test_users(&db, 1).await?;
        let pool = insert_raw_pool(&db, 1, users[0].id, 2).await?;
        enroll(&db, pool.id, users[0].id).await?;

        let outcome = complete(&db, &issuer, pool.id).await?;
        assert_eq!(
            outcome,
            Completion::BelowThreshold {
                count: 1,
                target: 2
            }
        );
        assert!(!outcome.is_complete());
        assert_eq!(pool_state(&db, pool.id).await?, PoolState::Open);
        assert!(get_purchases_for_pool(&db, pool.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_missing_pool() -> Result<()> {
        let db = setup_test_db().await?;
        let issuer = VoucherIssuer::seeded(4, 3);

        let result = complete(&db, &issuer, 77).await;
        assert!(matches!(result, Err(Error::PoolNotFound { pool_id: 77 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_fan_out_leaves_pool_open() -> Result<()> {
        let db = setup_test_db().await?;
        let issuer = VoucherIssuer::seeded(5, 3);
        let users = create_test_users(&db, 2).await?;
        let pool = insert_raw_pool(&db, 1, users[0].id, 2).await?;
        for user in &users {
            enroll(&db, pool.id, user.id).await?;
        }

        db.execute_unprepared("DROP TABLE purchases").await?;
        assert!(complete(&db, &issuer, pool.id).await.is_err());
        assert_eq!(pool_state(&db, pool.id).await?, PoolState::Open);

        crate::config::database::create_tables(&db).await?;
        assert!(complete(&db, &issuer, pool.id).await?.is_complete());
        assert_eq!(get_purchases_for_pool(&db, pool.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_on_complete_pool_is_noop() -> Result<()> {
        let db = setup_test_db().await?;
        let issuer = VoucherIssuer::seeded(6, 3);
        let users = create_test_users(&db, 1).await?;
        let pool = insert_raw_pool(&db, 1, users[0].id, 1).await?;
        enroll(&db, pool.id, users[0].id).await?;
        mark_complete(&db, pool.id).await?;

        assert_eq!(
            complete(&db, &issuer, pool.id).await?,
            Completion::AlreadyComplete
        );
        assert!(get_purchases_for_pool(&db, pool.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_complete_issues_once() -> Result<()> {
        let (_dir, db) = setup_file_test_db().await?;
        let db = Arc::new(db);
        let issuer = Arc::new(VoucherIssuer::seeded(7, 3));
        let users = create_test_users(&db, 3).await?;
        let pool = insert_raw_pool(&db, 1, users[0].id, 3).await?;
        for user in &users {
            enroll(&*db, pool.id, user.id).await?;
        }
        let pool_id = pool.id;

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let db = Arc::clone(&db);
            let issuer = Arc::clone(&issuer);
            tasks.spawn(async move { complete(&*db, &issuer, pool_id).await });
        }

        let mut completed = 0;
        let mut already = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap()? {
                Completion::Completed(purchases) => {
                    assert_eq!(purchases.len(), 3);
                    completed += 1;
                }
                Completion::AlreadyComplete => already += 1,
                other @ Completion::BelowThreshold { .. } => panic!("unexpected {other:?}"),
            }
        }

        assert_eq!(completed, 1);
        assert_eq!(already, 7);
        assert_eq!(get_purchases_for_pool(&*db, pool_id).await?.len(), 3);
        assert_eq!(pool_state(&*db, pool_id).await?, PoolState::Complete);
        Ok(())
    }
}
