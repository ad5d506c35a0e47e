//! Purchase queries.
//!
//! Purchases are only written by the completion fan-out; this module reads them
//! back for users and pools.

use crate::{
    entities::{Purchase, purchase},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};

/// All purchases owned by a user, newest first.
pub async fn get_purchases_for_user<C>(db: &C, user_id: i64) -> Result<Vec<purchase::Model>>
where
    C: ConnectionTrait,
{
    Purchase::find()
        .filter(purchase::Column::UserId.eq(user_id))
        .order_by_desc(purchase::Column::CreatedAt)
        .order_by_desc(purchase::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Purchases produced by the completion of one pool, in member join order.
pub async fn get_purchases_for_pool<C>(db: &C, pool_id: i64) -> Result<Vec<purchase::Model>>
where
    C: ConnectionTrait,
{
    Purchase::find()
        .filter(purchase::Column::PoolId.eq(pool_id))
        .order_by_asc(purchase::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
