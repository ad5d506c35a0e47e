//! Purchase entity - A redeemable voucher issued to one user for one product.
//!
//! Pool completion creates one purchase per member with `pool_id` set.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    /// Unique identifier for the purchase
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the voucher
    pub user_id: i64,
    /// Product the voucher is redeemable for
    pub product_id: i64,
    /// Pool whose completion produced this purchase
    pub pool_id: Option<i64>,
    /// Number of units
    pub quantity: i32,
    /// Five characters: three uppercase letters then two digits
    pub voucher_code: String,
    /// Last day the voucher can be redeemed
    pub expiry_date: Date,
    /// When the purchase was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Purchase and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each purchase belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Fan-out purchases belong to the pool that completed
    #[sea_orm(
        belongs_to = "super::pool::Entity",
        from = "Column::PoolId",
        to = "super::pool::Column::Id"
    )]
    Pool,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::pool::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pool.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
