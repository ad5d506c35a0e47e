//! Pool entity - One pooled offer ("group buy") on one product.
//!
//! A pool starts `open` and moves to `complete` exactly once, when its member
//! count first reaches `target_count`. The member count itself is never stored;
//! it is always derived from the `memberships` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a pool. The only transition is `Open` to `Complete`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PoolState {
    /// Accepting members
    #[sea_orm(string_value = "open")]
    Open,
    /// Target reached and vouchers issued; terminal
    #[sea_orm(string_value = "complete")]
    Complete,
}

/// Pool database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pools")]
pub struct Model {
    /// Unique identifier for the pool
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product the pool buys; owned by the external catalogue
    pub product_id: i64,
    /// User who opened the pool
    pub creator_id: i64,
    /// Discount granted on completion, in percent
    pub discount_rate: i32,
    /// Member count at which the pool completes
    pub target_count: i32,
    /// Current lifecycle state
    pub state: PoolState,
    /// When the pool was opened
    pub created_at: DateTimeUtc,
    /// Advertised deadline; informational only
    pub end_time: DateTimeUtc,
}

impl Model {
    /// Whether the pool still accepts members.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == PoolState::Open
    }

    /// Target as an unsigned count, never below one.
    #[must_use]
    pub fn target(&self) -> u64 {
        u64::try_from(self.target_count.max(1)).unwrap_or(1)
    }
}

/// Defines relationships between Pool and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each pool is opened by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id"
    )]
    Creator,
    /// One pool has many memberships
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
    /// One pool produces many purchases on completion
    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchases,
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
