//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod membership;
pub mod pool;
pub mod purchase;
pub mod user;

// Re-export specific types to avoid conflicts
pub use membership::{
    Column as MembershipColumn, Entity as Membership, Model as MembershipModel,
};
pub use pool::{Column as PoolColumn, Entity as Pool, Model as PoolModel, PoolState};
pub use purchase::{Column as PurchaseColumn, Entity as Purchase, Model as PurchaseModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
