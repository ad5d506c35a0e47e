/// Database connection and schema management
pub mod database;

/// Group-buy rules loaded from config.toml
pub mod group_buy;

pub use group_buy::{AppConfig, GroupBuySettings};
