//! Discord command implementations organized by category.

/// Group-buy commands
pub mod group_buy;

/// General utility commands
pub mod general;

// Export commands
pub use general::*;
pub use group_buy::*;
