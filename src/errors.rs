//! Unified error type for the group-buy engine.
//!
//! Every operation returns [`Result`]. Store failures are classified when they
//! are converted from [`DbErr`], so callers can tell a retryable conflict from
//! an unreachable store without inspecting driver messages.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All failures surfaced by the engine and its surrounding layers.
#[derive(Debug, Error)]
pub enum Error {
    /// A required identifier or value is missing or out of range.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the request
        message: String,
    },

    /// The user is already a member of the pool.
    #[error("User {user_id} already joined group buy {pool_id}")]
    AlreadyJoined {
        /// Pool that was targeted
        pool_id: i64,
        /// User that tried to join again
        user_id: i64,
    },

    /// The pool does not exist or is no longer open.
    #[error("Group buy {pool_id} not available")]
    PoolNotFound {
        /// Pool that was targeted
        pool_id: i64,
    },

    /// A concurrent write won; the operation left no effect and can be retried.
    #[error("Storage conflict: {message}")]
    StorageConflict {
        /// Driver message describing the conflict
        message: String,
    },

    /// The store could not be reached.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        /// Driver message describing the failure
        message: String,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Any other store failure.
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Required environment variable is missing.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serenity/Poise framework failure.
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl Error {
    /// HTTP-style status the API layer should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } | Self::AlreadyJoined { .. } => 400,
            Self::PoolNotFound { .. } => 404,
            Self::StorageConflict { .. } => 409,
            Self::StorageUnavailable { .. } => 503,
            _ => 500,
        }
    }

    /// Whether repeating the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageConflict { .. })
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => {
                return Self::StorageConflict { message };
            }
            Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
                return Self::InvalidInput {
                    message: format!("unknown reference: {message}"),
                };
            }
            _ => {}
        }

        match err {
            DbErr::ConnectionAcquire(e) => Self::StorageUnavailable {
                message: e.to_string(),
            },
            DbErr::Conn(e) => Self::StorageUnavailable {
                message: e.to_string(),
            },
            other if is_busy(&other) => Self::StorageConflict {
                message: other.to_string(),
            },
            other => Self::Database(other),
        }
    }
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

// SQLite reports lock contention only through the message text.
fn is_busy(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("database is locked") || message.contains("database table is locked")
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    #[test]
    fn test_status_codes() {
        let invalid = Error::InvalidInput {
            message: "no user".to_string(),
        };
        assert_eq!(invalid.status_code(), 400);
        assert_eq!(
            Error::AlreadyJoined {
                pool_id: 1,
                user_id: 2
            }
            .status_code(),
            400
        );
        assert_eq!(Error::PoolNotFound { pool_id: 1 }.status_code(), 404);
        assert_eq!(
            Error::StorageConflict {
                message: String::new()
            }
            .status_code(),
            409
        );
        assert_eq!(
            Error::StorageUnavailable {
                message: String::new()
            }
            .status_code(),
            503
        );
    }

    #[test]
    fn test_connection_errors_are_unavailable() {
        let err = Error::from(DbErr::Conn(RuntimeErr::Internal("refused".to_string())));
        assert!(matches!(err, Error::StorageUnavailable { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_locked_database_is_conflict() {
        let err = Error::from(DbErr::Exec(RuntimeErr::Internal(
            "database is locked".to_string(),
        )));
        assert!(matches!(err, Error::StorageConflict { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = Error::from(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, Error::Database(_)));
        assert_eq!(err.status_code(), 500);
    }
}
