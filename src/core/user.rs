//! User directory - the minimal identity the engine needs.
//!
//! Memberships and purchases reference users by id, and listings show their
//! nicknames. Verification of the external identity happens outside the engine.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};

/// Finds a user by primary key.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by external identity.
pub async fn get_user_by_external_id<C>(db: &C, external_id: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::ExternalId.eq(external_id.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Registers a new user.
///
/// # Errors
/// Returns:
/// - [`Error::InvalidInput`] if either value is blank
/// - [`Error::StorageConflict`] if the external id is already registered
pub async fn register_user<C>(db: &C, external_id: &str, nickname: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    if external_id.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "external id cannot be empty".to_string(),
        });
    }
    if nickname.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "nickname cannot be empty".to_string(),
        });
    }

    user::ActiveModel {
        external_id: Set(external_id.trim().to_string()),
        nickname: Set(nickname.trim().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Returns the user with `external_id`, registering it first if needed.
///
/// A concurrent registration of the same identity is resolved by reading the
/// row the other caller created.
pub async fn ensure_user<C>(db: &C, external_id: &str, nickname: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = get_user_by_external_id(db, external_id).await? {
        return Ok(existing);
    }

    match register_user(db, external_id, nickname).await {
        Err(Error::StorageConflict { .. }) => get_user_by_external_id(db, external_id)
            .await?
            .ok_or_else(|| Error::StorageConflict {
                message: format!("user {external_id} vanished after conflict"),
            }),
        other => other,
    }
}
