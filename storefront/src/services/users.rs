// storefront/src/services/users.rs

//! User administration (admin only) and self-service profile updates.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::authz::{authorize, Action, Actor, Resource};
use crate::errors::{AppError, Result};
use crate::models::{ProfilePatch, Role, User};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct RoleChange {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  pub role: Role,
}

fn user_not_found() -> AppError {
  AppError::NotFound("User not found".to_string())
}

#[instrument(name = "users::list_users", skip(store), fields(actor = %actor.user_id))]
pub async fn list_users(store: &dyn Store, actor: &Actor) -> Result<Vec<User>> {
  authorize(actor, Resource::UserDirectory, Action::List).into_result()?;
  store.list_users().await
}

#[instrument(name = "users::get_user", skip(store), fields(actor = %actor.user_id))]
pub async fn get_user(store: &dyn Store, actor: &Actor, id: Uuid) -> Result<User> {
  authorize(actor, Resource::UserDirectory, Action::Read).into_result()?;
  store.find_user(id).await?.ok_or_else(user_not_found)
}

/// Changes a user's role. A missing role keeps the current one.
#[instrument(name = "users::set_role", skip(store), fields(actor = %actor.user_id))]
pub async fn set_role(store: &dyn Store, actor: &Actor, id: Uuid, role: Option<Role>) -> Result<RoleChange> {
  authorize(actor, Resource::UserDirectory, Action::SetRole).into_result()?;
  let mut user = store.find_user(id).await?.ok_or_else(user_not_found)?;
  if let Some(role) = role {
    user.role = role;
    user.updated_at = Utc::now();
    store.update_user(&user).await?;
    info!(new_role = %role, "User role updated.");
  }
  Ok(RoleChange {
    id: user.id,
    name: user.name,
    email: user.email,
    role: user.role,
  })
}

#[instrument(name = "users::delete_user", skip(store), fields(actor = %actor.user_id))]
pub async fn delete_user(store: &dyn Store, actor: &Actor, id: Uuid) -> Result<()> {
  authorize(actor, Resource::UserDirectory, Action::Delete).into_result()?;
  if !store.delete_user(id).await? {
    warn!("Attempt to delete unknown user.");
    return Err(user_not_found());
  }
  info!("User removed.");
  Ok(())
}

#[instrument(name = "users::get_own_profile", skip(store), fields(actor = %actor.user_id))]
pub async fn get_own_profile(store: &dyn Store, actor: &Actor) -> Result<User> {
  authorize(actor, Resource::User(actor.user_id), Action::Read).into_result()?;
  store.find_user(actor.user_id).await?.ok_or_else(user_not_found)
}

#[instrument(name = "users::update_own_profile", skip(store, patch), fields(actor = %actor.user_id))]
pub async fn update_own_profile(store: &dyn Store, actor: &Actor, patch: ProfilePatch) -> Result<User> {
  authorize(actor, Resource::User(actor.user_id), Action::Update).into_result()?;
  let mut user = store.find_user(actor.user_id).await?.ok_or_else(user_not_found)?;
  user.apply_profile_patch(patch)?;
  store.update_user(&user).await?;
  info!("Profile updated.");
  Ok(user)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  async fn seeded(store: &MemoryStore, role: Role) -> User {
    let user = User::new(
      format!("{} user", role),
      format!("{}-{}@example.com", role, Uuid::new_v4().simple()),
      "h".into(),
      role,
    );
    store.insert_user(&user).await.unwrap();
    user
  }

  #[tokio::test]
  async fn directory_requires_admin() {
    let store = MemoryStore::new();
    let buyer = seeded(&store, Role::Buyer).await;
    let admin = seeded(&store, Role::Admin).await;

    let denied = list_users(&store, &Actor::from(&buyer)).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
    assert_eq!(list_users(&store, &Actor::from(&admin)).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn set_role_without_role_keeps_current() {
    let store = MemoryStore::new();
    let admin = Actor::from(&seeded(&store, Role::Admin).await);
    let target = seeded(&store, Role::Buyer).await;

    let unchanged = set_role(&store, &admin, target.id, None).await.unwrap();
    assert_eq!(unchanged.role, Role::Buyer);
    let promoted = set_role(&store, &admin, target.id, Some(Role::Seller)).await.unwrap();
    assert_eq!(promoted.role, Role::Seller);
    assert_eq!(store.find_user(target.id).await.unwrap().unwrap().role, Role::Seller);
  }

  #[tokio::test]
  async fn delete_unknown_user_is_not_found() {
    let store = MemoryStore::new();
    let admin = Actor::from(&seeded(&store, Role::Admin).await);
    assert!(matches!(
      delete_user(&store, &admin, Uuid::new_v4()).await,
      Err(AppError::NotFound(_))
    ));
  }
}
