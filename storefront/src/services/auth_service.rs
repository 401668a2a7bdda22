// storefront/src/services/auth_service.rs

//! Password hashing, session tokens and bearer-token resolution.

use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{Duration, Utc};
use rand_core::RngCore;
use tracing::{debug, error, instrument, warn};

use crate::errors::{AppError, Result};
use crate::models::{Role, Session, User};
use crate::store::Store;

pub const MIN_PASSWORD_LEN: usize = 8;
const TOKEN_BYTES: usize = 32;

/// Hashes a plain-text password using Argon2 with a random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    error!("Password hashing failed: Password cannot be empty.");
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// Verifies a plain-text password against a stored Argon2 hash.
///
/// Returns `Ok(false)` on mismatch; errors only when the stored hash is unusable.
#[instrument(
  name = "auth_service::verify_password",
  skip(hashed_password_str, provided_password),
  err(Display),
  fields(hash_len = hashed_password_str.len())
)]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

/// Checks the email shape and password length accepted at registration.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
  let email = email.trim();
  let well_formed = match email.split_once('@') {
    Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
    None => false,
  };
  if !well_formed {
    warn!("Invalid email format provided for signup.");
    return Err(AppError::Validation("Valid email is required.".to_string()));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    warn!("Password too short for signup ({} chars).", password.chars().count());
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters long.",
      MIN_PASSWORD_LEN
    )));
  }
  Ok(())
}

/// Role granted at sign-up. Admin cannot be self-assigned.
pub fn signup_role(requested: Option<&str>) -> Role {
  match requested.and_then(|r| r.parse::<Role>().ok()) {
    Some(Role::Seller) => Role::Seller,
    Some(Role::Admin) => {
      warn!("Self-assigned admin role requested at signup; falling back to buyer.");
      Role::Buyer
    }
    _ => Role::Buyer,
  }
}

/// Random hex token for a new session.
pub fn new_session_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[instrument(name = "auth_service::issue_session", skip(store), fields(user_id = %user_id))]
pub async fn issue_session(store: &dyn Store, user_id: uuid::Uuid, ttl_hours: i64) -> Result<Session> {
  let session = Session::new(new_session_token(), user_id, Duration::hours(ttl_hours));
  store.insert_session(&session).await?;
  debug!("Session issued.");
  Ok(session)
}

/// Resolves a bearer token to its user. Expired sessions are removed.
#[instrument(name = "auth_service::resolve_token", skip_all)]
pub async fn resolve_token(store: &dyn Store, token: &str) -> Result<User> {
  let unauthorized = || AppError::Auth("Not authorized, token failed".to_string());

  let session = store.find_session(token).await?.ok_or_else(unauthorized)?;
  if session.is_expired_at(Utc::now()) {
    debug!(user_id = %session.user_id, "Session expired.");
    store.delete_session(token).await?;
    return Err(unauthorized());
  }
  store.find_user(session.user_id).await?.ok_or_else(unauthorized)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("correct horse").unwrap();
    assert!(verify_password(&hash, "correct horse").unwrap());
    assert!(!verify_password(&hash, "wrong horse").unwrap());
    assert!(!verify_password(&hash, "").unwrap());
    assert!(verify_password("not-a-hash", "x").is_err());
  }

  #[test]
  fn credential_rules() {
    assert!(validate_credentials("a@b.io", "12345678").is_ok());
    assert!(validate_credentials("a@b", "12345678").is_err());
    assert!(validate_credentials("@b.io", "12345678").is_err());
    assert!(validate_credentials("a@b.io", "short").is_err());
  }

  #[test]
  fn admin_cannot_be_self_assigned() {
    assert_eq!(signup_role(Some("admin")), Role::Buyer);
    assert_eq!(signup_role(Some("seller")), Role::Seller);
    assert_eq!(signup_role(Some("pirate")), Role::Buyer);
    assert_eq!(signup_role(None), Role::Buyer);
  }

  #[test]
  fn tokens_are_unique_hex() {
    let a = new_session_token();
    assert_eq!(a.len(), TOKEN_BYTES * 2);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, new_session_token());
  }

  #[tokio::test]
  async fn expired_sessions_are_rejected_and_removed() {
    let store = MemoryStore::new();
    let user = User::new("Bo".into(), "bo@example.com".into(), "h".into(), Role::Buyer);
    store.insert_user(&user).await.unwrap();

    let live = issue_session(&store, user.id, 1).await.unwrap();
    assert_eq!(resolve_token(&store, &live.token).await.unwrap().id, user.id);

    let mut stale = Session::new("stale".into(), user.id, Duration::hours(1));
    stale.expires_at = Utc::now() - Duration::minutes(1);
    store.insert_session(&stale).await.unwrap();
    assert!(matches!(resolve_token(&store, "stale").await, Err(AppError::Auth(_))));
    assert!(store.find_session("stale").await.unwrap().is_none());
    assert!(resolve_token(&store, "unknown").await.is_err());
  }
}
