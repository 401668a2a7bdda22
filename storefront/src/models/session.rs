// storefront/src/models/session.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bearer token issued at sign-up or sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub token: String,
  pub user_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn new(token: String, user_id: Uuid, ttl: Duration) -> Self {
    let now = Utc::now();
    Self {
      token,
      user_id,
      created_at: now,
      expires_at: now + ttl,
    }
  }

  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expiry_is_inclusive() {
    let session = Session::new("t".into(), Uuid::new_v4(), Duration::hours(1));
    assert!(!session.is_expired_at(session.created_at));
    assert!(session.is_expired_at(session.expires_at));
  }
}
