// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::StoredImage;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  Buyer,
  Seller,
  Admin,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Buyer => "buyer",
      Role::Seller => "seller",
      Role::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "buyer" => Ok(Role::Buyer),
      "seller" => Ok(Role::Seller),
      "admin" => Ok(Role::Admin),
      other => Err(AppError::Validation(format!("Unknown role '{}'.", other))),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub street: Option<String>,
  pub city: Option<String>,
  pub state: Option<String>,
  pub country: Option<String>,
  pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub role: Role,
  pub phone: Option<String>,
  pub address: Option<Address>,
  pub avatar: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name,
      email,
      password_hash,
      role,
      phone: None,
      address: None,
      avatar: None,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn seller_summary(&self) -> SellerSummary {
    SellerSummary {
      id: self.id,
      name: self.name.clone(),
      email: self.email.clone(),
    }
  }

  pub fn reviewer_summary(&self) -> ReviewerSummary {
    ReviewerSummary {
      id: self.id,
      name: self.name.clone(),
      avatar: self.avatar.clone(),
    }
  }

  /// Applies a self-service profile patch. Absent fields keep their value.
  pub fn apply_profile_patch(&mut self, patch: ProfilePatch) -> Result<(), AppError> {
    if let Some(name) = patch.name {
      let name = name.trim();
      if name.is_empty() {
        return Err(AppError::Validation("Name cannot be blank.".to_string()));
      }
      self.name = name.to_string();
    }
    if let Some(phone) = patch.phone {
      self.phone = Some(phone.trim().to_string());
    }
    if let Some(addr_patch) = patch.address {
      let mut address = self.address.take().unwrap_or_default();
      if let Some(v) = addr_patch.street {
        address.street = Some(v);
      }
      if let Some(v) = addr_patch.city {
        address.city = Some(v);
      }
      if let Some(v) = addr_patch.state {
        address.state = Some(v);
      }
      if let Some(v) = addr_patch.country {
        address.country = Some(v);
      }
      if let Some(v) = addr_patch.zip_code {
        address.zip_code = Some(v);
      }
      self.address = Some(address);
    }
    self.updated_at = Utc::now();
    Ok(())
  }
}

/// Body of `PUT /api/users/profile/details`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
  pub name: Option<String>,
  pub phone: Option<String>,
  pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerSummary {
  pub id: Uuid,
  pub name: String,
  pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerSummary {
  pub id: Uuid,
  pub name: String,
  pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
  pub id: Uuid,
  pub name: String,
  pub photos: Vec<StoredImage>,
  pub price_cents: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_user() -> User {
    User::new("Ada".into(), "ada@example.com".into(), "hash".into(), Role::Buyer)
  }

  #[test]
  fn password_hash_is_never_serialized() {
    let json = serde_json::to_value(sample_user()).unwrap();
    assert!(json.get("passwordHash").is_none());
    assert_eq!(json["role"], "buyer");
  }

  #[test]
  fn profile_patch_keeps_unset_fields_and_sets_empty_ones() {
    let mut user = sample_user();
    user.phone = Some("555-0100".into());
    user.address = Some(Address {
      city: Some("Lyon".into()),
      ..Default::default()
    });

    user
      .apply_profile_patch(ProfilePatch {
        name: None,
        phone: Some(String::new()),
        address: Some(Address {
          street: Some("1 Rue".into()),
          ..Default::default()
        }),
      })
      .unwrap();

    assert_eq!(user.name, "Ada");
    assert_eq!(user.phone.as_deref(), Some(""));
    let address = user.address.unwrap();
    assert_eq!(address.city.as_deref(), Some("Lyon"));
    assert_eq!(address.street.as_deref(), Some("1 Rue"));
  }

  #[test]
  fn roles_parse_case_insensitively() {
    assert_eq!("Seller".parse::<Role>().unwrap(), Role::Seller);
    assert!("owner".parse::<Role>().is_err());
  }
}
