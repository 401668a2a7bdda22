// storefront/src/authz.rs

//! Role and ownership rules for every mutating operation.

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Product, Review, Role, User};

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub user_id: Uuid,
  pub role: Role,
}

impl Actor {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

impl From<&User> for Actor {
  fn from(user: &User) -> Self {
    Self {
      user_id: user.id,
      role: user.role,
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
  Catalog,
  Product(&'a Product),
  Review(&'a Review),
  UserDirectory,
  User(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Create,
  Read,
  Update,
  Delete,
  Rate,
  Like,
  List,
  SetRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Deny(String),
}

impl Decision {
  pub fn is_allowed(&self) -> bool {
    matches!(self, Decision::Allow)
  }

  /// Maps a denial to `AppError::Forbidden`.
  pub fn into_result(self) -> Result<(), AppError> {
    match self {
      Decision::Allow => Ok(()),
      Decision::Deny(reason) => Err(AppError::Forbidden(reason)),
    }
  }
}

pub fn authorize(actor: &Actor, resource: Resource<'_>, action: Action) -> Decision {
  let allowed = match (resource, action) {
    (Resource::Catalog, Action::Create) => matches!(actor.role, Role::Seller | Role::Admin),
    (Resource::Catalog, Action::List | Action::Read) => true,
    (Resource::Product(product), Action::Update | Action::Delete) => {
      product.seller_id == actor.user_id || actor.is_admin()
    }
    (Resource::Product(_), Action::Rate | Action::Read) => true,
    (Resource::Review(review), Action::Update | Action::Delete) => review.user_id == actor.user_id,
    (Resource::Review(_), Action::Like | Action::Read) => true,
    (Resource::UserDirectory, Action::List | Action::Read | Action::SetRole | Action::Delete) => actor.is_admin(),
    (Resource::User(user_id), Action::Read | Action::Update) => user_id == actor.user_id,
    _ => false,
  };

  if allowed {
    Decision::Allow
  } else {
    Decision::Deny(denial_message(resource, action))
  }
}

fn denial_message(resource: Resource<'_>, action: Action) -> String {
  match resource {
    Resource::Catalog => "Only sellers can create products".to_string(),
    Resource::Product(_) => format!("Not authorized to {} this product", verb(action)),
    Resource::Review(_) => format!("Not authorized to {} this review", verb(action)),
    Resource::UserDirectory => "Not authorized as an admin".to_string(),
    Resource::User(_) => "Not authorized to modify this profile".to_string(),
  }
}

fn verb(action: Action) -> &'static str {
  match action {
    Action::Create => "create",
    Action::Read | Action::List => "view",
    Action::Update => "update",
    Action::Delete => "delete",
    Action::Rate => "rate",
    Action::Like => "like",
    Action::SetRole => "change the role of",
  }
}
