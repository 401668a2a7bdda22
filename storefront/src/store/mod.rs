// storefront/src/store/mod.rs

//! Persistence behind a trait, with in-memory and Postgres backends.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{Product, Review, Session, User};

pub const MAX_PAGE_LIMIT: u32 = 100;

/// `?page=&limit=` for product listings. Pages are 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
  pub page: Option<u32>,
  pub limit: Option<u32>,
}

impl PageRequest {
  /// Returns `(offset, limit)`, or `None` when no pagination was asked for.
  pub fn window(&self) -> Option<(usize, usize)> {
    if self.page.is_none() && self.limit.is_none() {
      return None;
    }
    let limit = self.limit.unwrap_or(MAX_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT) as usize;
    let page = self.page.unwrap_or(1).max(1) as usize;
    Some(((page - 1) * limit, limit))
  }
}

#[async_trait]
pub trait Store: Send + Sync {
  // --- Users ---
  async fn insert_user(&self, user: &User) -> Result<()>;
  async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>>;
  async fn list_users(&self) -> Result<Vec<User>>;
  async fn update_user(&self, user: &User) -> Result<()>;
  /// Removes the user and their sessions. Returns whether a user was removed.
  async fn delete_user(&self, id: Uuid) -> Result<bool>;

  // --- Sessions ---
  async fn insert_session(&self, session: &Session) -> Result<()>;
  async fn find_session(&self, token: &str) -> Result<Option<Session>>;
  async fn delete_session(&self, token: &str) -> Result<bool>;

  // --- Products ---
  async fn insert_product(&self, product: &Product) -> Result<()>;
  async fn find_product(&self, id: Uuid) -> Result<Option<Product>>;
  async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
  /// Newest first.
  async fn list_products(&self, page: PageRequest) -> Result<Vec<Product>>;
  async fn count_products(&self) -> Result<u64>;
  async fn update_product(&self, product: &Product) -> Result<()>;
  async fn delete_product(&self, id: Uuid) -> Result<bool>;

  // --- Reviews ---
  async fn insert_review(&self, review: &Review) -> Result<()>;
  async fn find_review(&self, id: Uuid) -> Result<Option<Review>>;
  async fn find_review_by_author(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Review>>;
  /// Newest first.
  async fn list_reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>>;
  /// Newest first.
  async fn list_reviews_by_user(&self, user_id: Uuid) -> Result<Vec<Review>>;
  async fn update_review(&self, review: &Review) -> Result<()>;
  async fn delete_review(&self, id: Uuid) -> Result<bool>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_window_defaults_and_caps() {
    assert_eq!(PageRequest::default().window(), None);
    let req = PageRequest {
      page: Some(3),
      limit: Some(10),
    };
    assert_eq!(req.window(), Some((20, 10)));
    let capped = PageRequest {
      page: None,
      limit: Some(1000),
    };
    assert_eq!(capped.window(), Some((0, 100)));
    let zero = PageRequest {
      page: Some(0),
      limit: Some(0),
    };
    assert_eq!(zero.window(), Some((0, 1)));
  }
}
