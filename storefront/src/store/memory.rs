// storefront/src/store/memory.rs

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{PageRequest, Store};
use crate::errors::{AppError, Result};
use crate::models::{Product, Review, Session, User};

#[derive(Default)]
struct Tables {
  users: Vec<User>,
  sessions: HashMap<String, Session>,
  products: Vec<Product>,
  reviews: Vec<Review>,
}

/// Process-local store. Records keep insertion order so that equal
/// timestamps still list newest-inserted first.
#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
  fail_product_writes: AtomicBool,
  fail_review_writes: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Makes every product insert/update fail with a storage error.
  pub fn fail_product_writes(&self, fail: bool) {
    self.fail_product_writes.store(fail, Ordering::SeqCst);
  }

  /// Makes every review insert/update fail with a storage error.
  pub fn fail_review_writes(&self, fail: bool) {
    self.fail_review_writes.store(fail, Ordering::SeqCst);
  }

  fn check_writable(flag: &AtomicBool, what: &str) -> Result<()> {
    if flag.load(Ordering::SeqCst) {
      warn!(collection = what, "Injected write failure.");
      return Err(AppError::Internal(format!("injected {} write failure", what)));
    }
    Ok(())
  }
}

fn newest_first<T: Clone>(items: impl DoubleEndedIterator<Item = T>, created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
  let mut out: Vec<T> = items.rev().collect();
  out.sort_by_key(|item| std::cmp::Reverse(created(item)));
  out
}

#[async_trait]
impl Store for MemoryStore {
  async fn insert_user(&self, user: &User) -> Result<()> {
    let mut tables = self.tables.write();
    if tables.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
      return Err(AppError::Validation("An account with this email already exists.".to_string()));
    }
    tables.users.push(user.clone());
    debug!(user_id = %user.id, "User inserted.");
    Ok(())
  }

  async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.tables.read().users.iter().find(|u| u.id == id).cloned())
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(
      self
        .tables
        .read()
        .users
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(email))
        .cloned(),
    )
  }

  async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
    Ok(self.tables.read().users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    Ok(self.tables.read().users.clone())
  }

  async fn update_user(&self, user: &User) -> Result<()> {
    let mut tables = self.tables.write();
    match tables.users.iter_mut().find(|u| u.id == user.id) {
      Some(slot) => {
        *slot = user.clone();
        Ok(())
      }
      None => Err(AppError::NotFound("User not found".to_string())),
    }
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    let before = tables.users.len();
    tables.users.retain(|u| u.id != id);
    tables.sessions.retain(|_, s| s.user_id != id);
    Ok(tables.users.len() != before)
  }

  async fn insert_session(&self, session: &Session) -> Result<()> {
    self.tables.write().sessions.insert(session.token.clone(), session.clone());
    Ok(())
  }

  async fn find_session(&self, token: &str) -> Result<Option<Session>> {
    Ok(self.tables.read().sessions.get(token).cloned())
  }

  async fn delete_session(&self, token: &str) -> Result<bool> {
    Ok(self.tables.write().sessions.remove(token).is_some())
  }

  async fn insert_product(&self, product: &Product) -> Result<()> {
    Self::check_writable(&self.fail_product_writes, "product")?;
    self.tables.write().products.push(product.clone());
    Ok(())
  }

  async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.read().products.iter().find(|p| p.id == id).cloned())
  }

  async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    Ok(
      self
        .tables
        .read()
        .products
        .iter()
        .filter(|p| ids.contains(&p.id))
        .cloned()
        .collect(),
    )
  }

  async fn list_products(&self, page: PageRequest) -> Result<Vec<Product>> {
    let all = {
      let tables = self.tables.read();
      newest_first(tables.products.iter().cloned(), |p: &Product| p.created_at)
    };
    Ok(match page.window() {
      Some((offset, limit)) => all.into_iter().skip(offset).take(limit).collect(),
      None => all,
    })
  }

  async fn count_products(&self) -> Result<u64> {
    Ok(self.tables.read().products.len() as u64)
  }

  async fn update_product(&self, product: &Product) -> Result<()> {
    Self::check_writable(&self.fail_product_writes, "product")?;
    let mut tables = self.tables.write();
    match tables.products.iter_mut().find(|p| p.id == product.id) {
      Some(slot) => {
        *slot = product.clone();
        Ok(())
      }
      None => Err(AppError::NotFound("Product not found".to_string())),
    }
  }

  async fn delete_product(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    let before = tables.products.len();
    tables.products.retain(|p| p.id != id);
    Ok(tables.products.len() != before)
  }

  async fn insert_review(&self, review: &Review) -> Result<()> {
    Self::check_writable(&self.fail_review_writes, "review")?;
    self.tables.write().reviews.push(review.clone());
    Ok(())
  }

  async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
    Ok(self.tables.read().reviews.iter().find(|r| r.id == id).cloned())
  }

  async fn find_review_by_author(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Review>> {
    Ok(
      self
        .tables
        .read()
        .reviews
        .iter()
        .find(|r| r.user_id == user_id && r.product_id == product_id)
        .cloned(),
    )
  }

  async fn list_reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
    let tables = self.tables.read();
    Ok(newest_first(
      tables.reviews.iter().filter(|r| r.product_id == product_id).cloned(),
      |r: &Review| r.created_at,
    ))
  }

  async fn list_reviews_by_user(&self, user_id: Uuid) -> Result<Vec<Review>> {
    let tables = self.tables.read();
    Ok(newest_first(
      tables.reviews.iter().filter(|r| r.user_id == user_id).cloned(),
      |r: &Review| r.created_at,
    ))
  }

  async fn update_review(&self, review: &Review) -> Result<()> {
    Self::check_writable(&self.fail_review_writes, "review")?;
    let mut tables = self.tables.write();
    match tables.reviews.iter_mut().find(|r| r.id == review.id) {
      Some(slot) => {
        *slot = review.clone();
        Ok(())
      }
      None => Err(AppError::NotFound("Review not found".to_string())),
    }
  }

  async fn delete_review(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    let before = tables.reviews.len();
    tables.reviews.retain(|r| r.id != id);
    Ok(tables.reviews.len() != before)
  }
}
