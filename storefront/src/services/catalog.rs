// storefront/src/services/catalog.rs

//! Read side of the product catalog: listing and detail with projections.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Product, SellerSummary, StoredImage, User};
use crate::store::{PageRequest, Store};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
  pub user: Uuid,
  /// Reviewer name; only resolved on the detail view.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  pub rating: u8,
  pub comment: Option<String>,
  pub date: DateTime<Utc>,
}

/// A product as returned to clients, with the seller projected to `{id, name, email}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub category: String,
  pub stock: i64,
  /// `None` when the seller account no longer exists.
  pub seller: Option<SellerSummary>,
  pub photos: Vec<StoredImage>,
  pub main_photo: StoredImage,
  pub ratings: Vec<RatingView>,
  pub average_rating: f64,
  pub num_reviews: i64,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ProductView {
  pub fn new(product: Product, seller: Option<SellerSummary>, reviewer_names: &HashMap<Uuid, String>) -> Self {
    let ratings = product
      .ratings
      .into_iter()
      .map(|r| RatingView {
        user: r.user_id,
        name: reviewer_names.get(&r.user_id).cloned(),
        rating: r.rating,
        comment: r.comment,
        date: r.date,
      })
      .collect();
    Self {
      id: product.id,
      name: product.name,
      description: product.description,
      price_cents: product.price_cents,
      category: product.category,
      stock: product.stock,
      seller,
      photos: product.photos,
      main_photo: product.main_photo,
      ratings,
      average_rating: product.average_rating,
      num_reviews: product.num_reviews,
      is_active: product.is_active,
      created_at: product.created_at,
      updated_at: product.updated_at,
    }
  }
}

fn index_users(users: Vec<User>) -> HashMap<Uuid, User> {
  users.into_iter().map(|u| (u.id, u)).collect()
}

/// All products, newest first, optionally paginated.
#[instrument(name = "catalog::list_products", skip(store))]
pub async fn list_products(store: &dyn Store, page: PageRequest) -> Result<Vec<ProductView>> {
  let products = store.list_products(page).await?;

  let mut seller_ids: Vec<Uuid> = products.iter().map(|p| p.seller_id).collect();
  seller_ids.sort_unstable();
  seller_ids.dedup();
  let sellers = index_users(store.find_users(&seller_ids).await?);

  let no_names = HashMap::new();
  let views: Vec<ProductView> = products
    .into_iter()
    .map(|p| {
      let seller = sellers.get(&p.seller_id).map(User::seller_summary);
      ProductView::new(p, seller, &no_names)
    })
    .collect();
  info!(count = views.len(), "Products listed.");
  Ok(views)
}

/// One product with its seller and every rating's reviewer name resolved.
#[instrument(name = "catalog::get_product", skip(store))]
pub async fn get_product(store: &dyn Store, id: Uuid) -> Result<ProductView> {
  let product = store.find_product(id).await?.ok_or_else(|| {
    warn!("Product not found.");
    AppError::NotFound("Product not found".to_string())
  })?;
  present(store, product).await
}

/// Builds the detail view of an already loaded product.
pub async fn present(store: &dyn Store, product: Product) -> Result<ProductView> {
  let mut ids: Vec<Uuid> = product.ratings.iter().map(|r| r.user_id).collect();
  ids.push(product.seller_id);
  ids.sort_unstable();
  ids.dedup();
  let users = index_users(store.find_users(&ids).await?);

  let seller = users.get(&product.seller_id).map(User::seller_summary);
  let names: HashMap<Uuid, String> = users.into_iter().map(|(id, u)| (id, u.name)).collect();
  Ok(ProductView::new(product, seller, &names))
}
