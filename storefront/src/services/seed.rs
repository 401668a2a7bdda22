// storefront/src/services/seed.rs

//! Sample data for an empty catalog.

use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::{NewProduct, Product, Role, StoredImage, User};
use crate::services::auth_service;
use crate::store::Store;

pub const SAMPLE_SELLER_EMAIL: &str = "seller@example.com";
pub const SAMPLE_SELLER_PASSWORD: &str = "password123";

const SAMPLE_PRODUCTS: &[(&str, &str, i64, &str, i64)] = &[
  (
    "Classic Cotton T-Shirt",
    "Premium quality cotton t-shirt with comfortable fit. Available in multiple sizes.",
    1999,
    "clothing",
    100,
  ),
  (
    "Wireless Gaming Mouse",
    "High-precision wireless gaming mouse with RGB lighting and programmable buttons.",
    4999,
    "electronics",
    50,
  ),
  (
    "Graphic Design T-Shirt",
    "Unique graphic design t-shirt made with high-quality print. Perfect for casual wear.",
    2499,
    "clothing",
    75,
  ),
  (
    "Bluetooth Earbuds",
    "True wireless earbuds with noise cancellation and long battery life.",
    8999,
    "electronics",
    30,
  ),
  (
    "Smart Fitness Watch",
    "Track your health and fitness with this advanced smartwatch. Features heart rate monitoring and sleep tracking.",
    12999,
    "electronics",
    40,
  ),
  (
    "Sports T-Shirt",
    "Moisture-wicking sports t-shirt perfect for workouts and running.",
    2999,
    "clothing",
    60,
  ),
  (
    "Mechanical Gaming Keyboard",
    "RGB mechanical keyboard with customizable switches and macro keys.",
    7999,
    "electronics",
    25,
  ),
  (
    "Vintage Band T-Shirt",
    "Classic rock band t-shirt with retro design. Made from soft cotton blend.",
    2299,
    "clothing",
    45,
  ),
];

/// Creates the sample seller and products. Does nothing when products exist.
/// Returns the number of products inserted.
#[instrument(name = "seed::seed_catalog", skip_all)]
pub async fn seed_catalog(store: &dyn Store, config: &AppConfig) -> Result<usize> {
  if store.count_products().await? > 0 {
    info!("Catalog already has products; skipping seed.");
    return Ok(0);
  }

  let seller = match store.find_user_by_email(SAMPLE_SELLER_EMAIL).await? {
    Some(existing) => existing,
    None => {
      let hash = auth_service::hash_password(SAMPLE_SELLER_PASSWORD)?;
      let seller = User::new("Sample Seller".to_string(), SAMPLE_SELLER_EMAIL.to_string(), hash, Role::Seller);
      store.insert_user(&seller).await?;
      seller
    }
  };

  let sample_photo = StoredImage {
    url: format!("{}/samples/sample.jpg", config.image_host_base_url),
    public_id: "samples/sample".to_string(),
  };

  for (name, description, price_cents, category, stock) in SAMPLE_PRODUCTS {
    let fields = NewProduct {
      name: name.to_string(),
      description: description.to_string(),
      price_cents: *price_cents,
      category: category.to_string(),
      stock: *stock,
    };
    let product = Product::create(seller.id, fields, vec![sample_photo.clone()])?;
    store.insert_product(&product).await?;
  }

  info!(count = SAMPLE_PRODUCTS.len(), seller = %seller.id, "Database seeded successfully.");
  Ok(SAMPLE_PRODUCTS.len())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{MemoryStore, PageRequest};

  #[tokio::test]
  async fn seeding_is_idempotent() {
    let store = MemoryStore::new();
    let config = AppConfig::default();
    assert_eq!(seed_catalog(&store, &config).await.unwrap(), SAMPLE_PRODUCTS.len());
    assert_eq!(seed_catalog(&store, &config).await.unwrap(), 0);

    let seller = store.find_user_by_email(SAMPLE_SELLER_EMAIL).await.unwrap().unwrap();
    assert_eq!(seller.role, Role::Seller);
    assert!(auth_service::verify_password(&seller.password_hash, SAMPLE_SELLER_PASSWORD).unwrap());
    let products = store.list_products(PageRequest::default()).await.unwrap();
    assert!(products.iter().all(|p| p.seller_id == seller.id));
  }
}
