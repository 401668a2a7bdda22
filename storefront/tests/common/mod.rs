// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::sync::Arc;
use storefront::authz::Actor;
use storefront::models::{FormFields, Product, Role, User};
use storefront::pipelines::contexts::CreateProductCtxData;
use storefront::services::auth_service;
use storefront::services::image_host::{MockImageHost, UploadedFile};
use storefront::store::{MemoryStore, Store};
use storefront::{AppConfig, AppState};
use storefront_flow::ContextData;
use tracing::Level;

pub const TEST_PASSWORD: &str = "secret123";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// App state over an in-memory store and mock image host, with handles kept
/// for fault injection and assertions.
pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub images: Arc<MockImageHost>,
}

pub fn test_app() -> TestApp {
  test_app_with(AppConfig::default())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let images = Arc::new(MockImageHost::new("https://img.test"));
  let state = AppState::new(config, store.clone(), images.clone());
  TestApp { state, store, images }
}

/// Inserts a user directly and opens a session for them.
pub async fn create_user(app: &TestApp, name: &str, role: Role) -> (User, String) {
  let hash = auth_service::hash_password(TEST_PASSWORD).unwrap();
  let email = format!("{}@example.com", name.to_lowercase());
  let user = User::new(name.to_string(), email, hash, role);
  app.store.insert_user(&user).await.unwrap();
  let session = auth_service::issue_session(app.store.as_ref(), user.id, 1).await.unwrap();
  (user, session.token)
}

pub fn actor(user: &User) -> Actor {
  Actor::from(user)
}

pub fn png(name: &str) -> UploadedFile {
  UploadedFile {
    file_name: Some(format!("{}.png", name)),
    content_type: Some("image/png".to_string()),
    bytes: vec![0x89, b'P', b'N', b'G', 1, 2, 3],
  }
}

pub fn fields(pairs: &[(&str, &str)]) -> FormFields {
  pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub fn product_fields() -> FormFields {
  fields(&[
    ("name", "Walnut Desk"),
    ("description", "Solid walnut, oiled"),
    ("price", "249.99"),
    ("category", "furniture"),
    ("stock", "3"),
  ])
}

/// Creates a product through the create pipeline with `photo_count` photos.
pub async fn create_product(app: &TestApp, seller: &User, photo_count: usize) -> Product {
  let files = (0..photo_count).map(|i| png(&format!("photo{}", i))).collect();
  let ctx = ContextData::new(CreateProductCtxData::new(
    app.state.clone(),
    actor(seller),
    product_fields(),
    files,
  ));
  app.state.flow.run(ctx.clone()).await.unwrap();
  let product = ctx.read().created.clone().unwrap();
  product
}
