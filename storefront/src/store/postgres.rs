// storefront/src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{PageRequest, Store};
use crate::errors::{AppError, Result};
use crate::models::{Address, EmbeddedRating, Product, Review, Session, StoredImage, User};

const SCHEMA: &str = include_str!("schema.sql");

const USER_COLUMNS: &str =
  "id, name, email, password_hash, role, phone, address, avatar, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, category, stock, seller_id, photos, main_photo, \
   ratings, average_rating, num_reviews, is_active, created_at, updated_at";
const REVIEW_COLUMNS: &str =
  "id, user_id, product_id, rating, title, comment, images, likes, verified, created_at, updated_at";

/// Postgres-backed store using runtime queries. Nested collections live in JSONB columns.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPool::connect(database_url).await.map_err(|e| {
      error!(error = %e, "Failed to connect to the database.");
      AppError::Sqlx(e)
    })?;
    info!("Successfully connected to the database.");
    Ok(Self { pool })
  }

  #[instrument(name = "PgStore::apply_schema", skip(self), err(Display))]
  pub async fn apply_schema(&self) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
    info!("Database schema applied.");
    Ok(())
  }
}

#[derive(FromRow)]
struct UserRow {
  id: Uuid,
  name: String,
  email: String,
  password_hash: String,
  role: String,
  phone: Option<String>,
  address: Option<Json<Address>>,
  avatar: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
  type Error = AppError;

  fn try_from(row: UserRow) -> Result<Self> {
    Ok(User {
      id: row.id,
      name: row.name,
      email: row.email,
      password_hash: row.password_hash,
      role: row
        .role
        .parse()
        .map_err(|_| AppError::Internal(format!("Stored role '{}' is not recognised.", row.role)))?,
      phone: row.phone,
      address: row.address.map(|Json(a)| a),
      avatar: row.avatar,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(FromRow)]
struct SessionRow {
  token: String,
  user_id: Uuid,
  created_at: DateTime<Utc>,
  expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
  fn from(row: SessionRow) -> Self {
    Session {
      token: row.token,
      user_id: row.user_id,
      created_at: row.created_at,
      expires_at: row.expires_at,
    }
  }
}

#[derive(FromRow)]
struct ProductRow {
  id: Uuid,
  name: String,
  description: String,
  price_cents: i64,
  category: String,
  stock: i64,
  seller_id: Uuid,
  photos: Json<Vec<StoredImage>>,
  main_photo: Json<StoredImage>,
  ratings: Json<Vec<EmbeddedRating>>,
  average_rating: f64,
  num_reviews: i64,
  is_active: bool,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
  fn from(row: ProductRow) -> Self {
    Product {
      id: row.id,
      name: row.name,
      description: row.description,
      price_cents: row.price_cents,
      category: row.category,
      stock: row.stock,
      seller_id: row.seller_id,
      photos: row.photos.0,
      main_photo: row.main_photo.0,
      ratings: row.ratings.0,
      average_rating: row.average_rating,
      num_reviews: row.num_reviews,
      is_active: row.is_active,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[derive(FromRow)]
struct ReviewRow {
  id: Uuid,
  user_id: Uuid,
  product_id: Uuid,
  rating: i16,
  title: String,
  comment: String,
  images: Json<Vec<StoredImage>>,
  likes: Json<Vec<Uuid>>,
  verified: bool,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
  type Error = AppError;

  fn try_from(row: ReviewRow) -> Result<Self> {
    Ok(Review {
      id: row.id,
      user_id: row.user_id,
      product_id: row.product_id,
      rating: u8::try_from(row.rating)
        .map_err(|_| AppError::Internal(format!("Stored rating {} is out of range.", row.rating)))?,
      title: row.title,
      comment: row.comment,
      images: row.images.0,
      likes: row.likes.0,
      verified: row.verified,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

fn users_from(rows: Vec<UserRow>) -> Result<Vec<User>> {
  rows.into_iter().map(User::try_from).collect()
}

fn reviews_from(rows: Vec<ReviewRow>) -> Result<Vec<Review>> {
  rows.into_iter().map(Review::try_from).collect()
}

fn map_unique_email(err: sqlx::Error) -> AppError {
  match &err {
    sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
      AppError::Validation("An account with this email already exists.".to_string())
    }
    _ => AppError::Sqlx(err),
  }
}

#[async_trait]
impl Store for PgStore {
  async fn insert_user(&self, user: &User) -> Result<()> {
    sqlx::query(
      "INSERT INTO users (id, name, email, password_hash, role, phone, address, avatar, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(&user.phone)
    .bind(user.address.as_ref().map(Json))
    .bind(&user.avatar)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&self.pool)
    .await
    .map_err(map_unique_email)?;
    Ok(())
  }

  async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    row.map(User::try_from).transpose()
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
      "SELECT {} FROM users WHERE lower(email) = lower($1)",
      USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(&self.pool)
    .await?;
    row.map(User::try_from).transpose()
  }

  async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS))
      .bind(ids)
      .fetch_all(&self.pool)
      .await?;
    users_from(rows)
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS))
      .fetch_all(&self.pool)
      .await?;
    users_from(rows)
  }

  async fn update_user(&self, user: &User) -> Result<()> {
    let result = sqlx::query(
      "UPDATE users SET name = $2, email = $3, password_hash = $4, role = $5, phone = $6, address = $7, \
       avatar = $8, updated_at = $9 WHERE id = $1",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(&user.phone)
    .bind(user.address.as_ref().map(Json))
    .bind(&user.avatar)
    .bind(user.updated_at)
    .execute(&self.pool)
    .await
    .map_err(map_unique_email)?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn insert_session(&self, session: &Session) -> Result<()> {
    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)")
      .bind(&session.token)
      .bind(session.user_id)
      .bind(session.created_at)
      .bind(session.expires_at)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn find_session(&self, token: &str) -> Result<Option<Session>> {
    let row: Option<SessionRow> =
      sqlx::query_as("SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = $1")
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
    Ok(row.map(Session::from))
  }

  async fn delete_session(&self, token: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
      .bind(token)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn insert_product(&self, product: &Product) -> Result<()> {
    sqlx::query(&format!(
      "INSERT INTO products ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
      PRODUCT_COLUMNS
    ))
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price_cents)
    .bind(&product.category)
    .bind(product.stock)
    .bind(product.seller_id)
    .bind(Json(&product.photos))
    .bind(Json(&product.main_photo))
    .bind(Json(&product.ratings))
    .bind(product.average_rating)
    .bind(product.num_reviews)
    .bind(product.is_active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Product::from))
  }

  async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    let rows: Vec<ProductRow> =
      sqlx::query_as(&format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
    Ok(rows.into_iter().map(Product::from).collect())
  }

  async fn list_products(&self, page: PageRequest) -> Result<Vec<Product>> {
    let rows: Vec<ProductRow> = match page.window() {
      Some((offset, limit)) => {
        sqlx::query_as(&format!(
          "SELECT {} FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2",
          PRODUCT_COLUMNS
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?
      }
      None => {
        sqlx::query_as(&format!("SELECT {} FROM products ORDER BY created_at DESC", PRODUCT_COLUMNS))
          .fetch_all(&self.pool)
          .await?
      }
    };
    Ok(rows.into_iter().map(Product::from).collect())
  }

  async fn count_products(&self) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
      .fetch_one(&self.pool)
      .await?;
    Ok(count.max(0) as u64)
  }

  async fn update_product(&self, product: &Product) -> Result<()> {
    let result = sqlx::query(
      "UPDATE products SET name = $2, description = $3, price_cents = $4, category = $5, stock = $6, \
       photos = $7, main_photo = $8, ratings = $9, average_rating = $10, num_reviews = $11, is_active = $12, \
       updated_at = $13 WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price_cents)
    .bind(&product.category)
    .bind(product.stock)
    .bind(Json(&product.photos))
    .bind(Json(&product.main_photo))
    .bind(Json(&product.ratings))
    .bind(product.average_rating)
    .bind(product.num_reviews)
    .bind(product.is_active)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound("Product not found".to_string()));
    }
    Ok(())
  }

  async fn delete_product(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn insert_review(&self, review: &Review) -> Result<()> {
    sqlx::query(&format!(
      "INSERT INTO reviews ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
      REVIEW_COLUMNS
    ))
    .bind(review.id)
    .bind(review.user_id)
    .bind(review.product_id)
    .bind(i16::from(review.rating))
    .bind(&review.title)
    .bind(&review.comment)
    .bind(Json(&review.images))
    .bind(Json(&review.likes))
    .bind(review.verified)
    .bind(review.created_at)
    .bind(review.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
    let row: Option<ReviewRow> = sqlx::query_as(&format!("SELECT {} FROM reviews WHERE id = $1", REVIEW_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    row.map(Review::try_from).transpose()
  }

  async fn find_review_by_author(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Review>> {
    let row: Option<ReviewRow> = sqlx::query_as(&format!(
      "SELECT {} FROM reviews WHERE user_id = $1 AND product_id = $2 LIMIT 1",
      REVIEW_COLUMNS
    ))
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await?;
    row.map(Review::try_from).transpose()
  }

  async fn list_reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
    let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
      "SELECT {} FROM reviews WHERE product_id = $1 ORDER BY created_at DESC",
      REVIEW_COLUMNS
    ))
    .bind(product_id)
    .fetch_all(&self.pool)
    .await?;
    reviews_from(rows)
  }

  async fn list_reviews_by_user(&self, user_id: Uuid) -> Result<Vec<Review>> {
    let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
      "SELECT {} FROM reviews WHERE user_id = $1 ORDER BY created_at DESC",
      REVIEW_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    reviews_from(rows)
  }

  async fn update_review(&self, review: &Review) -> Result<()> {
    let result = sqlx::query(
      "UPDATE reviews SET rating = $2, title = $3, comment = $4, images = $5, likes = $6, verified = $7, \
       updated_at = $8 WHERE id = $1",
    )
    .bind(review.id)
    .bind(i16::from(review.rating))
    .bind(&review.title)
    .bind(&review.comment)
    .bind(Json(&review.images))
    .bind(Json(&review.likes))
    .bind(review.verified)
    .bind(review.updated_at)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound("Review not found".to_string()));
    }
    Ok(())
  }

  async fn delete_review(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}
