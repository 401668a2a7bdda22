// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{required_text, FormFields, StoredImage};
use crate::errors::AppError;

/// A rating stored inside its product document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedRating {
  pub user_id: Uuid,
  pub rating: u8,
  pub comment: Option<String>,
  pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub category: String,
  pub stock: i64,
  pub seller_id: Uuid,
  pub photos: Vec<StoredImage>,
  pub main_photo: StoredImage,
  pub ratings: Vec<EmbeddedRating>,
  pub average_rating: f64,
  pub num_reviews: i64,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  /// Builds a product from validated fields. `photos` must be non-empty; the
  /// first one becomes the main photo.
  pub fn create(seller_id: Uuid, fields: NewProduct, photos: Vec<StoredImage>) -> Result<Self, AppError> {
    let main_photo = photos
      .first()
      .cloned()
      .ok_or_else(|| AppError::Validation("Please upload at least one photo".to_string()))?;
    let now = Utc::now();
    Ok(Self {
      id: Uuid::new_v4(),
      name: fields.name,
      description: fields.description,
      price_cents: fields.price_cents,
      category: fields.category,
      stock: fields.stock,
      seller_id,
      photos,
      main_photo,
      ratings: Vec::new(),
      average_rating: 0.0,
      num_reviews: 0,
      is_active: true,
      created_at: now,
      updated_at: now,
    })
  }

  /// Derives `average_rating` and `num_reviews` from `ratings`.
  pub fn recompute_rating_summary(&mut self) {
    if self.ratings.is_empty() {
      self.average_rating = 0.0;
      self.num_reviews = 0;
      return;
    }
    let total: u32 = self.ratings.iter().map(|r| u32::from(r.rating)).sum();
    self.num_reviews = self.ratings.len() as i64;
    self.average_rating = f64::from(total) / self.ratings.len() as f64;
  }

  pub fn has_rating_from(&self, user_id: Uuid) -> bool {
    self.ratings.iter().any(|r| r.user_id == user_id)
  }

  /// Appends a rating from `user_id` and refreshes the summary.
  pub fn add_rating(&mut self, user_id: Uuid, rating: u8, comment: Option<String>) -> Result<(), AppError> {
    if self.has_rating_from(user_id) {
      return Err(AppError::Conflict("Product already reviewed".to_string()));
    }
    self.ratings.push(EmbeddedRating {
      user_id,
      rating: validate_rating(i64::from(rating))?,
      comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
      date: Utc::now(),
    });
    self.recompute_rating_summary();
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Applies scalar changes. `None` keeps the stored value.
  pub fn apply_patch(&mut self, patch: &ProductPatch) {
    if let Some(v) = &patch.name {
      self.name = v.clone();
    }
    if let Some(v) = &patch.description {
      self.description = v.clone();
    }
    if let Some(v) = patch.price_cents {
      self.price_cents = v;
    }
    if let Some(v) = &patch.category {
      self.category = v.clone();
    }
    if let Some(v) = patch.stock {
      self.stock = v;
    }
    if let Some(v) = patch.is_active {
      self.is_active = v;
    }
    self.updated_at = Utc::now();
  }

  /// Swaps in a new photo set and returns the previous one.
  pub fn replace_photos(&mut self, photos: Vec<StoredImage>) -> Result<Vec<StoredImage>, AppError> {
    let main_photo = photos
      .first()
      .cloned()
      .ok_or_else(|| AppError::Validation("Replacement photo set cannot be empty.".to_string()))?;
    self.main_photo = main_photo;
    self.updated_at = Utc::now();
    Ok(std::mem::replace(&mut self.photos, photos))
  }
}

/// Validated fields for a new product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub category: String,
  pub stock: i64,
}

impl NewProduct {
  pub fn from_fields(fields: &FormFields) -> Result<Self, AppError> {
    Ok(Self {
      name: required_text(fields, "name")?,
      description: required_text(fields, "description")?,
      price_cents: parse_price_cents(&required_text(fields, "price")?)?,
      category: required_text(fields, "category")?,
      stock: parse_stock(&required_text(fields, "stock")?)?,
    })
  }
}

/// Partial update of a product. A present field is applied even when it is
/// zero; a present text field must not be blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price_cents: Option<i64>,
  pub category: Option<String>,
  pub stock: Option<i64>,
  pub is_active: Option<bool>,
}

impl ProductPatch {
  pub fn from_fields(fields: &FormFields) -> Result<Self, AppError> {
    let text = |key: &str| -> Result<Option<String>, AppError> {
      match fields.get(key) {
        None => Ok(None),
        Some(_) => required_text(fields, key).map(Some),
      }
    };
    Ok(Self {
      name: text("name")?,
      description: text("description")?,
      price_cents: fields.get("price").map(|v| parse_price_cents(v)).transpose()?,
      category: text("category")?,
      stock: fields.get("stock").map(|v| parse_stock(v)).transpose()?,
      is_active: fields
        .get("isActive")
        .map(|v| {
          v.trim()
            .parse::<bool>()
            .map_err(|_| AppError::Validation("isActive must be true or false.".to_string()))
        })
        .transpose()?,
    })
  }

  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

/// Parses a decimal price such as `19.99` into integer cents.
pub fn parse_price_cents(raw: &str) -> Result<i64, AppError> {
  let invalid = || AppError::Validation(format!("Invalid price '{}'.", raw.trim()));
  let price = Decimal::from_str(raw.trim()).map_err(|_| invalid())?;
  if price.is_sign_negative() && !price.is_zero() {
    return Err(AppError::Validation("Price cannot be negative.".to_string()));
  }
  let cents = price.checked_mul(Decimal::ONE_HUNDRED).ok_or_else(invalid)?;
  if !cents.fract().is_zero() {
    return Err(AppError::Validation("Price has more than two decimal places.".to_string()));
  }
  cents.to_i64().ok_or_else(invalid)
}

fn parse_stock(raw: &str) -> Result<i64, AppError> {
  let stock = raw
    .trim()
    .parse::<i64>()
    .map_err(|_| AppError::Validation(format!("Invalid stock '{}'.", raw.trim())))?;
  if stock < 0 {
    return Err(AppError::Validation("Stock cannot be negative.".to_string()));
  }
  Ok(stock)
}

/// Checks a 1..=5 score.
pub fn validate_rating(rating: i64) -> Result<u8, AppError> {
  match u8::try_from(rating) {
    Ok(r @ 1..=5) => Ok(r),
    _ => Err(AppError::Validation("Rating must be between 1 and 5.".to_string())),
  }
}
