// storefront/src/models/mod.rs

//! Stored documents and the request-side shapes that build or patch them.

pub mod image;
pub mod product;
pub mod review;
pub mod session;
pub mod user;

pub use image::StoredImage;
pub use product::{EmbeddedRating, NewProduct, Product, ProductPatch};
pub use review::{NewReview, Review, ReviewPatch};
pub use session::Session;
pub use user::{Address, ProductSummary, ProfilePatch, ReviewerSummary, Role, SellerSummary, User};

use std::collections::BTreeMap;

/// Flat text fields submitted with a form or JSON body.
pub type FormFields = BTreeMap<String, String>;

/// Returns the trimmed value of a required text field.
pub(crate) fn required_text(fields: &FormFields, key: &str) -> Result<String, crate::errors::AppError> {
  match fields.get(key).map(|v| v.trim()) {
    Some(v) if !v.is_empty() => Ok(v.to_string()),
    _ => Err(crate::errors::AppError::Validation(format!("Field '{}' is required.", key))),
  }
}
