// storefront/src/models/review.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::validate_rating;
use super::{required_text, FormFields, StoredImage};
use crate::errors::AppError;

const MAX_TITLE_CHARS: usize = 100;
const MAX_COMMENT_CHARS: usize = 500;

/// Keys a review patch may carry.
pub const PATCHABLE_FIELDS: [&str; 3] = ["rating", "title", "comment"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub rating: u8,
  pub title: String,
  pub comment: String,
  pub images: Vec<StoredImage>,
  /// Ids of users who liked the review. No duplicates.
  pub likes: Vec<Uuid>,
  pub verified: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Review {
  pub fn create(user_id: Uuid, fields: NewReview, images: Vec<StoredImage>) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      user_id,
      product_id: fields.product_id,
      rating: fields.rating,
      title: fields.title,
      comment: fields.comment,
      images,
      likes: Vec::new(),
      verified: false,
      created_at: now,
      updated_at: now,
    }
  }

  /// Adds or removes `user_id` from the likes. Returns whether the user now likes it.
  pub fn toggle_like(&mut self, user_id: Uuid) -> bool {
    let liked = match self.likes.iter().position(|id| *id == user_id) {
      Some(idx) => {
        self.likes.remove(idx);
        false
      }
      None => {
        self.likes.push(user_id);
        true
      }
    };
    self.touch();
    liked
  }

  pub fn apply_patch(&mut self, patch: &ReviewPatch) {
    if let Some(rating) = patch.rating {
      self.rating = rating;
    }
    if let Some(title) = &patch.title {
      self.title = title.clone();
    }
    if let Some(comment) = &patch.comment {
      self.comment = comment.clone();
    }
    self.touch();
  }

  pub fn replace_images(&mut self, images: Vec<StoredImage>) -> Vec<StoredImage> {
    self.touch();
    std::mem::replace(&mut self.images, images)
  }

  pub fn touch(&mut self) {
    self.updated_at = Utc::now();
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
  pub product_id: Uuid,
  pub rating: u8,
  pub title: String,
  pub comment: String,
}

impl NewReview {
  pub fn from_fields(fields: &FormFields) -> Result<Self, AppError> {
    let raw_product = required_text(fields, "productId")?;
    let product_id = Uuid::parse_str(&raw_product)
      .map_err(|_| AppError::Validation(format!("Invalid product id '{}'.", raw_product)))?;
    Ok(Self {
      product_id,
      rating: parse_rating(&required_text(fields, "rating")?)?,
      title: validate_title(fields.get("title").map(String::as_str).unwrap_or_default())?,
      comment: validate_comment(fields.get("comment").map(String::as_str).unwrap_or_default())?,
    })
  }
}

/// Changes to a review. Only `rating`, `title` and `comment` may be patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPatch {
  pub rating: Option<u8>,
  pub title: Option<String>,
  pub comment: Option<String>,
}

impl ReviewPatch {
  /// Rejects the whole patch if any key falls outside [`PATCHABLE_FIELDS`].
  pub fn from_fields(fields: &FormFields) -> Result<Self, AppError> {
    if let Some(bad) = fields.keys().find(|k| !PATCHABLE_FIELDS.contains(&k.as_str())) {
      return Err(AppError::Validation(format!("Invalid updates: field '{}' cannot be changed.", bad)));
    }
    Ok(Self {
      rating: fields.get("rating").map(|v| parse_rating(v)).transpose()?,
      title: fields.get("title").map(|v| validate_title(v)).transpose()?,
      comment: fields.get("comment").map(|v| validate_comment(v)).transpose()?,
    })
  }
}

fn parse_rating(raw: &str) -> Result<u8, AppError> {
  let value = raw
    .trim()
    .parse::<i64>()
    .map_err(|_| AppError::Validation(format!("Invalid rating '{}'.", raw.trim())))?;
  validate_rating(value)
}

fn validate_title(raw: &str) -> Result<String, AppError> {
  bounded_text("Title", raw, MAX_TITLE_CHARS)
}

fn validate_comment(raw: &str) -> Result<String, AppError> {
  bounded_text("Comment", raw, MAX_COMMENT_CHARS)
}

fn bounded_text(label: &str, raw: &str, max_chars: usize) -> Result<String, AppError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(AppError::Validation(format!("{} is required.", label)));
  }
  if trimmed.chars().count() > max_chars {
    return Err(AppError::Validation(format!(
      "{} cannot be longer than {} characters.",
      label, max_chars
    )));
  }
  Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fields(pairs: &[(&str, &str)]) -> FormFields {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  fn sample_review() -> Review {
    let new = NewReview::from_fields(&fields(&[
      ("productId", &Uuid::new_v4().to_string()),
      ("rating", "4"),
      ("title", "  Solid  "),
      ("comment", "Does the job."),
    ]))
    .unwrap();
    Review::create(Uuid::new_v4(), new, vec![])
  }

  #[test]
  fn new_review_trims_and_validates() {
    let review = sample_review();
    assert_eq!(review.title, "Solid");
    assert!(!review.verified);

    let too_long = "x".repeat(101);
    let err = NewReview::from_fields(&fields(&[
      ("productId", &Uuid::new_v4().to_string()),
      ("rating", "4"),
      ("title", &too_long),
      ("comment", "c"),
    ]));
    assert!(matches!(err, Err(AppError::Validation(_))));
  }

  #[test]
  fn toggle_like_twice_restores_likes() {
    let mut review = sample_review();
    let other = Uuid::new_v4();
    review.toggle_like(other);
    let before = review.likes.clone();

    let liker = Uuid::new_v4();
    assert!(review.toggle_like(liker));
    assert!(!review.toggle_like(liker));
    assert_eq!(review.likes, before);
  }

  #[test]
  fn self_like_is_allowed() {
    let mut review = sample_review();
    let author = review.user_id;
    assert!(review.toggle_like(author));
    assert_eq!(review.likes, vec![author]);
  }

  #[test]
  fn patch_outside_whitelist_is_rejected_whole() {
    let err = ReviewPatch::from_fields(&fields(&[("title", "New"), ("verified", "true")]));
    assert!(matches!(err, Err(AppError::Validation(_))));
  }

  #[test]
  fn patch_applies_only_present_fields() {
    let mut review = sample_review();
    let patch = ReviewPatch::from_fields(&fields(&[("rating", "2")])).unwrap();
    review.apply_patch(&patch);
    assert_eq!(review.rating, 2);
    assert_eq!(review.title, "Solid");
    assert!(ReviewPatch::from_fields(&fields(&[("comment", &"y".repeat(501))])).is_err());
  }
}
