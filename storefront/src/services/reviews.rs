// storefront/src/services/reviews.rs

//! Review listings with reviewer or product projections.

use serde::Serialize;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{ProductSummary, Review, ReviewerSummary};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithReviewer {
  #[serde(flatten)]
  pub review: Review,
  pub user: Option<ReviewerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithProduct {
  #[serde(flatten)]
  pub review: Review,
  pub product: Option<ProductSummary>,
}

fn distinct(mut ids: Vec<Uuid>) -> Vec<Uuid> {
  ids.sort_unstable();
  ids.dedup();
  ids
}

#[instrument(name = "reviews::list_for_product", skip(store))]
pub async fn list_for_product(store: &dyn Store, product_id: Uuid) -> Result<Vec<ReviewWithReviewer>> {
  let reviews = store.list_reviews_for_product(product_id).await?;
  let authors: HashMap<Uuid, ReviewerSummary> = store
    .find_users(&distinct(reviews.iter().map(|r| r.user_id).collect()))
    .await?
    .iter()
    .map(|u| (u.id, u.reviewer_summary()))
    .collect();

  Ok(
    reviews
      .into_iter()
      .map(|review| ReviewWithReviewer {
        user: authors.get(&review.user_id).cloned(),
        review,
      })
      .collect(),
  )
}

#[instrument(name = "reviews::list_by_user", skip(store))]
pub async fn list_by_user(store: &dyn Store, user_id: Uuid) -> Result<Vec<ReviewWithProduct>> {
  let reviews = store.list_reviews_by_user(user_id).await?;
  let products: HashMap<Uuid, ProductSummary> = store
    .find_products(&distinct(reviews.iter().map(|r| r.product_id).collect()))
    .await?
    .into_iter()
    .map(|p| {
      let summary = ProductSummary {
        id: p.id,
        name: p.name,
        photos: p.photos,
        price_cents: p.price_cents,
      };
      (summary.id, summary)
    })
    .collect();

  Ok(
    reviews
      .into_iter()
      .map(|review| ReviewWithProduct {
        product: products.get(&review.product_id).cloned(),
        review,
      })
      .collect(),
  )
}
