// storefront/src/pipelines/common_steps.rs

//! Steps shared by the product and review pipelines.

use crate::errors::{AppError, Result as AppResult};
use crate::models::Product;
use crate::pipelines::contexts::ImageUploadCtx;
use crate::services::image_host;
use crate::store::Store;
use storefront_flow::{ContextData, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Uploads the pending files one at a time, recording each success in the
/// context immediately so a failure part-way leaves a complete list to release.
#[instrument(name = "common_step::upload_images", skip_all, err(Display))]
pub async fn upload_images<T: ImageUploadCtx>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let (files, folder, images) = {
    let mut guard = ctx_data.write();
    (guard.take_pending_files(), guard.upload_folder(), guard.app_state().images.clone())
  }; // guard dropped

  for file in &files {
    let stored = images.upload(&folder, file).await?;
    ctx_data.write().uploaded_mut().push(stored);
  }
  info!(count = files.len(), %folder, "Images uploaded.");
  Ok(PipelineControl::Continue)
}

/// Compensation for [`upload_images`]: deletes whatever this run uploaded.
#[instrument(name = "common_step::release_uploaded_images", skip_all)]
pub async fn release_uploaded_images<T: ImageUploadCtx>(ctx_data: ContextData<T>) -> AppResult<()> {
  let (uploaded, images) = {
    let mut guard = ctx_data.write();
    (std::mem::take(guard.uploaded_mut()), guard.app_state().images.clone())
  };
  if uploaded.is_empty() {
    return Ok(());
  }

  let released = image_host::release_all(images.as_ref(), &uploaded).await;
  if released == uploaded.len() {
    info!(released, "Rolled back uploaded images.");
  } else {
    warn!(released, total = uploaded.len(), "Some uploaded images could not be rolled back.");
  }
  Ok(())
}

/// Marks this run's uploads as owned by a persisted record, so later
/// compensation leaves them alone.
pub fn commit_uploads<T: ImageUploadCtx>(ctx_data: &ContextData<T>) {
  ctx_data.write().uploaded_mut().clear();
}

/// Skips an upload step when the request carried no files.
pub fn skip_without_files<T: ImageUploadCtx>() -> SkipCondition<T> {
  Arc::new(|ctx_data: ContextData<T>| !ctx_data.read().has_pending_files())
}

pub fn check_file_count(count: usize, max: usize) -> AppResult<()> {
  if count > max {
    return Err(AppError::Validation(format!("Too many files: at most {} are allowed.", max)));
  }
  Ok(())
}

pub async fn fetch_product(store: &dyn Store, id: Uuid) -> AppResult<Product> {
  store.find_product(id).await?.ok_or_else(|| {
    warn!(product_id = %id, "Product not found.");
    AppError::NotFound("Product not found".to_string())
  })
}
