// storefront/src/pipelines/review_pipeline.rs

//! Standalone reviews: create, patch, delete and like toggling.

use crate::authz::{authorize, Action, Actor, Resource};
use crate::errors::{AppError, Result as AppResult};
use crate::models::{NewReview, Review, ReviewPatch};
use crate::pipelines::common_steps::{self, fetch_product};
use crate::pipelines::contexts::{CreateReviewCtxData, DeleteReviewCtxData, ToggleLikeCtxData, UpdateReviewCtxData};
use crate::services::image_host;
use crate::store::Store;
use storefront_flow::{ContextData, Flow, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub fn register_review_pipelines(flow: &Arc<Flow<AppError>>) {
  flow.register_pipeline(create_review_pipeline());
  flow.register_pipeline(update_review_pipeline());
  flow.register_pipeline(delete_review_pipeline());
  flow.register_pipeline(toggle_like_pipeline());
  tracing::info!("Review pipelines registered.");
}

fn review_not_found() -> AppError {
  AppError::NotFound("Review not found".to_string())
}

/// Loads a review the actor may `action`. Other people's reviews look absent.
async fn fetch_owned_review(store: &dyn Store, actor: &Actor, review_id: Uuid, action: Action) -> AppResult<Review> {
  let review = store.find_review(review_id).await?.ok_or_else(review_not_found)?;
  if !authorize(actor, Resource::Review(&review), action).is_allowed() {
    warn!(%review_id, actor = %actor.user_id, "Review not owned by actor.");
    return Err(review_not_found());
  }
  Ok(review)
}

// --- Create ---

fn create_review_pipeline() -> Pipeline<CreateReviewCtxData, AppError> {
  let mut p = Pipeline::<CreateReviewCtxData, AppError>::new(&[
    ("validate_review_input", false, None),
    ("check_product_exists", false, None),
    ("check_duplicate_review", false, None),
    (
      "upload_images",
      false,
      Some(common_steps::skip_without_files::<CreateReviewCtxData>()),
    ),
    ("persist_review", false, None),
    ("attach_reviewer", true, None),
  ]);

  p.on_root("validate_review_input", |ctx_data: ContextData<CreateReviewCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let validated = NewReview::from_fields(&guard.fields)?;
      common_steps::check_file_count(guard.files.len(), guard.app_state.config.max_upload_files)?;
      guard.validated = Some(validated);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("check_product_exists", |ctx_data: ContextData<CreateReviewCtxData>| {
    Box::pin(async move {
      let (store, product_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.validated.as_ref().map(|v| v.product_id))
      };
      let product_id = product_id.ok_or_else(|| AppError::Internal("Review input was not validated.".to_string()))?;
      fetch_product(store.as_ref(), product_id).await?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("check_duplicate_review", check_duplicate_review);
  p.on_root("upload_images", common_steps::upload_images::<CreateReviewCtxData>);
  p.compensate_root("upload_images", common_steps::release_uploaded_images::<CreateReviewCtxData>);
  p.on_root("persist_review", persist_new_review);

  p.on_root("attach_reviewer", |ctx_data: ContextData<CreateReviewCtxData>| {
    Box::pin(async move {
      let (store, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor.user_id)
      };
      match store.find_user(user_id).await {
        Ok(Some(user)) => ctx_data.write().reviewer = Some(user.reviewer_summary()),
        Ok(None) => warn!(%user_id, "Reviewer vanished before the response was built."),
        Err(e) => warn!(%user_id, error = %e, "Could not resolve reviewer for response."),
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });
  p
}

#[instrument(name = "review_step::check_duplicate_review", skip_all, err(Display))]
async fn check_duplicate_review(ctx_data: ContextData<CreateReviewCtxData>) -> AppResult<PipelineControl> {
  let (store, user_id, product_id) = {
    let guard = ctx_data.read();
    let product_id = guard
      .validated
      .as_ref()
      .map(|v| v.product_id)
      .ok_or_else(|| AppError::Internal("Review input was not validated.".to_string()))?;
    (guard.app_state.store.clone(), guard.actor.user_id, product_id)
  };

  if store.find_review_by_author(user_id, product_id).await?.is_some() {
    warn!(%user_id, %product_id, "Duplicate review rejected.");
    return Err(AppError::Conflict("You have already reviewed this product".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "review_step::persist_new_review", skip_all, err(Display))]
async fn persist_new_review(ctx_data: ContextData<CreateReviewCtxData>) -> AppResult<PipelineControl> {
  let (store, user_id, validated, images) = {
    let guard = ctx_data.read();
    (
      guard.app_state.store.clone(),
      guard.actor.user_id,
      guard.validated.clone(),
      guard.uploaded.clone(),
    )
  };
  let validated = validated.ok_or_else(|| AppError::Internal("Review input was not validated.".to_string()))?;

  let review = Review::create(user_id, validated, images);
  store.insert_review(&review).await?;
  info!(review_id = %review.id, product_id = %review.product_id, "Review created.");

  common_steps::commit_uploads(&ctx_data);
  ctx_data.write().created = Some(review);
  Ok(PipelineControl::Continue)
}

// --- Update ---

fn update_review_pipeline() -> Pipeline<UpdateReviewCtxData, AppError> {
  let mut p = Pipeline::<UpdateReviewCtxData, AppError>::new(&[
    ("load_owned_review", false, None),
    ("validate_patch", false, None),
    (
      "upload_replacement_images",
      false,
      Some(common_steps::skip_without_files::<UpdateReviewCtxData>()),
    ),
    ("persist_review", false, None),
    ("release_replaced_images", true, None),
  ]);

  p.on_root("load_owned_review", |ctx_data: ContextData<UpdateReviewCtxData>| {
    Box::pin(async move {
      let (store, actor, review_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor, guard.review_id)
      };
      let review = fetch_owned_review(store.as_ref(), &actor, review_id, Action::Update).await?;
      ctx_data.write().existing = Some(review);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("validate_patch", |ctx_data: ContextData<UpdateReviewCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let patch = ReviewPatch::from_fields(&guard.fields)?;
      common_steps::check_file_count(guard.files.len(), guard.app_state.config.max_upload_files)?;
      guard.patch = Some(patch);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("upload_replacement_images", common_steps::upload_images::<UpdateReviewCtxData>);
  p.compensate_root(
    "upload_replacement_images",
    common_steps::release_uploaded_images::<UpdateReviewCtxData>,
  );

  p.on_root("persist_review", |ctx_data: ContextData<UpdateReviewCtxData>| {
    Box::pin(async move {
      let (store, mut review, patch, uploaded) = {
        let guard = ctx_data.read();
        let review = guard.existing.clone().ok_or_else(review_not_found)?;
        (
          guard.app_state.store.clone(),
          review,
          guard.patch.clone().unwrap_or_default(),
          guard.uploaded.clone(),
        )
      };
      review.apply_patch(&patch);
      let replaced = if uploaded.is_empty() {
        Vec::new()
      } else {
        review.replace_images(uploaded)
      };

      store.update_review(&review).await?;
      info!(review_id = %review.id, replaced_images = replaced.len(), "Review updated.");

      common_steps::commit_uploads(&ctx_data);
      let mut guard = ctx_data.write();
      guard.replaced = replaced;
      guard.updated = Some(review);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("release_replaced_images", |ctx_data: ContextData<UpdateReviewCtxData>| {
    Box::pin(async move {
      let (images, replaced) = {
        let mut guard = ctx_data.write();
        (guard.app_state.images.clone(), std::mem::take(&mut guard.replaced))
      };
      if !replaced.is_empty() {
        image_host::release_all(images.as_ref(), &replaced).await;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });
  p
}

// --- Delete ---

fn delete_review_pipeline() -> Pipeline<DeleteReviewCtxData, AppError> {
  let mut p = Pipeline::<DeleteReviewCtxData, AppError>::new(&[
    ("load_owned_review", false, None),
    ("release_images", false, None),
    ("remove_review", false, None),
  ]);

  p.on_root("load_owned_review", |ctx_data: ContextData<DeleteReviewCtxData>| {
    Box::pin(async move {
      let (store, actor, review_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor, guard.review_id)
      };
      let review = fetch_owned_review(store.as_ref(), &actor, review_id, Action::Delete).await?;
      ctx_data.write().existing = Some(review);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("release_images", |ctx_data: ContextData<DeleteReviewCtxData>| {
    Box::pin(async move {
      let (images, to_release) = {
        let guard = ctx_data.read();
        let to_release = guard.existing.as_ref().map(|r| r.images.clone()).unwrap_or_default();
        (guard.app_state.images.clone(), to_release)
      };
      let released = image_host::release_all(images.as_ref(), &to_release).await;
      ctx_data.write().released_images = released;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("remove_review", |ctx_data: ContextData<DeleteReviewCtxData>| {
    Box::pin(async move {
      let (store, review_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.review_id)
      };
      if !store.delete_review(review_id).await? {
        return Err(review_not_found());
      }
      info!(%review_id, "Review deleted.");
      Ok(PipelineControl::Continue)
    })
  });
  p
}

// --- Likes ---

fn toggle_like_pipeline() -> Pipeline<ToggleLikeCtxData, AppError> {
  let mut p = Pipeline::<ToggleLikeCtxData, AppError>::new(&[("load_review", false, None), ("toggle_like", false, None)]);

  p.on_root("load_review", |ctx_data: ContextData<ToggleLikeCtxData>| {
    Box::pin(async move {
      let (store, review_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.review_id)
      };
      let review = store.find_review(review_id).await?.ok_or_else(review_not_found)?;
      ctx_data.write().review = Some(review);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("toggle_like", |ctx_data: ContextData<ToggleLikeCtxData>| {
    Box::pin(async move {
      let (store, mut review, actor) = {
        let guard = ctx_data.read();
        let review = guard.review.clone().ok_or_else(review_not_found)?;
        (guard.app_state.store.clone(), review, guard.actor)
      };
      authorize(&actor, Resource::Review(&review), Action::Like).into_result()?;
      let liked = review.toggle_like(actor.user_id);
      store.update_review(&review).await?;
      info!(review_id = %review.id, liked, likes = review.likes.len(), "Review like toggled.");

      let mut guard = ctx_data.write();
      guard.liked = Some(liked);
      guard.review = Some(review);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });
  p
}
