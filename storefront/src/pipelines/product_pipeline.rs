// storefront/src/pipelines/product_pipeline.rs

//! Product create/update/delete and embedded ratings.

use crate::authz::{authorize, Action, Resource};
use crate::errors::{AppError, Result as AppResult};
use crate::models::{NewProduct, Product, ProductPatch};
use crate::pipelines::common_steps::{self, fetch_product};
use crate::pipelines::contexts::{AddRatingCtxData, CreateProductCtxData, DeleteProductCtxData, UpdateProductCtxData};
use crate::services::image_host;
use storefront_flow::{ContextData, Flow, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub fn register_product_pipelines(flow: &Arc<Flow<AppError>>) {
  flow.register_pipeline(create_product_pipeline());
  flow.register_pipeline(update_product_pipeline());
  flow.register_pipeline(delete_product_pipeline());
  flow.register_pipeline(add_rating_pipeline());
  tracing::info!("Product pipelines registered.");
}

// --- Create ---

fn create_product_pipeline() -> Pipeline<CreateProductCtxData, AppError> {
  let mut p = Pipeline::<CreateProductCtxData, AppError>::new(&[
    ("authorize_seller", false, None),
    ("validate_product_input", false, None),
    ("upload_photos", false, None),
    ("persist_product", false, None),
  ]);

  p.on_root("authorize_seller", |ctx_data: ContextData<CreateProductCtxData>| {
    Box::pin(async move {
      let actor = ctx_data.read().actor;
      authorize(&actor, Resource::Catalog, Action::Create).into_result()?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });
  p.on_root("validate_product_input", validate_new_product);
  p.on_root("upload_photos", common_steps::upload_images::<CreateProductCtxData>);
  p.compensate_root("upload_photos", common_steps::release_uploaded_images::<CreateProductCtxData>);
  p.on_root("persist_product", persist_new_product);
  p
}

#[instrument(name = "product_step::validate_new_product", skip_all, err(Display))]
async fn validate_new_product(ctx_data: ContextData<CreateProductCtxData>) -> AppResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let validated = NewProduct::from_fields(&guard.fields)?;
  if guard.files.is_empty() {
    warn!("Product submitted without photos.");
    return Err(AppError::Validation("Please upload at least one photo".to_string()));
  }
  common_steps::check_file_count(guard.files.len(), guard.app_state.config.max_upload_files)?;
  debug!(name = %validated.name, photos = guard.files.len(), "Product input validated.");
  guard.validated = Some(validated);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "product_step::persist_new_product", skip_all, err(Display))]
async fn persist_new_product(ctx_data: ContextData<CreateProductCtxData>) -> AppResult<PipelineControl> {
  let (store, seller_id, validated, photos) = {
    let guard = ctx_data.read();
    (
      guard.app_state.store.clone(),
      guard.actor.user_id,
      guard.validated.clone(),
      guard.uploaded.clone(),
    )
  };
  let validated = validated.ok_or_else(|| AppError::Internal("Product input was not validated.".to_string()))?;

  let product = Product::create(seller_id, validated, photos)?;
  store.insert_product(&product).await?;
  info!(product_id = %product.id, "Product created.");

  common_steps::commit_uploads(&ctx_data);
  ctx_data.write().created = Some(product);
  Ok(PipelineControl::Continue)
}

// --- Update ---

fn update_product_pipeline() -> Pipeline<UpdateProductCtxData, AppError> {
  let mut p = Pipeline::<UpdateProductCtxData, AppError>::new(&[
    ("load_product", false, None),
    ("authorize_owner", false, None),
    ("validate_patch", false, None),
    (
      "upload_replacement_photos",
      false,
      Some(common_steps::skip_without_files::<UpdateProductCtxData>()),
    ),
    ("persist_product", false, None),
    ("release_replaced_photos", true, None),
  ]);

  p.on_root("load_product", |ctx_data: ContextData<UpdateProductCtxData>| {
    Box::pin(async move {
      let (store, product_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.product_id)
      };
      let product = fetch_product(store.as_ref(), product_id).await?;
      ctx_data.write().existing = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("authorize_owner", |ctx_data: ContextData<UpdateProductCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let product = guard
        .existing
        .as_ref()
        .ok_or_else(|| AppError::Internal("Product was not loaded.".to_string()))?;
      authorize(&guard.actor, Resource::Product(product), Action::Update).into_result()?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("validate_patch", |ctx_data: ContextData<UpdateProductCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let patch = ProductPatch::from_fields(&guard.fields)?;
      common_steps::check_file_count(guard.files.len(), guard.app_state.config.max_upload_files)?;
      guard.patch = Some(patch);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("upload_replacement_photos", common_steps::upload_images::<UpdateProductCtxData>);
  p.compensate_root(
    "upload_replacement_photos",
    common_steps::release_uploaded_images::<UpdateProductCtxData>,
  );
  p.on_root("persist_product", persist_product_update);

  p.on_root("release_replaced_photos", |ctx_data: ContextData<UpdateProductCtxData>| {
    Box::pin(async move {
      let (images, replaced) = {
        let mut guard = ctx_data.write();
        (guard.app_state.images.clone(), std::mem::take(&mut guard.replaced))
      };
      if !replaced.is_empty() {
        let released = image_host::release_all(images.as_ref(), &replaced).await;
        info!(released, total = replaced.len(), "Replaced product photos released.");
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });
  p
}

#[instrument(name = "product_step::persist_product_update", skip_all, err(Display))]
async fn persist_product_update(ctx_data: ContextData<UpdateProductCtxData>) -> AppResult<PipelineControl> {
  let (store, product) = {
    let guard = ctx_data.read();
    let mut product = guard
      .existing
      .clone()
      .ok_or_else(|| AppError::Internal("Product was not loaded.".to_string()))?;
    if let Some(patch) = &guard.patch {
      product.apply_patch(patch);
    }
    (guard.app_state.store.clone(), product)
  };

  let mut product = product;
  let uploaded = ctx_data.read().uploaded.clone();
  let replaced = if uploaded.is_empty() {
    Vec::new()
  } else {
    product.replace_photos(uploaded)?
  };

  store.update_product(&product).await?;
  info!(product_id = %product.id, replaced_photos = replaced.len(), "Product updated.");

  common_steps::commit_uploads(&ctx_data);
  let mut guard = ctx_data.write();
  guard.replaced = replaced;
  guard.updated = Some(product);
  Ok(PipelineControl::Continue)
}

// --- Delete ---

fn delete_product_pipeline() -> Pipeline<DeleteProductCtxData, AppError> {
  let mut p = Pipeline::<DeleteProductCtxData, AppError>::new(&[
    ("load_product", false, None),
    ("authorize_owner", false, None),
    ("release_photos", false, None),
    ("remove_product", false, None),
  ]);

  p.on_root("load_product", |ctx_data: ContextData<DeleteProductCtxData>| {
    Box::pin(async move {
      let (store, product_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.product_id)
      };
      let product = fetch_product(store.as_ref(), product_id).await?;
      ctx_data.write().existing = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("authorize_owner", |ctx_data: ContextData<DeleteProductCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let product = guard
        .existing
        .as_ref()
        .ok_or_else(|| AppError::Internal("Product was not loaded.".to_string()))?;
      authorize(&guard.actor, Resource::Product(product), Action::Delete).into_result()?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("release_photos", |ctx_data: ContextData<DeleteProductCtxData>| {
    Box::pin(async move {
      let (images, photos) = {
        let guard = ctx_data.read();
        let photos = guard.existing.as_ref().map(|p| p.photos.clone()).unwrap_or_default();
        (guard.app_state.images.clone(), photos)
      };
      let released = image_host::release_all(images.as_ref(), &photos).await;
      ctx_data.write().released_images = released;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("remove_product", |ctx_data: ContextData<DeleteProductCtxData>| {
    Box::pin(async move {
      let (store, product_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.product_id)
      };
      if !store.delete_product(product_id).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
      }
      info!(%product_id, "Product removed.");
      Ok(PipelineControl::Continue)
    })
  });
  p
}

// --- Embedded rating ---

fn add_rating_pipeline() -> Pipeline<AddRatingCtxData, AppError> {
  let mut p = Pipeline::<AddRatingCtxData, AppError>::new(&[
    ("validate_rating", false, None),
    ("load_product", false, None),
    ("authorize_rater", false, None),
    ("append_rating", false, None),
    ("persist_product", false, None),
  ]);

  p.on_root("validate_rating", |ctx_data: ContextData<AddRatingCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      guard.rating = Some(crate::models::product::validate_rating(guard.raw_rating)?);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("load_product", |ctx_data: ContextData<AddRatingCtxData>| {
    Box::pin(async move {
      let (store, product_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.product_id)
      };
      let product = fetch_product(store.as_ref(), product_id).await?;
      ctx_data.write().product = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("authorize_rater", |ctx_data: ContextData<AddRatingCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let product = guard
        .product
        .as_ref()
        .ok_or_else(|| AppError::Internal("Product was not loaded.".to_string()))?;
      authorize(&guard.actor, Resource::Product(product), Action::Rate).into_result()?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("append_rating", |ctx_data: ContextData<AddRatingCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let user_id = guard.actor.user_id;
      let rating = guard
        .rating
        .ok_or_else(|| AppError::Internal("Rating was not validated.".to_string()))?;
      let comment = guard.comment.clone();
      let product = guard
        .product
        .as_mut()
        .ok_or_else(|| AppError::Internal("Product was not loaded.".to_string()))?;
      if product.has_rating_from(user_id) {
        warn!(%user_id, product_id = %product.id, "Duplicate embedded rating rejected.");
      }
      product.add_rating(user_id, rating, comment)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_product", |ctx_data: ContextData<AddRatingCtxData>| {
    Box::pin(async move {
      let (store, product) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.product.clone())
      };
      let product = product.ok_or_else(|| AppError::Internal("Product was not loaded.".to_string()))?;
      store.update_product(&product).await?;
      info!(
        product_id = %product.id,
        average_rating = product.average_rating,
        num_reviews = product.num_reviews,
        "Rating added."
      );
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });
  p
}
