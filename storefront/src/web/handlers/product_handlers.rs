// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::run_to_completion;
use crate::errors::AppError;
use crate::pipelines::contexts::{AddRatingCtxData, CreateProductCtxData, DeleteProductCtxData, UpdateProductCtxData};
use crate::services::catalog;
use crate::state::AppState;
use crate::store::PageRequest;
use crate::web::extractors::AuthenticatedUser;
use crate::web::multipart::{SubmittedForm, UploadLimits};
use storefront_flow::ContextData;

const PHOTO_FIELD: &str = "photos";

#[derive(Deserialize, Debug)]
pub struct RatingRequestPayload {
  pub rating: RatingValue,
  pub comment: Option<String>,
}

/// Ratings arrive as JSON numbers or as numeric strings from form-style clients.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RatingValue {
  Number(i64),
  Text(String),
}

impl RatingValue {
  fn to_i64(&self) -> Result<i64, AppError> {
    match self {
      RatingValue::Number(n) => Ok(*n),
      RatingValue::Text(raw) => raw
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("Invalid rating '{}'.", raw.trim()))),
    }
  }
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<PageRequest>,
) -> Result<HttpResponse, AppError> {
  let products = catalog::list_products(app_state.store.as_ref(), query_params.into_inner()).await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product = catalog::get_product(app_state.store.as_ref(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::create_product", skip_all, fields(user_id = %auth_user.user.id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse, AppError> {
  let form = SubmittedForm::read(&req, payload, PHOTO_FIELD, UploadLimits::from(app_state.config.as_ref())).await?;
  let ctx_data = ContextData::new(CreateProductCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    form.fields,
    form.files,
  ));

  run_to_completion(&app_state, ctx_data.clone(), "Product creation").await?;
  let product = ctx_data
    .read()
    .created
    .clone()
    .ok_or_else(|| AppError::Internal("Product creation completed without a product.".to_string()))?;

  info!(product_id = %product.id, "Product created via API.");
  let view = catalog::present(app_state.store.as_ref(), product).await?;
  Ok(HttpResponse::Created().json(view))
}

#[instrument(name = "handler::update_product", skip_all, fields(user_id = %auth_user.user.id, product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse, AppError> {
  let form = SubmittedForm::read(&req, payload, PHOTO_FIELD, UploadLimits::from(app_state.config.as_ref())).await?;
  let ctx_data = ContextData::new(UpdateProductCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    path.into_inner(),
    form.fields,
    form.files,
  ));

  run_to_completion(&app_state, ctx_data.clone(), "Product update").await?;
  let product = ctx_data
    .read()
    .updated
    .clone()
    .ok_or_else(|| AppError::Internal("Product update completed without a product.".to_string()))?;

  let view = catalog::present(app_state.store.as_ref(), product).await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handler::delete_product", skip_all, fields(user_id = %auth_user.user.id, product_id = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(DeleteProductCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    path.into_inner(),
  ));
  run_to_completion(&app_state, ctx_data.clone(), "Product deletion").await?;

  let released = ctx_data.read().released_images;
  info!(released_images = released, "Product deleted via API.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Product removed" })))
}

#[instrument(name = "handler::add_rating", skip_all, fields(user_id = %auth_user.user.id, product_id = %path.as_ref()))]
pub async fn add_rating_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<RatingRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let rating = payload.rating.to_i64()?;
  let ctx_data = ContextData::new(AddRatingCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    path.into_inner(),
    rating,
    payload.comment,
  ));
  run_to_completion(&app_state, ctx_data.clone(), "Rating").await?;

  let (average_rating, num_reviews) = ctx_data
    .read()
    .product
    .as_ref()
    .map(|p| (p.average_rating, p.num_reviews))
    .unwrap_or_default();
  Ok(HttpResponse::Created().json(json!({
      "message": "Review added",
      "averageRating": average_rating,
      "numReviews": num_reviews,
  })))
}
