// storefront/src/web/handlers/review_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::run_to_completion;
use crate::errors::AppError;
use crate::pipelines::contexts::{CreateReviewCtxData, DeleteReviewCtxData, ToggleLikeCtxData, UpdateReviewCtxData};
use crate::services::reviews::{self, ReviewWithReviewer};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use crate::web::multipart::{SubmittedForm, UploadLimits};
use storefront_flow::ContextData;

const IMAGE_FIELD: &str = "images";

#[instrument(name = "handler::list_product_reviews", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn list_product_reviews_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let list = reviews::list_for_product(app_state.store.as_ref(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(list))
}

#[instrument(name = "handler::list_user_reviews", skip(app_state, path, _auth_user), fields(target_user = %path.as_ref()))]
pub async fn list_user_reviews_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let list = reviews::list_by_user(app_state.store.as_ref(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(list))
}

#[instrument(name = "handler::create_review", skip_all, fields(user_id = %auth_user.user.id))]
pub async fn create_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse, AppError> {
  let form = SubmittedForm::read(&req, payload, IMAGE_FIELD, UploadLimits::from(app_state.config.as_ref())).await?;
  let ctx_data = ContextData::new(CreateReviewCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    form.fields,
    form.files,
  ));
  run_to_completion(&app_state, ctx_data.clone(), "Review creation").await?;

  let guard = ctx_data.read();
  let review = guard
    .created
    .clone()
    .ok_or_else(|| AppError::Internal("Review creation completed without a review.".to_string()))?;
  info!(review_id = %review.id, "Review created via API.");
  Ok(HttpResponse::Created().json(ReviewWithReviewer {
    review,
    user: guard.reviewer.clone(),
  }))
}

#[instrument(name = "handler::update_review", skip_all, fields(user_id = %auth_user.user.id, review_id = %path.as_ref()))]
pub async fn update_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse, AppError> {
  let form = SubmittedForm::read(&req, payload, IMAGE_FIELD, UploadLimits::from(app_state.config.as_ref())).await?;
  let ctx_data = ContextData::new(UpdateReviewCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    path.into_inner(),
    form.fields,
    form.files,
  ));
  run_to_completion(&app_state, ctx_data.clone(), "Review update").await?;

  let review = ctx_data
    .read()
    .updated
    .clone()
    .ok_or_else(|| AppError::Internal("Review update completed without a review.".to_string()))?;
  Ok(HttpResponse::Ok().json(review))
}

#[instrument(name = "handler::delete_review", skip_all, fields(user_id = %auth_user.user.id, review_id = %path.as_ref()))]
pub async fn delete_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(DeleteReviewCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    path.into_inner(),
  ));
  run_to_completion(&app_state, ctx_data, "Review deletion").await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Review deleted successfully" })))
}

#[instrument(name = "handler::toggle_like", skip_all, fields(user_id = %auth_user.user.id, review_id = %path.as_ref()))]
pub async fn toggle_like_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(ToggleLikeCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    path.into_inner(),
  ));
  run_to_completion(&app_state, ctx_data.clone(), "Like toggle").await?;

  let review = ctx_data
    .read()
    .review
    .clone()
    .ok_or_else(|| AppError::Internal("Like toggle completed without a review.".to_string()))?;
  Ok(HttpResponse::Ok().json(review))
}
