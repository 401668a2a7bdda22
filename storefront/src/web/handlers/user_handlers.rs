// storefront/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ProfilePatch, Role};
use crate::services::users;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct RoleRequestPayload {
  pub role: Option<String>,
}

#[instrument(name = "handler::list_users", skip_all, fields(user_id = %auth_user.user.id))]
pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let list = users::list_users(app_state.store.as_ref(), &auth_user.actor()).await?;
  Ok(HttpResponse::Ok().json(list))
}

#[instrument(name = "handler::get_user", skip_all, fields(user_id = %auth_user.user.id, target = %path.as_ref()))]
pub async fn get_user_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let user = users::get_user(app_state.store.as_ref(), &auth_user.actor(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(user))
}

#[instrument(name = "handler::set_role", skip_all, fields(user_id = %auth_user.user.id, target = %path.as_ref()))]
pub async fn set_role_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<RoleRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let role = match req_payload.into_inner().role.filter(|r| !r.trim().is_empty()) {
    Some(raw) => Some(raw.parse::<Role>()?),
    None => None,
  };
  let change = users::set_role(app_state.store.as_ref(), &auth_user.actor(), path.into_inner(), role).await?;
  Ok(HttpResponse::Ok().json(change))
}

#[instrument(name = "handler::delete_user", skip_all, fields(user_id = %auth_user.user.id, target = %path.as_ref()))]
pub async fn delete_user_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  users::delete_user(app_state.store.as_ref(), &auth_user.actor(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "User removed" })))
}

#[instrument(name = "handler::get_profile", skip_all, fields(user_id = %auth_user.user.id))]
pub async fn get_profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = users::get_own_profile(app_state.store.as_ref(), &auth_user.actor()).await?;
  Ok(HttpResponse::Ok().json(user))
}

#[instrument(name = "handler::update_profile", skip_all, fields(user_id = %auth_user.user.id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ProfilePatch>,
) -> Result<HttpResponse, AppError> {
  let user = users::update_own_profile(app_state.store.as_ref(), &auth_user.actor(), req_payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
      "id": user.id,
      "name": user.name,
      "email": user.email,
      "phone": user.phone,
      "address": user.address,
  })))
}
