// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use storefront_flow::{ContextData, PipelineResult};

#[derive(Deserialize, Debug)]
pub struct RegisterRequestPayload {
  pub name: String,
  pub email: String,
  pub password: String,
  pub role: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(
    name = "handler::register",
    skip(app_state, req_payload),
    fields(req_email = %req_payload.email)
)]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  info!("Signup attempt for email: {}", payload.email);

  let signup_ctx_initial = SignupCtxData {
    app_state: app_state.get_ref().clone(),
    name: payload.name,
    email: payload.email,
    password: payload.password,
    requested_role: payload.role,
    created_user: None,
    session: None,
  };
  let ctx_data = ContextData::new(signup_ctx_initial);

  match app_state.flow.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let user = guard.created_user.clone().ok_or_else(|| {
        warn!("Signup pipeline completed but user was not set in context.");
        AppError::Internal("Signup completed without creating a user.".to_string())
      })?;
      let session = guard.session.clone().ok_or_else(|| {
        warn!("Signup pipeline completed but no session was issued.");
        AppError::Internal("Signup completed without a session.".to_string())
      })?;

      info!(user_id = %user.id, role = %user.role, "Signup successful.");
      Ok(HttpResponse::Created().json(json!({
          "token": session.token,
          "expiresAt": session.expires_at,
          "user": user,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signup pipeline was stopped by a handler.");
      Err(AppError::Internal("Signup process was halted by an internal step.".to_string()))
    }
    Err(app_err) => {
      warn!("Signup pipeline failed: {}", app_err);
      Err(app_err)
    }
  }
}

#[instrument(
    name = "handler::login",
    skip(app_state, req_payload),
    fields(req_email = %req_payload.email)
)]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let signin_ctx_initial = SigninCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email,
    password: payload.password,
    user: None,
    session: None,
  };
  let ctx_data = ContextData::new(signin_ctx_initial);

  match app_state.flow.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let user = guard
        .user
        .clone()
        .ok_or_else(|| AppError::Auth("Signin completed without user identification.".to_string()))?;
      let session = guard
        .session
        .clone()
        .ok_or_else(|| AppError::Auth("Signin completed without session token generation.".to_string()))?;

      info!(user_id = %user.id, "Signin successful.");
      Ok(HttpResponse::Ok().json(json!({
          "token": session.token,
          "expiresAt": session.expires_at,
          "user": user,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signin pipeline was stopped by a handler.");
      Err(AppError::Auth("Authentication process was unexpectedly halted.".to_string()))
    }
    Err(app_err) => {
      warn!("Signin pipeline failed: {}", app_err);
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::logout", skip(app_state, auth_user), fields(user_id = %auth_user.user.id))]
pub async fn logout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state.store.delete_session(&auth_user.token).await?;
  info!("Session revoked.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Logged out" })))
}
