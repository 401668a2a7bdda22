// storefront/src/pipelines/signup_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::User;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use storefront_flow::{ContextData, Flow, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, info, instrument, warn, Level};

/// Registers the sign-up pipeline.
pub fn register_signup_pipeline(flow: &Arc<Flow<AppError>>) {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user_signup", false, None),
    ("create_user_signup", false, None),
    ("issue_session_signup", false, None),
  ]);

  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      event!(Level::DEBUG, email = %guard.email, "Validating signup input.");
      if guard.name.trim().is_empty() {
        warn!("Signup attempted without a name.");
        return Err(AppError::Validation("Name is required.".to_string()));
      }
      auth_service::validate_credentials(&guard.email, &guard.password)?;
      Ok(PipelineControl::Continue)
    })
  });

  signup_p.on_root("check_existing_user_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email_val, store) = {
        let guard = ctx_data.read();
        (guard.email.trim().to_string(), guard.app_state.store.clone())
      }; // guard dropped

      if store.find_user_by_email(&email_val).await?.is_some() {
        warn!("Attempt to signup with existing email: {}", email_val);
        return Err(AppError::Validation("An account with this email already exists.".to_string()));
      }
      info!("Email {} is available for signup.", email_val);
      Ok(PipelineControl::Continue)
    })
  });

  signup_p.on_root("create_user_signup", create_user);

  signup_p.on_root("issue_session_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (store, ttl_hours, user_id) = {
        let guard = ctx_data.read();
        (
          guard.app_state.store.clone(),
          guard.app_state.config.session_ttl_hours,
          guard.created_user.as_ref().map(|u| u.id),
        )
      };
      let user_id = user_id.ok_or_else(|| AppError::Internal("Signup completed without creating a user.".to_string()))?;
      let session = auth_service::issue_session(store.as_ref(), user_id, ttl_hours).await?;
      ctx_data.write().session = Some(session);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flow.register_pipeline(signup_p);
  tracing::info!("Sign-up pipeline registered.");
}

#[instrument(name = "signup_step::create_user", skip_all, err(Display))]
async fn create_user(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (name, email, password, requested_role, store) = {
    let guard = ctx_data.read();
    (
      guard.name.trim().to_string(),
      guard.email.trim().to_string(),
      guard.password.clone(),
      guard.requested_role.clone(),
      guard.app_state.store.clone(),
    )
  };

  let hashed_password = auth_service::hash_password(&password)?;
  let role = auth_service::signup_role(requested_role.as_deref());
  let user = User::new(name, email, hashed_password, role);
  store.insert_user(&user).await?;
  info!("User created successfully: ID={}, Role={}", user.id, user.role);

  ctx_data.write().created_user = Some(user);
  Ok(PipelineControl::Continue)
}
