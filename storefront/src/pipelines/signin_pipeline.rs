// storefront/src/pipelines/signin_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use storefront_flow::{ContextData, Flow, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, warn, Level};

fn invalid_credentials() -> AppError {
  AppError::Auth("Invalid email or password".to_string())
}

/// Registers the sign-in pipeline.
pub fn register_signin_pipeline(flow: &Arc<Flow<AppError>>) {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_by_email_signin", false, None),
    ("verify_user_password_signin", false, None),
    ("issue_session_signin", false, None),
  ]);

  signin_p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if guard.email.trim().is_empty() {
        warn!("Empty email provided for sign-in.");
        return Err(AppError::Validation("Email is required.".to_string()));
      }
      if guard.password.is_empty() {
        warn!("Empty password provided for sign-in.");
        return Err(AppError::Validation("Password is required.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  signin_p.on_root("fetch_user_by_email_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email_val, store) = {
        let guard = ctx_data.read();
        (guard.email.trim().to_string(), guard.app_state.store.clone())
      }; // guard dropped

      event!(Level::DEBUG, email = %email_val, "Fetching user by email for signin.");
      match store.find_user_by_email(&email_val).await? {
        Some(user) => {
          event!(Level::INFO, user_id = %user.id, "User found for signin.");
          ctx_data.write().user = Some(user);
          Ok(PipelineControl::Continue)
        }
        None => {
          warn!("Signin attempt for unknown email: {}", email_val);
          Err(invalid_credentials())
        }
      }
    })
  });

  signin_p.on_root("verify_user_password_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let user = guard.user.as_ref().ok_or_else(invalid_credentials)?;
      if !auth_service::verify_password(&user.password_hash, &guard.password)? {
        warn!(user_id = %user.id, "Password mismatch on signin.");
        return Err(invalid_credentials());
      }
      Ok(PipelineControl::Continue)
    })
  });

  signin_p.on_root("issue_session_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (store, ttl_hours, user_id) = {
        let guard = ctx_data.read();
        (
          guard.app_state.store.clone(),
          guard.app_state.config.session_ttl_hours,
          guard.user.as_ref().map(|u| u.id),
        )
      };
      let user_id = user_id.ok_or_else(invalid_credentials)?;
      let session = auth_service::issue_session(store.as_ref(), user_id, ttl_hours).await?;
      ctx_data.write().session = Some(session);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flow.register_pipeline(signin_p);
  tracing::info!("Sign-in pipeline registered.");
}
