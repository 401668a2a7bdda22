// storefront/src/web/extractors.rs

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::authz::Actor;
use crate::errors::AppError;
use crate::models::User;
use crate::services::auth_service;
use crate::state::AppState;

/// The user behind an `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user: User,
  pub token: String,
}

impl AuthenticatedUser {
  pub fn actor(&self) -> Actor {
    Actor::from(&self.user)
  }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
  let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.trim().split_once(' ')?;
  let token = token.trim();
  (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let app_state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);

    Box::pin(async move {
      let app_state = app_state.ok_or_else(|| AppError::Internal("AppState is not configured.".to_string()))?;
      let Some(token) = token else {
        warn!("AuthenticatedUser extractor: missing bearer token.");
        return Err(AppError::Auth("Not authorized, no token".to_string()));
      };
      let user = auth_service::resolve_token(app_state.store.as_ref(), &token).await?;
      Ok(AuthenticatedUser { user, token })
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn bearer_token_parsing() {
    let req = TestRequest::default()
      .insert_header((header::AUTHORIZATION, "Bearer abc123"))
      .to_http_request();
    assert_eq!(bearer_token(&req).as_deref(), Some("abc123"));

    let lower = TestRequest::default()
      .insert_header((header::AUTHORIZATION, "bearer   xyz "))
      .to_http_request();
    assert_eq!(bearer_token(&lower).as_deref(), Some("xyz"));

    let basic = TestRequest::default()
      .insert_header((header::AUTHORIZATION, "Basic Zm9vOmJhcg=="))
      .to_http_request();
    assert_eq!(bearer_token(&basic), None);
    assert_eq!(bearer_token(&TestRequest::default().to_http_request()), None);
  }
}
