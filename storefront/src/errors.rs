// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use storefront_flow::FlowError;

/// Message sent for every 5xx response; the detail only goes to the log.
pub const OPAQUE_SERVER_ERROR: &str = "Something went wrong!";

#[derive(Debug, Error)]
pub enum AppError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Auth(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  /// Duplicate review or rating. Reported as 400, like other client mistakes.
  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  PayloadTooLarge(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Image Host Error: {0}")]
  ImageHost(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl AppError {
  /// Message safe to show to the client.
  pub fn public_message(&self) -> String {
    if self.status_code().is_server_error() {
      OPAQUE_SERVER_ERROR.to_string()
    } else {
      self.to_string()
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::ImageHost(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with server error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with client error");
    }
    HttpResponse::build(status).json(json!({ "message": self.public_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn client_errors_keep_their_message() {
    let err = AppError::Conflict("Product already reviewed".to_string());
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.public_message(), "Product already reviewed");
    assert_eq!(AppError::Forbidden("no".into()).status_code(), StatusCode::FORBIDDEN);
    assert_eq!(AppError::PayloadTooLarge("big".into()).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
  }

  #[test]
  fn server_errors_are_opaque() {
    let err = AppError::Internal("connection reset by peer".to_string());
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.public_message(), OPAQUE_SERVER_ERROR);
  }

  #[test]
  fn anyhow_wrapping_sqlx_keeps_database_variant() {
    let err: AppError = anyhow::Error::new(sqlx::Error::RowNotFound).into();
    assert!(matches!(err, AppError::Sqlx(_)));
    let other: AppError = anyhow::anyhow!("boom").into();
    assert!(matches!(other, AppError::Internal(m) if m == "boom"));
  }
}
