// storefront/src/web/multipart.rs

//! Reads a request body that is either `multipart/form-data` or JSON into
//! flat text fields plus buffered files.

use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpRequest};
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::FormFields;
use crate::services::image_host::UploadedFile;

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
  pub max_file_bytes: usize,
  pub max_files: usize,
}

impl From<&AppConfig> for UploadLimits {
  fn from(config: &AppConfig) -> Self {
    Self {
      max_file_bytes: config.max_upload_bytes,
      max_files: config.max_upload_files,
    }
  }
}

#[derive(Debug, Default)]
pub struct SubmittedForm {
  pub fields: FormFields,
  pub files: Vec<UploadedFile>,
}

impl SubmittedForm {
  /// Reads the body. Files are accepted under `file_field` or `file_field[]`.
  pub async fn read(req: &HttpRequest, payload: web::Payload, file_field: &str, limits: UploadLimits) -> Result<Self> {
    let content_type = req
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(|v| v.to_ascii_lowercase())
      .unwrap_or_default();

    if content_type.starts_with("multipart/form-data") {
      Self::read_multipart(req, payload, file_field, limits).await
    } else if content_type.starts_with("application/json") {
      let body = read_body(payload, limits.max_file_bytes).await?;
      Self::from_json(&body)
    } else {
      let body = read_body(payload, limits.max_file_bytes).await?;
      if body.iter().all(u8::is_ascii_whitespace) {
        Ok(Self::default())
      } else {
        Err(AppError::Validation(format!("Unsupported content type '{}'.", content_type)))
      }
    }
  }

  async fn read_multipart(
    req: &HttpRequest,
    payload: web::Payload,
    file_field: &str,
    limits: UploadLimits,
  ) -> Result<Self> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut form = Self::default();

    while let Some(item) = multipart.next().await {
      let mut field = item.map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?;
      let (name, file_name) = match field.content_disposition() {
        Some(cd) => (
          cd.get_name().unwrap_or_default().to_string(),
          cd.get_filename().map(str::to_string),
        ),
        None => (String::new(), None),
      };
      let name = name.strip_suffix("[]").unwrap_or(&name).to_string();
      let content_type = field.content_type().map(|m| m.to_string());

      let is_file = file_name.is_some();
      if is_file && name != file_field {
        warn!(field = %name, "Unexpected file field in upload.");
        return Err(AppError::Validation(format!("Unexpected field '{}'.", name)));
      }

      let cap = if is_file { limits.max_file_bytes } else { MAX_TEXT_FIELD_BYTES };
      let mut bytes = Vec::new();
      while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?;
        if bytes.len() + chunk.len() > cap {
          return Err(AppError::PayloadTooLarge(if is_file {
            format!("File too large: each file must be at most {} bytes.", cap)
          } else {
            format!("Field '{}' is too large.", name)
          }));
        }
        bytes.extend_from_slice(&chunk);
      }

      if is_file {
        let file_name = file_name.filter(|f| !f.is_empty());
        if file_name.is_none() && bytes.is_empty() {
          continue; // empty file input
        }
        if form.files.len() == limits.max_files {
          return Err(AppError::Validation(format!(
            "Too many files: at most {} are allowed.",
            limits.max_files
          )));
        }
        form.files.push(UploadedFile {
          file_name,
          content_type,
          bytes,
        });
      } else if !name.is_empty() {
        let text = String::from_utf8(bytes)
          .map_err(|_| AppError::Validation(format!("Field '{}' is not valid UTF-8.", name)))?;
        form.fields.insert(name, text);
      }
    }

    debug!(fields = form.fields.len(), files = form.files.len(), "Multipart form read.");
    Ok(form)
  }

  /// Flattens a JSON object. Strings are kept as-is, `null` becomes empty,
  /// everything else is rendered as JSON text.
  pub fn from_json(body: &[u8]) -> Result<Self> {
    let value: Value =
      serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))?;
    let Value::Object(map) = value else {
      return Err(AppError::Validation("JSON body must be an object.".to_string()));
    };
    let fields = map
      .into_iter()
      .map(|(k, v)| {
        let text = match v {
          Value::String(s) => s,
          Value::Null => String::new(),
          other => other.to_string(),
        };
        (k, text)
      })
      .collect();
    Ok(Self {
      fields,
      files: Vec::new(),
    })
  }
}

async fn read_body(mut payload: web::Payload, limit: usize) -> Result<Vec<u8>> {
  let mut body = Vec::new();
  while let Some(chunk) = payload.next().await {
    let chunk = chunk.map_err(|e| AppError::Validation(format!("Could not read request body: {}", e)))?;
    if body.len() + chunk.len() > limit {
      return Err(AppError::PayloadTooLarge(format!("Request body exceeds {} bytes.", limit)));
    }
    body.extend_from_slice(&chunk);
  }
  Ok(body)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn json_objects_flatten_to_text_fields() {
    let form = SubmittedForm::from_json(br#"{"rating": 4, "title": "Nice", "comment": null}"#).unwrap();
    assert_eq!(form.fields.get("rating").map(String::as_str), Some("4"));
    assert_eq!(form.fields.get("title").map(String::as_str), Some("Nice"));
    assert_eq!(form.fields.get("comment").map(String::as_str), Some(""));
    assert!(form.files.is_empty());
  }

  #[test]
  fn non_object_json_is_rejected() {
    assert!(matches!(SubmittedForm::from_json(b"[1,2]"), Err(AppError::Validation(_))));
    assert!(matches!(SubmittedForm::from_json(b"{oops"), Err(AppError::Validation(_))));
  }
}
