// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_MAX_UPLOAD_FILES: usize = 5;
/// Ten years. Keeps `now + ttl` well inside chrono's range.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Postgres when set; the in-memory store otherwise.
  pub database_url: Option<String>,

  pub image_host_base_url: String,
  /// Local directory for uploaded images. The in-memory mock host is used when unset.
  pub image_storage_dir: Option<PathBuf>,
  pub image_folder_products: String,
  pub image_folder_reviews: String,
  pub max_upload_bytes: usize,
  pub max_upload_files: usize,

  pub session_ttl_hours: i64,
  pub seed_db: bool,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 5000,
      database_url: None,
      image_host_base_url: "https://images.example.invalid".to_string(),
      image_storage_dir: None,
      image_folder_products: "products".to_string(),
      image_folder_reviews: "reviews".to_string(),
      max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
      max_upload_files: DEFAULT_MAX_UPLOAD_FILES,
      session_ttl_hours: 24,
      seed_db: false,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let defaults = Self::default();
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let server_host = get("SERVER_HOST").unwrap_or(defaults.server_host);
    let server_port = parse_var(&get, "SERVER_PORT", defaults.server_port)?;
    let database_url = get("DATABASE_URL");

    let image_host_base_url = get("IMAGE_HOST_BASE_URL")
      .map(|url| url.trim_end_matches('/').to_string())
      .unwrap_or(defaults.image_host_base_url);
    let image_storage_dir = get("IMAGE_STORAGE_DIR").map(PathBuf::from);
    let image_folder_products = get("IMAGE_FOLDER_PRODUCTS").unwrap_or(defaults.image_folder_products);
    let image_folder_reviews = get("IMAGE_FOLDER_REVIEWS").unwrap_or(defaults.image_folder_reviews);
    let max_upload_bytes = parse_var(&get, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;
    let max_upload_files = parse_var(&get, "MAX_UPLOAD_FILES", defaults.max_upload_files)?;
    if max_upload_files == 0 {
      return Err(AppError::Config("MAX_UPLOAD_FILES must be at least 1".to_string()));
    }

    let session_ttl_hours = parse_var(&get, "SESSION_TTL_HOURS", defaults.session_ttl_hours)?;
    if session_ttl_hours <= 0 {
      return Err(AppError::Config("SESSION_TTL_HOURS must be positive".to_string()));
    }
    if session_ttl_hours > MAX_SESSION_TTL_HOURS {
      return Err(AppError::Config(format!(
        "SESSION_TTL_HOURS must be at most {}",
        MAX_SESSION_TTL_HOURS
      )));
    }
    let seed_db = parse_var(&get, "SEED_DB", defaults.seed_db)?;

    tracing::info!(
      storage = if database_url.is_some() { "postgres" } else { "memory" },
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      image_host_base_url,
      image_storage_dir,
      image_folder_products,
      image_folder_reviews,
      max_upload_bytes,
      max_upload_files,
      session_ttl_hours,
      seed_db,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match get(name) {
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
    None => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AppConfig::from_lookup(|name| map.get(name).cloned())
  }

  #[test]
  fn defaults_apply_when_nothing_is_set() {
    let cfg = config_from(&[]).unwrap();
    assert_eq!(cfg.bind_address(), "127.0.0.1:5000");
    assert!(cfg.database_url.is_none());
    assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
    assert_eq!(cfg.max_upload_files, 5);
    assert!(!cfg.seed_db);
  }

  #[test]
  fn overrides_are_parsed() {
    let cfg = config_from(&[
      ("SERVER_PORT", "8081"),
      ("DATABASE_URL", "postgres://localhost/shop"),
      ("IMAGE_HOST_BASE_URL", "https://cdn.example.com/"),
      ("SEED_DB", "true"),
      ("MAX_UPLOAD_BYTES", "1024"),
    ])
    .unwrap();
    assert_eq!(cfg.server_port, 8081);
    assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/shop"));
    assert_eq!(cfg.image_host_base_url, "https://cdn.example.com");
    assert!(cfg.seed_db);
    assert_eq!(cfg.max_upload_bytes, 1024);
  }

  #[test]
  fn invalid_values_are_config_errors() {
    assert!(matches!(config_from(&[("SERVER_PORT", "http")]), Err(AppError::Config(_))));
    assert!(matches!(config_from(&[("SEED_DB", "yes")]), Err(AppError::Config(_))));
    assert!(matches!(config_from(&[("MAX_UPLOAD_FILES", "0")]), Err(AppError::Config(_))));
  }

  #[test]
  fn session_ttl_is_bounded() {
    assert!(matches!(config_from(&[("SESSION_TTL_HOURS", "0")]), Err(AppError::Config(_))));
    assert!(matches!(
      config_from(&[("SESSION_TTL_HOURS", "9223372036854775807")]),
      Err(AppError::Config(_))
    ));
    let max = MAX_SESSION_TTL_HOURS.to_string();
    assert_eq!(config_from(&[("SESSION_TTL_HOURS", max.as_str())]).unwrap().session_ttl_hours, MAX_SESSION_TTL_HOURS);
  }
}
