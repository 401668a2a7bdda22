// storefront/src/main.rs

use std::io;
use std::sync::Arc;

use actix_web::{web as actix_data, App, HttpServer};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use storefront::services::image_host::{ImageHost, LocalDiskImageHost, MockImageHost};
use storefront::services::seed;
use storefront::store::{MemoryStore, PgStore, Store};
use storefront::web::configure_app_routes;
use storefront::{AppConfig, AppError, AppState};

fn to_io_error(context: &str, err: AppError) -> io::Error {
  tracing::error!(error = %err, "{}", context);
  io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn Store>, AppError> {
  match &config.database_url {
    Some(url) => {
      let store = PgStore::connect(url).await?;
      store.apply_schema().await?;
      tracing::info!("Using Postgres store.");
      Ok(Arc::new(store))
    }
    None => {
      tracing::warn!("DATABASE_URL not set; using in-memory store. Data will not survive a restart.");
      Ok(Arc::new(MemoryStore::new()))
    }
  }
}

fn build_image_host(config: &AppConfig) -> Arc<dyn ImageHost> {
  match &config.image_storage_dir {
    Some(dir) => {
      tracing::info!(dir = %dir.display(), "Storing uploaded images on local disk.");
      Arc::new(LocalDiskImageHost::new(dir.clone(), config.image_host_base_url.clone()))
    }
    None => {
      tracing::warn!("IMAGE_STORAGE_DIR not set; uploaded images are kept in memory only.");
      Arc::new(MockImageHost::new(config.image_host_base_url.clone()))
    }
  }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = AppConfig::from_env().map_err(|e| to_io_error("Failed to load application configuration", e))?;
  let store = build_store(&app_config)
    .await
    .map_err(|e| to_io_error("Failed to initialise the store", e))?;
  let images = build_image_host(&app_config);

  let app_state = AppState::new(app_config, store, images);
  tracing::info!("Pipelines registered.");

  if app_state.config.seed_db {
    match seed::seed_catalog(app_state.store.as_ref(), &app_state.config).await {
      Ok(inserted) => tracing::info!(inserted, "Sample catalog seeded."),
      Err(e) => tracing::error!(error = %e, "Failed to seed sample catalog."),
    }
  }

  let server_address = app_state.config.bind_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
