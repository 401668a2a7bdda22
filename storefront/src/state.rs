// storefront/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::image_host::ImageHost;
use crate::store::Store;
use std::sync::Arc;
use storefront_flow::Flow;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub images: Arc<dyn ImageHost>,
  pub flow: Arc<Flow<AppError>>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Builds the state and registers every pipeline.
  pub fn new(config: AppConfig, store: Arc<dyn Store>, images: Arc<dyn ImageHost>) -> Self {
    let flow = Arc::new(Flow::<AppError>::new());
    pipelines::register_all_pipelines(&flow);
    Self {
      store,
      images,
      flow,
      config: Arc::new(config),
    }
  }
}
