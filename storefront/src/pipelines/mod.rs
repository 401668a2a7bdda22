// storefront/src/pipelines/mod.rs

//! Defines and registers every pipeline used by the storefront.

use crate::errors::AppError;
use std::sync::Arc;
use storefront_flow::Flow;

pub mod common_steps;
pub mod contexts;

pub mod product_pipeline;
pub mod review_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers all pipelines. Called once while building `AppState`.
pub fn register_all_pipelines(flow: &Arc<Flow<AppError>>) {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(flow);
  signin_pipeline::register_signin_pipeline(flow);
  product_pipeline::register_product_pipelines(flow);
  review_pipeline::register_review_pipelines(flow);

  tracing::info!("All application pipelines registered.");
}
