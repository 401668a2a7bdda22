// storefront/src/web/handlers/mod.rs

pub mod auth_handlers;
pub mod product_handlers;
pub mod review_handlers;
pub mod user_handlers;

use crate::errors::AppError;
use crate::state::AppState;
use storefront_flow::{ContextData, PipelineResult};
use tracing::warn;

/// Runs the pipeline for `T`. A pipeline that stops without error is treated
/// as an internal failure, since every storefront flow is expected to complete.
pub(crate) async fn run_to_completion<T>(app_state: &AppState, ctx_data: ContextData<T>, flow_name: &str) -> Result<(), AppError>
where
  T: 'static + Send + Sync,
{
  match app_state.flow.run(ctx_data).await {
    Ok(PipelineResult::Completed) => Ok(()),
    Ok(PipelineResult::Stopped) => {
      warn!(flow = flow_name, "Pipeline was stopped by a handler.");
      Err(AppError::Internal(format!("{} was halted by an internal step.", flow_name)))
    }
    Err(app_err) => {
      warn!(flow = flow_name, error = %app_err, "Pipeline failed.");
      Err(app_err)
    }
  }
}
