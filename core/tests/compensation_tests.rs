// tests/compensation_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storefront_flow::{ContextData, Pipeline, PipelineControl, PipelineResult};

fn release_all(
  step: &'static str,
) -> impl Fn(ContextData<TestContext>) -> std::future::Ready<Result<(), TestError>> + Send + Sync + 'static {
  move |ctx: ContextData<TestContext>| {
    let mut guard = ctx.write();
    let owned = format!("res_{}", step);
    guard.acquired.retain(|r| r != &owned);
    guard.released.push(owned);
    std::future::ready(Ok(()))
  }
}

#[tokio::test]
#[serial]
async fn test_failure_runs_compensations_newest_first() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("upload_a", false, None),
    ("upload_b", false, None),
    ("persist", false, None),
  ]);
  pipeline.on_root("upload_a", create_acquiring_handler("upload_a"));
  pipeline.compensate_root("upload_a", release_all("upload_a"));
  pipeline.on_root("upload_b", create_acquiring_handler("upload_b"));
  pipeline.compensate_root("upload_b", release_all("upload_b"));
  pipeline.on_root("persist", create_failing_handler("persist", "write rejected"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("write rejected".to_string()));
  let guard = ctx.read();
  assert!(guard.acquired.is_empty(), "all resources released: {:?}", guard.acquired);
  assert_eq!(guard.released, vec!["res_upload_b", "res_upload_a"]);
}

#[tokio::test]
#[serial]
async fn test_failing_step_compensates_itself() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("partial_upload", false, None)]);
  pipeline.on_root("partial_upload", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().acquired.push("res_partial_upload".to_string());
      Err::<PipelineControl, _>(TestError::Handler("second file failed".to_string()))
    })
  });
  pipeline.compensate_root("partial_upload", release_all("partial_upload"));

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_err());
  assert_eq!(ctx.read().released, vec!["res_partial_upload"]);
}

#[tokio::test]
#[serial]
async fn test_success_and_stop_skip_compensation() {
  setup_tracing();
  let journal = new_journal();

  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("acquire", false, None), ("finish", false, None)]);
  pipeline.on_root("acquire", create_acquiring_handler("acquire"));
  let j = journal.clone();
  pipeline.compensate_root("acquire", move |_ctx: ContextData<TestContext>| {
    j.lock().push("acquire".to_string());
    std::future::ready(Ok::<(), TestError>(()))
  });
  pipeline.on_root("finish", create_simple_handler("finish", "done"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);

  let stop_ctx = ContextData::new(TestContext {
    should_stop_at: Some("finish".to_string()),
    ..Default::default()
  });
  assert_eq!(pipeline.run(stop_ctx).await.unwrap(), PipelineResult::Stopped);

  assert!(journal.lock().is_empty());
}

#[tokio::test]
#[serial]
async fn test_compensation_error_does_not_replace_original_error() {
  setup_tracing();
  let journal = new_journal();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("first", false, None),
    ("second", false, None),
    ("boom", false, None),
  ]);
  pipeline.on_root("first", create_acquiring_handler("first"));
  let j1 = journal.clone();
  pipeline.compensate_root("first", move |_ctx: ContextData<TestContext>| {
    j1.lock().push("first".to_string());
    std::future::ready(Ok::<(), TestError>(()))
  });
  pipeline.on_root("second", create_acquiring_handler("second"));
  let j2 = journal.clone();
  pipeline.compensate_root("second", move |_ctx: ContextData<TestContext>| {
    j2.lock().push("second".to_string());
    std::future::ready(Err::<(), _>(TestError::Compensation("remote unavailable".to_string())))
  });
  pipeline.on_root("boom", create_failing_handler("boom", "original"));

  let result = pipeline.run(ContextData::new(TestContext::default())).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("original".to_string()));
  assert_eq!(*journal.lock(), vec!["second", "first"]);
}

#[tokio::test]
#[serial]
async fn test_skipped_steps_are_not_compensated() {
  setup_tracing();
  let journal = new_journal();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("skipped", false, Some(std::sync::Arc::new(|_ctx: ContextData<TestContext>| true))),
    ("boom", false, None),
  ]);
  pipeline.on_root("skipped", create_acquiring_handler("skipped"));
  let j = journal.clone();
  pipeline.compensate_root("skipped", move |_ctx: ContextData<TestContext>| {
    j.lock().push("skipped".to_string());
    std::future::ready(Ok::<(), TestError>(()))
  });
  pipeline.on_root("boom", create_failing_handler("boom", "fail"));

  assert!(pipeline.run(ContextData::new(TestContext::default())).await.is_err());
  assert!(journal.lock().is_empty());
}
