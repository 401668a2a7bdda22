// tests/context_management_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storefront_flow::{ContextData, FlowError, Pipeline, PipelineControl};

#[tokio::test]
#[serial]
async fn test_context_data_is_shared_and_modified() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("step1_modify", false, None), ("step2_read_modify", false, None)]);

  pipeline.on_root("step1_modify", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.update(|data| {
        data.counter = 10;
        data.message = "SetByStep1".to_string();
      });
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });

  pipeline.on_root("step2_read_modify", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      assert_eq!(guard.counter, 10);
      guard.counter += 5;
      guard.message.push_str("_ThenStep2");
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.with(|data| data.counter), 15);
  assert_eq!(ctx.read().message, "SetByStep1_ThenStep2");
}

#[tokio::test]
#[serial]
async fn test_context_data_clone_shares_data() {
  setup_tracing();
  let original_ctx = ContextData::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned_ctx = original_ctx.clone();

  original_ctx.write().counter = 5;
  assert_eq!(cloned_ctx.read().counter, 5);

  cloned_ctx.write().counter = 10;
  assert_eq!(original_ctx.snapshot().counter, 10);
}

#[tokio::test]
#[serial]
async fn test_try_unwrap_only_succeeds_for_last_handle() {
  setup_tracing();
  let ctx = ContextData::new(TestContext {
    counter: 7,
    ..Default::default()
  });
  let other = ctx.clone();

  let ctx = match ctx.try_unwrap() {
    Ok(_) => panic!("a second handle is still alive"),
    Err(ctx) => ctx,
  };
  drop(other);

  let inner = ctx.try_unwrap().expect("last handle");
  assert_eq!(inner.counter, 7);
}

#[tokio::test]
#[serial]
async fn test_context_data_locks_with_await() {
  setup_tracing();
  let ctx = ContextData::new(TestContext::default());

  let initial_count = ctx.read().counter;
  tokio::time::sleep(std::time::Duration::from_millis(1)).await;
  ctx.write().counter = initial_count + 1;

  assert_eq!(ctx.read().counter, 1);
  assert!(ctx.try_write().is_some());

  let held = ctx.write();
  assert!(ctx.try_read().is_none(), "reader must not get in while a writer holds the lock");
  drop(held);
  assert_eq!(ctx.try_read().map(|g| g.counter), Some(1));
}
