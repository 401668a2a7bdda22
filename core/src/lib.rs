// src/lib.rs

//! storefront-flow: named-step async pipelines with compensation.
//!
//! A pipeline is an ordered list of named steps. Each step carries
//! `before`, `on` and `after` handlers operating on a shared
//! [`ContextData`], plus optional `compensate` handlers. When a step fails,
//! the compensation handlers of every step that already started run in
//! reverse order, so side effects performed against remote systems (an
//! uploaded image, a reserved resource) can be released before the error
//! reaches the caller.
//!
//! Pipelines are registered in a [`Flow`] registry keyed by their context
//! type and dispatched with [`Flow::run`].

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::{CompensationHandler, Handler};
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Flow;
