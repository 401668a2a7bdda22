// src/core/mod.rs

//! Building blocks shared by pipeline definition and execution.

pub mod context;
pub mod context_data;
pub mod control;
pub mod step;

pub use context_data::ContextData;
