// storefront/src/lib.rs

//! Storefront backend: products with embedded ratings, standalone reviews,
//! user administration and bearer-token sessions over actix-web.

pub mod authz;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
