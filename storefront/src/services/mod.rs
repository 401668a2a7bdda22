// storefront/src/services/mod.rs

pub mod auth_service;
pub mod catalog;
pub mod image_host;
pub mod reviews;
pub mod seed;
pub mod users;
