// storefront/src/web/routes.rs

use actix_web::{error::InternalError, web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{auth_handlers, product_handlers, review_handlers, user_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed JSON bodies and query strings surface as 400 `{"message"}` like every other validation failure.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| {
    let message = err.to_string();
    InternalError::from_response(err, actix_web::ResponseError::error_response(&AppError::Validation(message))).into()
  })
}

fn query_config() -> web::QueryConfig {
  web::QueryConfig::default().error_handler(|err, _req| {
    let message = err.to_string();
    InternalError::from_response(err, actix_web::ResponseError::error_response(&AppError::Validation(message))).into()
  })
}

/// Malformed path ids such as `/products/not-a-uuid`.
fn path_config() -> web::PathConfig {
  web::PathConfig::default().error_handler(|err, _req| {
    let message = format!("Invalid id in path: {}", err);
    InternalError::from_response(err, actix_web::ResponseError::error_response(&AppError::Validation(message))).into()
  })
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .app_data(json_config())
      .app_data(query_config())
      .app_data(path_config())
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("", web::post().to(product_handlers::create_product_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
          .route("/{product_id}", web::put().to(product_handlers::update_product_handler))
          .route("/{product_id}", web::delete().to(product_handlers::delete_product_handler))
          .route("/{product_id}/reviews", web::post().to(product_handlers::add_rating_handler)),
      )
      .service(
        web::scope("/reviews")
          .route("", web::post().to(review_handlers::create_review_handler))
          .route(
            "/product/{product_id}",
            web::get().to(review_handlers::list_product_reviews_handler),
          )
          .route("/user/{user_id}", web::get().to(review_handlers::list_user_reviews_handler))
          .route("/{review_id}", web::patch().to(review_handlers::update_review_handler))
          .route("/{review_id}", web::delete().to(review_handlers::delete_review_handler))
          .route("/{review_id}/like", web::post().to(review_handlers::toggle_like_handler)),
      )
      // `profile` routes must be registered before `/{user_id}` so they are not captured as ids.
      .service(
        web::scope("/users")
          .route("", web::get().to(user_handlers::list_users_handler))
          .route("/profile", web::get().to(user_handlers::get_profile_handler))
          .route("/profile/details", web::put().to(user_handlers::update_profile_handler))
          .route("/{user_id}", web::get().to(user_handlers::get_user_handler))
          .route("/{user_id}", web::delete().to(user_handlers::delete_user_handler))
          .route("/{user_id}/role", web::put().to(user_handlers::set_role_handler)),
      ),
  );
}
