// tests/http_api_tests.rs
mod common;

use actix_web::{http::header, http::StatusCode, test, web, App};
use common::*;
use serde_json::{json, Value};
use serial_test::serial;
use storefront::models::Role;
use storefront::web::configure_app_routes;
use storefront::AppConfig;

const BOUNDARY: &str = "----storefront-test-boundary";

/// Builds a `multipart/form-data` body from text fields and `(field, filename, bytes)` files.
fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
  let mut body = Vec::new();
  for (name, value) in fields {
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(b"\r\n");
  }
  for (name, file_name, bytes) in files {
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
      format!(
        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
        name, file_name
      )
      .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
  body
}

fn multipart_content_type() -> (header::HeaderName, String) {
  (header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
}

fn bearer(token: &str) -> (header::HeaderName, String) {
  (header::AUTHORIZATION, format!("Bearer {}", token))
}

fn product_form() -> [(&'static str, &'static str); 5] {
  [
    ("name", "Walnut Desk"),
    ("description", "Solid walnut"),
    ("price", "249.99"),
    ("category", "furniture"),
    ("stock", "3"),
  ]
}

macro_rules! init_app {
  ($test_app:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($test_app.state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

#[actix_rt::test]
#[serial]
async fn test_health_check() {
  let app = test_app();
  let service = init_app!(app);

  let resp = test::call_service(&service, test::TestRequest::get().uri("/api/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
#[serial]
async fn test_register_login_and_profile() {
  let app = test_app();
  let service = init_app!(app);

  let register = test::TestRequest::post()
    .uri("/api/auth/register")
    .set_json(json!({ "name": "Sally", "email": "sally@example.com", "password": "secret123", "role": "admin" }))
    .to_request();
  let resp = test::call_service(&service, register).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["user"]["role"], "buyer", "admin cannot be self-assigned");
  assert!(body["user"].get("passwordHash").is_none());
  assert!(body["user"].get("password_hash").is_none());

  let login = test::TestRequest::post()
    .uri("/api/auth/login")
    .set_json(json!({ "email": "sally@example.com", "password": "secret123" }))
    .to_request();
  let resp = test::call_service(&service, login).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  let token = body["token"].as_str().unwrap().to_string();
  assert_eq!(token.len(), 64);

  let profile = test::TestRequest::get()
    .uri("/api/users/profile")
    .insert_header(bearer(&token))
    .to_request();
  let resp = test::call_service(&service, profile).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["email"], "sally@example.com");

  let logout = test::TestRequest::post()
    .uri("/api/auth/logout")
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(test::call_service(&service, logout).await.status(), StatusCode::OK);

  let after = test::TestRequest::get()
    .uri("/api/users/profile")
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(test::call_service(&service, after).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
#[serial]
async fn test_wrong_password_and_missing_token_are_unauthorized() {
  let app = test_app();
  create_user(&app, "Alice", Role::Buyer).await;
  let service = init_app!(app);

  let login = test::TestRequest::post()
    .uri("/api/auth/login")
    .set_json(json!({ "email": "alice@example.com", "password": "wrong-password" }))
    .to_request();
  let resp = test::call_service(&service, login).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "Invalid email or password");

  let resp = test::call_service(&service, test::TestRequest::get().uri("/api/users/profile").to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "Not authorized, no token");

  let bogus = test::TestRequest::get()
    .uri("/api/users/profile")
    .insert_header(bearer("not-a-real-token"))
    .to_request();
  let resp = test::call_service(&service, bogus).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "Not authorized, token failed");
}

#[actix_rt::test]
#[serial]
async fn test_seller_creates_product_via_multipart() {
  let app = test_app();
  let (_, token) = create_user(&app, "Sally", Role::Seller).await;
  let service = init_app!(app);

  let body = multipart_body(
    &product_form(),
    &[("photos[]", "front.png", b"png-front".as_slice()), ("photos[]", "side.png", b"png-side".as_slice())],
  );
  let req = test::TestRequest::post()
    .uri("/api/products")
    .insert_header(bearer(&token))
    .insert_header(multipart_content_type())
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let created: Value = test::read_body_json(resp).await;
  assert_eq!(created["priceCents"], 24999);
  assert_eq!(created["photos"].as_array().map(Vec::len), Some(2));
  assert_eq!(created["seller"]["name"], "Sally");

  let resp = test::call_service(&service, test::TestRequest::get().uri("/api/products").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let list: Value = test::read_body_json(resp).await;
  assert_eq!(list.as_array().map(Vec::len), Some(1));

  let detail_uri = format!("/api/products/{}", created["id"].as_str().unwrap());
  let resp = test::call_service(&service, test::TestRequest::get().uri(&detail_uri).to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
#[serial]
async fn test_buyer_product_upload_is_forbidden() {
  let app = test_app();
  let (_, token) = create_user(&app, "Bob", Role::Buyer).await;
  let service = init_app!(app);

  let req = test::TestRequest::post()
    .uri("/api/products")
    .insert_header(bearer(&token))
    .insert_header(multipart_content_type())
    .set_payload(multipart_body(&product_form(), &[("photos", "a.png", b"png".as_slice())]))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert!(app.images.live_ids().is_empty());
}

#[actix_rt::test]
#[serial]
async fn test_oversized_photo_is_rejected() {
  let app = test_app_with(AppConfig {
    max_upload_bytes: 16,
    ..AppConfig::default()
  });
  let (_, token) = create_user(&app, "Sally", Role::Seller).await;
  let service = init_app!(app);

  let big = vec![7u8; 64];
  let req = test::TestRequest::post()
    .uri("/api/products")
    .insert_header(bearer(&token))
    .insert_header(multipart_content_type())
    .set_payload(multipart_body(&product_form(), &[("photos", "big.png", big.as_slice())]))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
  assert!(app.images.live_ids().is_empty());
}

#[actix_rt::test]
#[serial]
async fn test_unexpected_file_field_is_rejected() {
  let app = test_app();
  let (_, token) = create_user(&app, "Sally", Role::Seller).await;
  let service = init_app!(app);

  let req = test::TestRequest::post()
    .uri("/api/products")
    .insert_header(bearer(&token))
    .insert_header(multipart_content_type())
    .set_payload(multipart_body(&product_form(), &[("avatar", "me.png", b"png".as_slice())]))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
#[serial]
async fn test_review_json_patch_and_like() {
  let app = test_app();
  let (seller, _) = create_user(&app, "Sally", Role::Seller).await;
  let (_, alice_token) = create_user(&app, "Alice", Role::Buyer).await;
  let (_, bob_token) = create_user(&app, "Bob", Role::Buyer).await;
  let product = create_product(&app, &seller, 1).await;
  let service = init_app!(app);

  let product_id = product.id.to_string();
  let req = test::TestRequest::post()
    .uri("/api/reviews")
    .insert_header(bearer(&alice_token))
    .insert_header(multipart_content_type())
    .set_payload(multipart_body(
      &[
        ("productId", product_id.as_str()),
        ("rating", "4"),
        ("title", "Good"),
        ("comment", "Solid desk"),
      ],
      &[],
    ))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let review: Value = test::read_body_json(resp).await;
  assert_eq!(review["user"]["name"], "Alice");
  let review_uri = format!("/api/reviews/{}", review["id"].as_str().unwrap());

  let patch = test::TestRequest::patch()
    .uri(&review_uri)
    .insert_header(bearer(&alice_token))
    .set_json(json!({ "rating": 5 }))
    .to_request();
  let resp = test::call_service(&service, patch).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let patched: Value = test::read_body_json(resp).await;
  assert_eq!(patched["rating"], 5);

  let like = test::TestRequest::post()
    .uri(&format!("{}/like", review_uri))
    .insert_header(bearer(&bob_token))
    .to_request();
  let resp = test::call_service(&service, like).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let liked: Value = test::read_body_json(resp).await;
  assert_eq!(liked["likes"].as_array().map(Vec::len), Some(1));

  let listing = test::TestRequest::get()
    .uri(&format!("/api/reviews/product/{}", product_id))
    .to_request();
  let resp = test::call_service(&service, listing).await;
  let list: Value = test::read_body_json(resp).await;
  assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[actix_rt::test]
#[serial]
async fn test_admin_only_user_routes() {
  let app = test_app();
  let (_, admin_token) = create_user(&app, "Ada", Role::Admin).await;
  let (buyer, buyer_token) = create_user(&app, "Bob", Role::Buyer).await;
  let service = init_app!(app);

  let resp = test::call_service(
    &service,
    test::TestRequest::get()
      .uri("/api/users")
      .insert_header(bearer(&buyer_token))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let set_role = test::TestRequest::put()
    .uri(&format!("/api/users/{}/role", buyer.id))
    .insert_header(bearer(&admin_token))
    .set_json(json!({ "role": "seller" }))
    .to_request();
  let resp = test::call_service(&service, set_role).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let stored = {
    use storefront::store::Store;
    app.store.find_user(buyer.id).await.unwrap().unwrap()
  };
  assert_eq!(stored.role, Role::Seller);

  let delete = test::TestRequest::delete()
    .uri(&format!("/api/users/{}", buyer.id))
    .insert_header(bearer(&admin_token))
    .to_request();
  let resp = test::call_service(&service, delete).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "User removed");
}

#[actix_rt::test]
#[serial]
async fn test_malformed_json_is_bad_request() {
  let app = test_app();
  let service = init_app!(app);

  let req = test::TestRequest::post()
    .uri("/api/auth/login")
    .insert_header((header::CONTENT_TYPE, "application/json"))
    .set_payload("{not json")
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["message"].is_string());
}

#[actix_rt::test]
#[serial]
async fn test_malformed_path_id_is_json_bad_request() {
  let app = test_app();
  let (_, token) = create_user(&app, "Sally", Role::Seller).await;
  let service = init_app!(app);

  let resp = test::call_service(&service, test::TestRequest::get().uri("/api/products/not-a-uuid").to_request()).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["message"].as_str().unwrap().starts_with("Invalid id in path"));

  let delete = test::TestRequest::delete()
    .uri("/api/reviews/42")
    .insert_header(bearer(&token))
    .to_request();
  let resp = test::call_service(&service, delete).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["message"].is_string());
}

#[actix_rt::test]
#[serial]
async fn test_overflowing_price_is_bad_request() {
  let app = test_app();
  let (_, token) = create_user(&app, "Sally", Role::Seller).await;
  let service = init_app!(app);

  let req = test::TestRequest::post()
    .uri("/api/products")
    .insert_header(bearer(&token))
    .insert_header(multipart_content_type())
    .set_payload(multipart_body(
      &[
        ("name", "Gold Desk"),
        ("description", "Priceless"),
        ("price", "79228162514264337593543950335"),
        ("category", "furniture"),
        ("stock", "1"),
      ],
      &[("photos", "a.png", b"png".as_slice())],
    ))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(app.images.live_ids().is_empty());
}

#[actix_rt::test]
#[serial]
async fn test_rating_accepts_number_or_numeric_string() {
  let app = test_app();
  let (seller, _) = create_user(&app, "Sally", Role::Seller).await;
  let (_, alice_token) = create_user(&app, "Alice", Role::Buyer).await;
  let (_, bob_token) = create_user(&app, "Bob", Role::Buyer).await;
  let (_, carol_token) = create_user(&app, "Carol", Role::Buyer).await;
  let product = create_product(&app, &seller, 1).await;
  let service = init_app!(app);
  let uri = format!("/api/products/{}/reviews", product.id);

  let rate = |token: &str, body: Value| {
    test::TestRequest::post()
      .uri(&uri)
      .insert_header(bearer(token))
      .set_json(body)
      .to_request()
  };

  let resp = test::call_service(&service, rate(&alice_token, json!({ "rating": 4 }))).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let resp = test::call_service(&service, rate(&bob_token, json!({ "rating": "2", "comment": "meh" }))).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["numReviews"], 2);
  assert_eq!(body["averageRating"], 3.0);

  let resp = test::call_service(&service, rate(&carol_token, json!({ "rating": "great" }))).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
