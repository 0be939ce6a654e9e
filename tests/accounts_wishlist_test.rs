mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn address(line1: &str, city: &str, is_default: bool) -> Value {
    json!({
        "full_name": "Asha Rao",
        "phone": "9876543210",
        "address_line1": line1,
        "address_line2": "Flat 4",
        "city": city,
        "state": "Karnataka",
        "postal_code": "560001",
        "is_default": is_default
    })
}

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new().await;
    let registration = json!({
        "username": "meera",
        "email": "Meera@Example.com",
        "first_name": "Meera",
        "last_name": "Iyer",
        "password": "long-enough-1",
        "password2": "long-enough-1"
    });

    let response = app
        .request(Method::POST, "/api/v1/auth/register", Some(registration.clone()), None)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["user"]["email"], "meera@example.com");
    assert_eq!(body["user"]["full_name"], "Meera Iyer");
    assert_eq!(body["user"]["is_staff"], false);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].as_str().is_some());

    let response = app
        .request(Method::POST, "/api/v1/auth/register", Some(registration), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "username": "meera@example.com", "password": "long-enough-1" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = response_json(response).await["access_token"]
        .as_str()
        .expect("token")
        .to_string();

    let response = app
        .request(Method::GET, "/api/v1/auth/profile", None, Some(&token))
        .await;
    assert_eq!(response_json(response).await["username"], "meera");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "username": "meera", "password": "wrong-password" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_checks_password_confirmation() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "kiran",
                "email": "kiran@example.com",
                "first_name": "Kiran",
                "last_name": "S",
                "password": "long-enough-1",
                "password2": "long-enough-2"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_update_keeps_unset_fields() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(
            Method::PUT,
            "/api/v1/auth/profile",
            Some(json!({ "first_name": "Asha", "phone": "9000000001", "city": "Mysuru" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .as_customer(Method::PUT, "/api/v1/auth/profile", Some(json!({ "state": "Karnataka" })))
        .await;
    let profile = response_json(response).await;
    assert_eq!(profile["first_name"], "Asha");
    assert_eq!(profile["profile"]["phone"], "9000000001");
    assert_eq!(profile["profile"]["city"], "Mysuru");
    assert_eq!(profile["profile"]["state"], "Karnataka");
    assert_eq!(profile["profile"]["country"], "India");
}

#[tokio::test]
async fn default_shipping_address_feeds_profile_and_checkout() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(Method::POST, "/api/v1/addresses", Some(address("1 Lake View", "Mysuru", true)))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = response_json(response).await;
    assert_eq!(first["address_type"], "shipping");
    assert_eq!(first["country"], "India");

    let second = response_json(
        app.as_customer(
            Method::POST,
            "/api/v1/addresses",
            Some(address("9 Hill Road", "Bengaluru", false)),
        )
        .await,
    )
    .await;

    let prefill = response_json(app.as_customer(Method::GET, "/api/v1/orders/checkout", None).await).await;
    assert_eq!(prefill["address"], "1 Lake View, Flat 4");
    assert_eq!(prefill["city"], "Mysuru");
    assert_eq!(prefill["zip_code"], "560001");
    assert_eq!(prefill["email"], "asha@example.com");

    let second_id = second["id"].as_str().expect("address id");
    let response = app
        .as_customer(Method::POST, &format!("/api/v1/addresses/{second_id}/default"), None)
        .await;
    assert_eq!(response_json(response).await["is_default"], true);

    let addresses = response_json(app.as_customer(Method::GET, "/api/v1/addresses", None).await).await;
    let defaults: Vec<_> = addresses
        .as_array()
        .expect("addresses")
        .iter()
        .filter(|a| a["is_default"] == true)
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["id"], second["id"]);

    let profile = response_json(app.as_customer(Method::GET, "/api/v1/auth/profile", None).await).await;
    assert_eq!(profile["profile"]["city"], "Bengaluru");
    assert_eq!(profile["profile"]["address"], "9 Hill Road, Flat 4");
}

#[tokio::test]
async fn addresses_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let created = response_json(
        app.as_customer(Method::POST, "/api/v1/addresses", Some(address("5 Park St", "Kolkata", false)))
            .await,
    )
    .await;
    let uri = format!("/api/v1/addresses/{}", created["id"].as_str().expect("id"));

    let other = app.new_customer("vikram").await;
    let response = app.request(Method::GET, &uri, None, Some(&other.token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.as_customer(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.as_customer(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut invalid = address("", "Kolkata", false);
    invalid["phone"] = json!("12");
    let response = app
        .as_customer(Method::POST, "/api/v1/addresses", Some(invalid))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wishlist_add_toggle_and_clear() {
    let app = TestApp::new().await;
    let scarf = app.seed_product("Scarf", dec!(499), 6).await;
    let belt = app.seed_product("Belt", dec!(699), 6).await;

    let added = response_json(
        app.as_customer(Method::POST, "/api/v1/wishlist", Some(json!({ "product_id": scarf.id })))
            .await,
    )
    .await;
    assert_eq!(added["success"], true);
    assert_eq!(added["message"], "Scarf added to wishlist!");
    assert_eq!(added["wishlist_count"], 1);

    let duplicate = response_json(
        app.as_customer(Method::POST, "/api/v1/wishlist", Some(json!({ "product_id": scarf.id })))
            .await,
    )
    .await;
    assert_eq!(duplicate["success"], false);
    assert_eq!(duplicate["wishlist_count"], 1);

    let toggled = response_json(
        app.as_customer(Method::POST, &format!("/api/v1/wishlist/{}/toggle", belt.id), None)
            .await,
    )
    .await;
    assert_eq!(toggled["in_wishlist"], true);
    assert_eq!(toggled["wishlist_count"], 2);

    let listing = response_json(app.as_customer(Method::GET, "/api/v1/wishlist", None).await).await;
    assert_eq!(listing["wishlist_count"], 2);

    let toggled = response_json(
        app.as_customer(Method::POST, &format!("/api/v1/wishlist/{}/toggle", belt.id), None)
            .await,
    )
    .await;
    assert_eq!(toggled["in_wishlist"], false);

    let removed = response_json(
        app.as_customer(Method::DELETE, &format!("/api/v1/wishlist/{}", belt.id), None)
            .await,
    )
    .await;
    assert_eq!(removed["success"], false);

    let cleared = response_json(app.as_customer(Method::DELETE, "/api/v1/wishlist", None).await).await;
    assert_eq!(cleared["message"], "Cleared 1 items from your wishlist!");
    assert_eq!(cleared["wishlist_count"], 0);
}

#[tokio::test]
async fn admin_routes_need_staff_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/admin/dashboard", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.as_customer(Method::GET, "/api/v1/admin/dashboard", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.seed_product("Cap", dec!(199), 2).await;
    app.seed_product("Jacket", dec!(2999), 40).await;

    let response = app.as_admin(Method::GET, "/api/v1/admin/dashboard", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = response_json(response).await;
    assert_eq!(stats["total_products"], 2);
    assert_eq!(stats["total_orders"], 0);
    let low: Vec<_> = stats["low_stock_products"]
        .as_array()
        .expect("low stock")
        .iter()
        .map(|p| p["name"].clone())
        .collect();
    assert_eq!(low, vec![json!("Cap")]);
}

#[tokio::test]
async fn health_probes_and_request_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response_json(response).await["status"], "ok");

    let response = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");

    let request = axum::http::Request::builder()
        .uri("/api/v1/products")
        .header("x-request-id", "req-from-client")
        .body(axum::body::Body::empty())
        .expect("request");
    let response = app.send(request).await;
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-from-client")
    );
}
