//! Coupon application, removal and staff management over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use clothingstore_api::entities::commerce::{AppliedCoupon, DiscountType};
use common::{coupon_input, decimal, response_json, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

async fn apply(app: &TestApp, token: &str, code: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/apply",
            Some(json!({ "code": code })),
            Some(token),
        )
        .await;
    let status = response.status();
    (status, response_json(response).await)
}

async fn applied_rows(app: &TestApp) -> u64 {
    AppliedCoupon::find()
        .count(&*app.state.db)
        .await
        .expect("count applied coupons")
}

#[tokio::test]
async fn save10_caps_discount_and_reports_totals() {
    let app = TestApp::new().await;
    let product = app.seed_product("Linen Shirt", dec!(150), 20).await;
    let mut input = coupon_input("SAVE10", DiscountType::Percentage, dec!(10));
    input.max_discount = Some(dec!(20));
    input.min_order_amount = dec!(100);
    let coupon = app.seed_coupon(input).await;

    let added = app.add_to_cart(app.customer_token(), product.id, 2).await;
    assert_eq!(added.status(), StatusCode::OK);

    let (status, body) = apply(&app, app.customer_token(), "save10").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["discount_amount"]), dec!(20));
    assert_eq!(decimal(&body["cart"]["subtotal"]), dec!(300));
    assert_eq!(decimal(&body["cart"]["discount"]), dec!(20));
    assert_eq!(decimal(&body["cart"]["total"]), dec!(280));
    assert_eq!(
        body["message"],
        "Coupon SAVE10 applied successfully! Discount: ₹20.00 applied to your order."
    );

    assert_eq!(app.reload_coupon(coupon.id).await.times_used, 1);
    assert_eq!(applied_rows(&app).await, 1);

    let cart = response_json(app.as_customer(Method::GET, "/api/v1/cart", None).await).await;
    assert_eq!(cart["coupon"]["code"], "SAVE10");
}

#[tokio::test]
async fn rejections_use_error_body() {
    let app = TestApp::new().await;
    let product = app.seed_product("Denim Jacket", dec!(500), 5).await;

    // Blank and unknown codes are checked before any coupon rule.
    let (status, body) = apply(&app, app.customer_token(), "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Please enter a coupon code" }));

    let (status, body) = apply(&app, app.customer_token(), "NOPE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid coupon code. Please check and try again."
    );

    let now = Utc::now();
    let mut future = coupon_input("LATER", DiscountType::Fixed, dec!(50));
    future.valid_from = now + Duration::days(2);
    future.valid_to = now + Duration::days(10);
    app.seed_coupon(future).await;

    app.add_to_cart(app.customer_token(), product.id, 1).await;
    let (status, body) = apply(&app, app.customer_token(), "LATER").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let reason = body["error"].as_str().expect("error reason");
    assert!(
        reason.starts_with("This coupon is not valid until "),
        "{reason}"
    );
    assert_eq!(applied_rows(&app).await, 0);

    let mut big = coupon_input("BIGSPEND", DiscountType::Fixed, dec!(100));
    big.min_order_amount = dec!(1000);
    app.seed_coupon(big).await;
    let (_, body) = apply(&app, app.customer_token(), "BIGSPEND").await;
    assert_eq!(
        body["error"],
        "Minimum order amount of ₹1,000.00 required for this coupon (current: ₹500.00)"
    );
}

#[tokio::test]
async fn exhausted_coupon_is_not_applied() {
    let app = TestApp::new().await;
    let product = app.seed_product("Scarf", dec!(80), 10).await;
    let mut input = coupon_input("ONCE", DiscountType::Fixed, dec!(10));
    input.usage_limit = 1;
    let coupon = app.seed_coupon(input).await;

    let other = app.new_customer("ravi").await;
    app.add_to_cart(&other.token, product.id, 1).await;
    let (status, _) = apply(&app, &other.token, "ONCE").await;
    assert_eq!(status, StatusCode::OK);

    app.add_to_cart(app.customer_token(), product.id, 1).await;
    let (status, body) = apply(&app, app.customer_token(), "ONCE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "This coupon has reached its maximum usage limit"
    );

    assert_eq!(app.reload_coupon(coupon.id).await.times_used, 1);
    assert_eq!(applied_rows(&app).await, 1);
}

#[tokio::test]
async fn switching_coupons_keeps_one_application() {
    let app = TestApp::new().await;
    let product = app.seed_product("Chinos", dec!(200), 10).await;
    let first = app
        .seed_coupon(coupon_input("FIRST", DiscountType::Fixed, dec!(15)))
        .await;
    let second = app
        .seed_coupon(coupon_input("SECOND", DiscountType::Percentage, dec!(5)))
        .await;

    app.add_to_cart(app.customer_token(), product.id, 1).await;
    apply(&app, app.customer_token(), "FIRST").await;
    let (status, body) = apply(&app, app.customer_token(), "SECOND").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["cart"]["discount"]), dec!(10));
    assert_eq!(body["cart"]["coupon"]["code"], "SECOND");

    assert_eq!(applied_rows(&app).await, 1);
    assert_eq!(app.reload_coupon(first.id).await.times_used, 1);
    assert_eq!(app.reload_coupon(second.id).await.times_used, 1);
}

#[tokio::test]
async fn removing_twice_never_goes_below_zero() {
    let app = TestApp::new().await;
    let product = app.seed_product("Belt", dec!(60), 10).await;
    let coupon = app
        .seed_coupon(coupon_input("TENOFF", DiscountType::Fixed, dec!(10)))
        .await;

    app.add_to_cart(app.customer_token(), product.id, 1).await;
    apply(&app, app.customer_token(), "TENOFF").await;

    let response = app
        .as_customer(Method::POST, "/api/v1/coupons/remove", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        "Coupon TENOFF has been removed from your cart."
    );
    assert_eq!(decimal(&body["cart"]["discount"]), dec!(0));

    let response = app
        .as_customer(Method::POST, "/api/v1/coupons/remove", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(response).await,
        json!({ "error": "No coupon is currently applied to your cart" })
    );

    assert_eq!(app.reload_coupon(coupon.id).await.times_used, 0);
}

#[tokio::test]
async fn clearing_cart_releases_coupon() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cap", dec!(40), 10).await;
    let coupon = app
        .seed_coupon(coupon_input("CAPS", DiscountType::Fixed, dec!(5)))
        .await;

    app.add_to_cart(app.customer_token(), product.id, 1).await;
    apply(&app, app.customer_token(), "CAPS").await;

    let response = app.as_customer(Method::DELETE, "/api/v1/cart", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Cart cleared successfully");
    assert!(body["cart"]["coupon"].is_null());

    assert_eq!(app.reload_coupon(coupon.id).await.times_used, 0);
    assert_eq!(applied_rows(&app).await, 0);
}

#[tokio::test]
async fn validate_has_no_side_effects() {
    let app = TestApp::new().await;
    let mut input = coupon_input("PCT20", DiscountType::Percentage, dec!(20));
    input.max_discount = Some(dec!(50));
    let coupon = app.seed_coupon(input).await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "pct20", "subtotal": "400" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["message"], "Coupon applied successfully!");
    assert_eq!(decimal(&body["discount_amount"]), dec!(50));

    let body = response_json(
        app.as_customer(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({ "code": "missing" })),
        )
        .await,
    )
    .await;
    assert_eq!(body["valid"], false);

    assert_eq!(app.reload_coupon(coupon.id).await.times_used, 0);
    assert_eq!(applied_rows(&app).await, 0);
}

#[tokio::test]
async fn admin_manages_coupons() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let payload = json!({
        "code": "welcome5",
        "discount_type": "fixed",
        "discount_value": "5",
        "valid_from": (now - Duration::days(1)).to_rfc3339(),
        "valid_to": (now + Duration::days(7)).to_rfc3339(),
        "usage_limit": 10
    });

    let response = app
        .as_admin(Method::POST, "/api/v1/admin/coupons", Some(payload.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    assert_eq!(created["code"], "WELCOME5");
    let id = created["id"].as_str().expect("coupon id").to_string();

    let response = app
        .as_admin(Method::POST, "/api/v1/admin/coupons", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let bad_dates = json!({
        "code": "BACKWARDS",
        "discount_type": "fixed",
        "discount_value": "5",
        "valid_from": (now + Duration::days(3)).to_rfc3339(),
        "valid_to": now.to_rfc3339()
    });
    let response = app
        .as_admin(Method::POST, "/api/v1/admin/coupons", Some(bad_dates))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .as_admin(Method::POST, &format!("/api/v1/admin/coupons/{id}/toggle"), None)
        .await;
    assert_eq!(response_json(response).await["is_active"], false);

    let response = app
        .as_admin(Method::DELETE, &format!("/api/v1/admin/coupons/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .as_admin(Method::GET, &format!("/api/v1/admin/coupons/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn used_coupon_cannot_be_deleted() {
    let app = TestApp::new().await;
    let product = app.seed_product("Tee", dec!(100), 10).await;
    let coupon = app
        .seed_coupon(coupon_input("USED", DiscountType::Fixed, dec!(10)))
        .await;
    app.add_to_cart(app.customer_token(), product.id, 1).await;
    apply(&app, app.customer_token(), "USED").await;

    let response = app
        .as_admin(
            Method::DELETE,
            &format!("/api/v1/admin/coupons/{}", coupon.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let usage = response_json(
        app.as_admin(
            Method::GET,
            &format!("/api/v1/admin/coupons/{}/usage", coupon.id),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(usage["total_uses"], 1);
    assert_eq!(decimal(&usage["total_discount"]), dec!(10));
}

#[tokio::test]
async fn empty_cart_takes_coupon_with_zero_discount() {
    let app = TestApp::new().await;
    let mut input = coupon_input("WELCOME", DiscountType::Percentage, dec!(15));
    input.min_order_amount = dec!(1000);
    let coupon = app.seed_coupon(input).await;

    // A zero subtotal skips the minimum order check.
    let (status, body) = apply(&app, app.customer_token(), "welcome").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["discount_amount"]), dec!(0));
    assert_eq!(decimal(&body["cart"]["total"]), dec!(0));
    assert_eq!(app.reload_coupon(coupon.id).await.times_used, 1);
    assert_eq!(applied_rows(&app).await, 1);

    let product = app.seed_product("Linen Shirt", dec!(400), 5).await;
    let cart = response_json(app.add_to_cart(app.customer_token(), product.id, 1).await).await;
    assert_eq!(decimal(&cart["discount"]), dec!(0));
    assert_eq!(decimal(&cart["total"]), dec!(400));
}
