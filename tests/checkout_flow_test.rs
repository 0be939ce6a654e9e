//! Checkout, payment verification and order follow-up actions.

mod common;

use std::sync::atomic::Ordering;

use axum::http::{Method, StatusCode};
use clothingstore_api::{
    entities::commerce::{applied_coupon, AppliedCoupon, DiscountType},
    services::payments::payment_signature,
};
use common::{coupon_input, decimal, response_json, shipping_body, TestApp, GATEWAY_SECRET};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::{json, Value};

/// Cart of 2 x 150 with SAVE10 (10%, capped at 20), checked out.
async fn checked_out(app: &TestApp) -> Value {
    let product = app.seed_product("Kurta", dec!(150), 20).await;
    let mut input = coupon_input("SAVE10", DiscountType::Percentage, dec!(10));
    input.max_discount = Some(dec!(20));
    app.seed_coupon(input).await;

    app.add_to_cart(app.customer_token(), product.id, 2).await;
    app.as_customer(
        Method::POST,
        "/api/v1/coupons/apply",
        Some(json!({ "code": "SAVE10" })),
    )
    .await;

    let response = app
        .as_customer(Method::POST, "/api/v1/orders/checkout", Some(shipping_body()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

fn callback(gateway_order_id: &str, payment_id: &str, signature: &str) -> Value {
    json!({
        "razorpay_order_id": gateway_order_id,
        "razorpay_payment_id": payment_id,
        "razorpay_signature": signature,
    })
}

#[tokio::test]
async fn checkout_snapshots_cart_and_opens_payment() {
    let app = TestApp::new().await;
    let body = checked_out(&app).await;

    let order = &body["order"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["coupon_code"], "SAVE10");
    assert_eq!(order["country"], "IN");
    assert_eq!(decimal(&order["subtotal"]), dec!(300));
    assert_eq!(decimal(&order["discount"]), dec!(20));
    assert_eq!(decimal(&order["total"]), dec!(280));
    assert_eq!(order["items"][0]["quantity"], 2);
    assert_eq!(order["order_number"].as_str().map(str::len), Some(8));

    let payment = &body["payment"];
    assert_eq!(payment["amount"], 28000);
    assert_eq!(payment["currency"], "INR");
    assert_eq!(payment["key_id"], "gw_test_key");
    assert_eq!(payment["gateway_order_id"], "order_test_1");
    assert_eq!(payment["email"], "asha@example.com");

    // The cart survives until the payment is confirmed.
    let cart = response_json(app.as_customer(Method::GET, "/api/v1/cart", None).await).await;
    assert_eq!(cart["total_items"], 2);
}

#[tokio::test]
async fn verified_payment_empties_cart_and_keeps_coupon_history() {
    let app = TestApp::new().await;
    let body = checked_out(&app).await;
    let number = body["order"]["order_number"].as_str().expect("number").to_string();

    let signature = payment_signature(GATEWAY_SECRET, "order_test_1", "pay_001").expect("sign");
    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders/payment/verify",
            Some(callback("order_test_1", "pay_001", &signature)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = response_json(response).await;
    assert_eq!(result["status"], "success");
    assert_eq!(result["order_number"], number.as_str());

    let order = response_json(
        app.as_customer(Method::GET, &format!("/api/v1/orders/{number}"), None)
            .await,
    )
    .await;
    assert_eq!(order["status"], "processing");
    assert_eq!(order["payment_status"], "completed");
    assert_eq!(order["payment_id"], "pay_001");

    let cart = response_json(app.as_customer(Method::GET, "/api/v1/cart", None).await).await;
    assert!(cart["items"].as_array().expect("items").is_empty());
    assert!(cart["coupon"].is_null());

    let detached = AppliedCoupon::find()
        .filter(applied_coupon::Column::CartId.is_null())
        .count(&*app.state.db)
        .await
        .expect("count applications");
    assert_eq!(detached, 1);

    // A repeated callback is answered from the stored result.
    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders/payment/verify",
            Some(callback("order_test_1", "pay_001", &signature)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bad_signature_marks_payment_failed() {
    let app = TestApp::new().await;
    let body = checked_out(&app).await;
    let number = body["order"]["order_number"].as_str().expect("number").to_string();

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders/payment/verify",
            Some(callback("order_test_1", "pay_001", "forged")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let result = response_json(response).await;
    assert_eq!(result["status"], "error");

    let order = response_json(
        app.as_customer(Method::GET, &format!("/api/v1/orders/{number}"), None)
            .await,
    )
    .await;
    assert_eq!(order["status"], "payment_failed");
    assert_eq!(order["payment_status"], "failed");

    let cart = response_json(app.as_customer(Method::GET, "/api/v1/cart", None).await).await;
    assert_eq!(cart["total_items"], 2);
}

#[tokio::test]
async fn verification_input_errors() {
    let app = TestApp::new().await;
    checked_out(&app).await;

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders/payment/verify",
            Some(json!({ "razorpay_order_id": "order_test_1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(response).await,
        json!({ "status": "error", "message": "Missing payment details" })
    );

    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders/payment/verify",
            Some(callback("order_unknown", "pay_1", "sig")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Another shopper cannot confirm someone else's order.
    let other = app.new_customer("ravi").await;
    let signature = payment_signature(GATEWAY_SECRET, "order_test_1", "pay_1").expect("sign");
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/payment/verify",
            Some(callback("order_test_1", "pay_1", &signature)),
            Some(&other.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_cart_and_gateway_failure_create_no_order() {
    let app = TestApp::new().await;

    let response = app
        .as_customer(Method::POST, "/api/v1/orders/checkout", Some(shipping_body()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["message"], "Your cart is empty.");

    let product = app.seed_product("Saree", dec!(2500), 3).await;
    app.add_to_cart(app.customer_token(), product.id, 1).await;
    app.gateway.fail_create.store(true, Ordering::SeqCst);

    let response = app
        .as_customer(Method::POST, "/api/v1/orders/checkout", Some(shipping_body()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let orders = response_json(app.as_customer(Method::GET, "/api/v1/orders", None).await).await;
    assert!(orders.as_array().expect("orders").is_empty());
}

#[tokio::test]
async fn shipping_form_is_validated() {
    let app = TestApp::new().await;
    let product = app.seed_product("Dupatta", dec!(400), 3).await;
    app.add_to_cart(app.customer_token(), product.id, 1).await;

    let mut shipping = shipping_body();
    shipping["email"] = json!("not-an-email");
    let response = app
        .as_customer(Method::POST, "/api/v1/orders/checkout", Some(shipping))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["details"]["email"].is_array(), "{body}");
}

#[tokio::test]
async fn pending_order_can_be_cancelled_once() {
    let app = TestApp::new().await;
    let body = checked_out(&app).await;
    let number = body["order"]["order_number"].as_str().expect("number").to_string();

    let response = app
        .as_customer(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", number.to_lowercase()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = response_json(response).await;
    assert_eq!(
        result["message"],
        format!("Order #{number} has been cancelled successfully.")
    );
    assert_eq!(result["order"]["status"], "cancelled");

    let response = app
        .as_customer(
            Method::POST,
            &format!("/api/v1/orders/{number}/cancel"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancelled_order_ignores_late_payment() {
    let app = TestApp::new().await;
    let body = checked_out(&app).await;
    let number = body["order"]["order_number"].as_str().expect("number").to_string();

    let response = app
        .as_customer(Method::POST, &format!("/api/v1/orders/{number}/cancel"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let signature = payment_signature(GATEWAY_SECRET, "order_test_1", "pay_late").expect("sign");
    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders/payment/verify",
            Some(callback("order_test_1", "pay_late", &signature)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["status"], "error");

    let order = response_json(
        app.as_customer(Method::GET, &format!("/api/v1/orders/{number}"), None)
            .await,
    )
    .await;
    assert_eq!(order["status"], "cancelled");
    assert_eq!(order["payment_status"], "pending");
    assert!(order["payment_id"].is_null());

    let cart = response_json(app.as_customer(Method::GET, "/api/v1/cart", None).await).await;
    assert_eq!(cart["total_items"], 2);
}

#[tokio::test]
async fn failed_payment_cannot_be_confirmed_afterwards() {
    let app = TestApp::new().await;
    let body = checked_out(&app).await;
    let number = body["order"]["order_number"].as_str().expect("number").to_string();

    app.as_customer(
        Method::POST,
        "/api/v1/orders/payment/verify",
        Some(callback("order_test_1", "pay_001", "forged")),
    )
    .await;

    let signature = payment_signature(GATEWAY_SECRET, "order_test_1", "pay_001").expect("sign");
    let response = app
        .as_customer(
            Method::POST,
            "/api/v1/orders/payment/verify",
            Some(callback("order_test_1", "pay_001", &signature)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let order = response_json(
        app.as_customer(Method::GET, &format!("/api/v1/orders/{number}"), None)
            .await,
    )
    .await;
    assert_eq!(order["status"], "payment_failed");
}

#[tokio::test]
async fn reorder_skips_unavailable_products() {
    let app = TestApp::new().await;
    let body = checked_out(&app).await;
    let number = body["order"]["order_number"].as_str().expect("number").to_string();

    let response = app
        .as_customer(Method::POST, &format!("/api/v1/orders/{number}/reorder"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = response_json(response).await;
    assert_eq!(result["added"], 1);
    assert_eq!(result["skipped"], 0);
    // The original cart still holds the same line, so quantities merge.
    assert_eq!(result["cart"]["total_items"], 4);

    let product_id = body["order"]["items"][0]["product_id"]
        .as_str()
        .expect("product id")
        .to_string();
    app.as_admin(
        Method::PATCH,
        &format!("/api/v1/admin/products/{product_id}/stock"),
        Some(json!({ "stock": 0 })),
    )
    .await;

    let result = response_json(
        app.as_customer(Method::POST, &format!("/api/v1/orders/{number}/reorder"), None)
            .await,
    )
    .await;
    assert_eq!(result["added"], 0);
    assert_eq!(
        result["message"],
        "No items could be added to cart. Products may be out of stock."
    );
}

#[tokio::test]
async fn admin_moves_orders_through_status_table() {
    let app = TestApp::new().await;
    let body = checked_out(&app).await;
    let id = body["order"]["id"].as_str().expect("id").to_string();

    let response = app
        .as_customer(Method::GET, "/api/v1/admin/orders", None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let listing = response_json(
        app.as_admin(Method::GET, "/api/v1/admin/orders?status=pending&q=asha", None)
            .await,
    )
    .await;
    assert_eq!(listing["pagination"]["total"], 1);

    let response = app
        .as_admin(Method::GET, "/api/v1/admin/orders?status=bogus", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let status_uri = format!("/api/v1/admin/orders/{id}/status");
    let response = app
        .as_admin(Method::PUT, &status_uri, Some(json!({ "status": "shipped" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(response).await["message"],
        "Cannot change order status from pending to shipped"
    );

    for next in ["processing", "shipped", "delivered"] {
        let response = app
            .as_admin(Method::PUT, &status_uri, Some(json!({ "status": next })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let result = response_json(response).await;
        assert_eq!(result["status"], next);
        assert_eq!(result["message"], format!("Order status updated to {next}"));
    }

    let response = app
        .as_admin(Method::PUT, &status_uri, Some(json!({ "status": "teleported" })))
        .await;
    assert_eq!(response_json(response).await["message"], "Invalid status");

    let dashboard = response_json(
        app.as_admin(Method::GET, "/api/v1/admin/dashboard", None)
            .await,
    )
    .await;
    assert_eq!(dashboard["total_orders"], 1);
    assert_eq!(dashboard["pending_orders"], 0);
}
