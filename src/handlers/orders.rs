use crate::{
    auth::AuthUser,
    errors::{ApiError, ServiceError},
    handlers::common::{created_response, map_service_error, success_response, validate_input},
    services::commerce::{PaymentOutcome, ShippingInput, VerifyPaymentInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::error;

/// Checkout, payment callback and order history of the caller
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/checkout", get(checkout_prefill).post(checkout))
        .route("/orders/payment/verify", post(verify_payment))
        .route("/orders/:order_number", get(get_order))
        .route("/orders/:order_number/cancel", post(cancel_order))
        .route("/orders/:order_number/reorder", post(reorder))
}

async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_for_user(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

/// Shipping values suggested from the saved profile
async fn checkout_prefill(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let prefill = state
        .services
        .accounts
        .checkout_prefill(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(prefill))
}

/// Turn the cart into a pending order and open a gateway payment for it
async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ShippingInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let response = state
        .services
        .checkout
        .checkout(user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(response))
}

fn payment_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

/// Payment callback. Every failure uses the `{status, message}` body.
async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentInput>,
) -> Response {
    match state
        .services
        .checkout
        .verify_payment(user.user_id, payload)
        .await
    {
        Ok(PaymentOutcome::Verified(order)) => success_response(json!({
            "status": "success",
            "message": "Payment verified successfully",
            "order_number": order.order_number,
            "redirect_url": format!("/orders/{}/success", order.order_number),
        })),
        Ok(PaymentOutcome::SignatureMismatch(_)) => payment_error(
            StatusCode::BAD_REQUEST,
            "Payment verification failed: Invalid signature. Please contact support if the amount was deducted.",
        ),
        Ok(PaymentOutcome::VerifierFailed(_)) => payment_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An error occurred while verifying your payment. Our team has been notified.",
        ),
        Err(ServiceError::BadRequest(message)) => payment_error(StatusCode::BAD_REQUEST, &message),
        Err(ServiceError::NotFound(message)) => payment_error(StatusCode::NOT_FOUND, &message),
        Err(e) => {
            error!(error = %e, "Unexpected error in payment verification");
            payment_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred. Please contact support with your order details.",
            )
        }
    }
}

async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_for_user(user.user_id, &order_number)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .cancel(user.user_id, &order_number)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(json!({
        "message": format!("Order #{} has been cancelled successfully.", order.order_number),
        "order": order,
    })))
}

async fn reorder(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .orders
        .reorder(user.user_id, &order_number)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}
