use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::success_response,
    AppState,
};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

/// Coupon actions on the caller's cart
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons/apply", post(apply_coupon))
        .route("/coupons/remove", post(remove_coupon))
        .route("/coupons/validate", post(validate_coupon))
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    #[serde(default)]
    pub code: String,
    /// Defaults to the current cart subtotal
    pub subtotal: Option<Decimal>,
}

/// Shopper-facing coupon failures render as `{"error": reason}`.
pub struct CouponError(ServiceError);

impl From<ServiceError> for CouponError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for CouponError {
    fn into_response(self) -> Response {
        match self.0 {
            ServiceError::RuleViolation(reason)
            | ServiceError::BadRequest(reason)
            | ServiceError::ValidationError(reason) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
            }
            other => other.into_response(),
        }
    }
}

async fn apply_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ApplyCouponRequest>,
) -> Result<Response, CouponError> {
    let applied = state
        .services
        .coupons
        .apply(user.user_id, &payload.code)
        .await?;
    Ok(success_response(applied))
}

async fn remove_coupon(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, CouponError> {
    let removed = state.services.coupons.remove(user.user_id).await?;
    Ok(success_response(removed))
}

/// Reports whether a code would apply, without applying it
async fn validate_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ValidateCouponRequest>,
) -> Result<Response, CouponError> {
    let result = state
        .services
        .coupons
        .validate(user.user_id, &payload.code, payload.subtotal)
        .await?;
    Ok(success_response(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn rule_violations_use_error_key() {
        let response =
            CouponError(ServiceError::RuleViolation("This coupon is not active".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "This coupon is not active" }));
    }

    #[tokio::test]
    async fn other_errors_keep_standard_body() {
        let response = CouponError(ServiceError::NotFound("gone".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
