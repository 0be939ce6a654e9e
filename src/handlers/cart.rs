use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{map_service_error, success_response, validate_input},
    services::commerce::AddToCartInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Creates the router for the caller's cart
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_to_cart))
        .route("/cart/items/:id", put(update_cart_item).delete(remove_cart_item))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Add item to cart
async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .add_item(user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Update cart item quantity; zero removes the line
async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .update_item(user.user_id, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove_item(user.user_id, item_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Clear all items from cart
async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .clear(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "message": "Cart cleared successfully",
        "cart": cart,
    })))
}
