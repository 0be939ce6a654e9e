use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{map_service_error, success_response},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/wishlist", get(list_wishlist).post(add_to_wishlist).delete(clear_wishlist))
        .route("/wishlist/:product_id", delete(remove_from_wishlist))
        .route("/wishlist/:product_id/toggle", post(toggle_wishlist))
}

#[derive(Debug, Deserialize)]
pub struct AddToWishlistRequest {
    pub product_id: Uuid,
}

async fn list_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let wishlist = state
        .services
        .wishlist
        .list(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(wishlist))
}

async fn add_to_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToWishlistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let change = state
        .services
        .wishlist
        .add(user.user_id, payload.product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(change))
}

async fn remove_from_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let change = state
        .services
        .wishlist
        .remove(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(change))
}

async fn toggle_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let change = state
        .services
        .wishlist
        .toggle(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(change))
}

async fn clear_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let change = state
        .services
        .wishlist
        .clear(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(change))
}
