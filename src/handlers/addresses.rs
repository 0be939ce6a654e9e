use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{
        created_response, map_service_error, no_content_response, success_response,
        validate_input,
    },
    services::accounts::AddressInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

/// Saved addresses of the caller
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/addresses", get(list_addresses).post(create_address))
        .route(
            "/addresses/:id",
            get(get_address).put(update_address).delete(delete_address),
        )
        .route("/addresses/:id/default", post(set_default_address))
}

async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let addresses = state
        .services
        .accounts
        .list_addresses(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(addresses))
}

async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddressInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let address = state
        .services
        .accounts
        .create_address(user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(address))
}

async fn get_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let address = state
        .services
        .accounts
        .get_address(user.user_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(address))
}

async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let address = state
        .services
        .accounts
        .update_address(user.user_id, id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(address))
}

async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .accounts
        .delete_address(user.user_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn set_default_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let address = state
        .services
        .accounts
        .set_default_address(user.user_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(address))
}
