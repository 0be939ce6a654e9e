use crate::{
    auth::{AuthUser, TokenPair},
    entities::accounts::UserModel,
    errors::{ApiError, ServiceError},
    handlers::common::{created_response, map_service_error, success_response, validate_input},
    services::accounts::{LoginInput, ProfileUpdate, ProfileView, RegisterInput},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::info;

/// Token plus the account it was issued for
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: ProfileView,
    #[serde(flatten)]
    pub token: TokenPair,
}

/// Registration and login; no token required
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(get_profile).put(update_profile))
}

fn issue_token(state: &AppState, user: &UserModel) -> Result<TokenPair, ApiError> {
    state
        .auth
        .generate_token(user)
        .map_err(|e| map_service_error(ServiceError::InternalError(e.to_string())))
}

/// Create an account and return a token for it
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .accounts
        .register(payload)
        .await
        .map_err(map_service_error)?;
    let token = issue_token(&state, &user)?;
    let profile = state
        .services
        .accounts
        .get_profile(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(AuthResponse {
        user: profile,
        token,
    }))
}

/// Exchange username (or email) and password for a token
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .accounts
        .authenticate(payload)
        .await
        .map_err(map_service_error)?;
    let token = issue_token(&state, &user)?;
    let profile = state
        .services
        .accounts
        .get_profile(user.id)
        .await
        .map_err(map_service_error)?;

    info!(user_id = %user.id, "User logged in");
    Ok(success_response(AuthResponse {
        user: profile,
        token,
    }))
}

async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .services
        .accounts
        .get_profile(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let profile = state
        .services
        .accounts
        .update_profile(user.user_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(profile))
}
