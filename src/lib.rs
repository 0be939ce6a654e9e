//! Clothing store API library
//!
//! Catalog, cart, coupons, checkout with a hosted payment gateway, wishlist,
//! addresses and a JSON admin surface.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod request_context;
pub mod services;

use axum::{
    extract::FromRef,
    http::{HeaderName, HeaderValue},
    middleware, Router,
};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    auth::{admin_middleware, auth_middleware, AuthService},
    config::AppConfig,
    request_context::{request_id_middleware, RequestSpanMaker, REQUEST_ID_HEADER},
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Versioned API. Shopper routes require a bearer token, `/admin` routes the admin role.
pub fn api_v1_routes(auth: Arc<AuthService>) -> Router<AppState> {
    let public = Router::new()
        .merge(handlers::auth::public_routes())
        .merge(handlers::catalog::catalog_routes());

    let shopper = Router::new()
        .merge(handlers::auth::profile_routes())
        .merge(handlers::cart::cart_routes())
        .merge(handlers::coupons::coupon_routes())
        .merge(handlers::addresses::address_routes())
        .merge(handlers::orders::order_routes())
        .merge(handlers::wishlist::wishlist_routes())
        .route_layer(middleware::from_fn_with_state(auth.clone(), auth_middleware));

    let admin = handlers::admin::admin_routes()
        .route_layer(middleware::from_fn_with_state(auth, admin_middleware));

    Router::new().merge(public).merge(shopper).merge(admin)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        info!("No CORS origins configured; using permissive CORS");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Full application router with the HTTP middleware stack applied.
pub fn build_router(state: AppState) -> Router {
    let request_id_header: HeaderName = REQUEST_ID_HEADER;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/api/v1", api_v1_routes(state.auth.clone()))
        .nest("/health", handlers::health::health_routes())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(RequestSpanMaker))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state)
}
