//! Staff endpoints. Mounted behind the admin middleware, so every handler here runs
//! for an authenticated admin.

use crate::{
    auth::AdminUser,
    errors::ApiError,
    handlers::common::{
        created_response, map_service_error, no_content_response, success_response,
        validate_input, PaginatedResponse, PaginationParams,
    },
    services::{
        catalog::{CategoryInput, ProductImageInput, ProductInput, ProductSizeInput, SizeInput},
        commerce::{CouponInput, CouponListQuery},
        orders::AdminOrderQuery,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        // catalog
        .route("/admin/categories", get(list_categories).post(create_category))
        .route(
            "/admin/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route("/admin/sizes", get(list_sizes).post(create_size))
        .route("/admin/sizes/:id", put(update_size).delete(delete_size))
        .route("/admin/products", get(list_products).post(create_product))
        .route(
            "/admin/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/admin/products/:id/stock", patch(update_stock))
        .route("/admin/products/:id/sizes", put(set_product_sizes))
        .route("/admin/products/:id/images", post(add_image))
        .route(
            "/admin/products/:id/images/:image_id",
            axum::routing::delete(delete_image),
        )
        .route(
            "/admin/products/:id/images/:image_id/primary",
            post(set_primary_image),
        )
        // coupons
        .route("/admin/coupons", get(list_coupons).post(create_coupon))
        .route(
            "/admin/coupons/:id",
            get(get_coupon).put(update_coupon).delete(delete_coupon),
        )
        .route("/admin/coupons/:id/toggle", post(toggle_coupon))
        .route("/admin/coupons/:id/usage", get(coupon_usage))
        // orders
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/:id", get(get_order))
        .route("/admin/orders/:id/status", put(update_order_status))
}

async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .services
        .dashboard
        .stats()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(stats))
}

// ----- categories -----

async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_all_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .catalog
        .create_category(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .catalog
        .update_category(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_category(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

// ----- sizes -----

async fn list_sizes(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let sizes = state
        .services
        .catalog
        .list_sizes()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sizes))
}

async fn create_size(
    State(state): State<AppState>,
    Json(payload): Json<SizeInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let size = state
        .services
        .catalog
        .create_size(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(size))
}

async fn update_size(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SizeInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let size = state
        .services
        .catalog
        .update_size(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(size))
}

async fn delete_size(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_size(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

// ----- products -----

#[derive(Debug, Deserialize)]
pub struct AdminProductQuery {
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<AdminProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let defaults = PaginationParams::default();
    let (page, per_page) = PaginationParams {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    }
    .normalized();

    let (products, total) = state
        .services
        .catalog
        .list_all_products(query.q, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        products, page, per_page, total,
    )))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .admin_get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize)]
pub struct StockUpdateRequest {
    pub stock: Option<i32>,
}

async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .update_stock(id, payload.stock)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(json!({
        "success": true,
        "stock": product.stock,
    })))
}

async fn set_product_sizes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<Vec<ProductSizeInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let sizes = state
        .services
        .catalog
        .set_product_sizes(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sizes))
}

async fn add_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductImageInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let image = state
        .services
        .catalog
        .add_image(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(image))
}

async fn delete_image(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_image(id, image_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn set_primary_image(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let image = state
        .services
        .catalog
        .set_primary_image(id, image_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(image))
}

// ----- coupons -----

async fn list_coupons(
    State(state): State<AppState>,
    Query(query): Query<CouponListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let coupons = state
        .services
        .coupons
        .list(query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupons))
}

async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupon))
}

async fn create_coupon(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CouponInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let coupon = state
        .services
        .coupons
        .create(payload)
        .await
        .map_err(map_service_error)?;
    info!(admin_id = %admin.user_id, code = %coupon.code, "Coupon created by staff");
    Ok(created_response(coupon))
}

async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CouponInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let coupon = state
        .services
        .coupons
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupon))
}

async fn toggle_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .toggle(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupon))
}

async fn coupon_usage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .coupons
        .usage(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(report))
}

async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .coupons
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

// ----- orders -----

#[derive(Debug, Deserialize)]
pub struct AdminOrderListQuery {
    pub status: Option<String>,
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let defaults = PaginationParams::default();
    let (page, per_page) = PaginationParams {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    }
    .normalized();

    let filter = AdminOrderQuery {
        status: query.status,
        q: query.q,
    };
    let (orders, total) = state
        .services
        .orders
        .list_all(filter, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        orders, page, per_page, total,
    )))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: String,
}

async fn update_order_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_status(id, &payload.status)
        .await
        .map_err(map_service_error)?;
    let status = order.status.as_str();
    info!(admin_id = %admin.user_id, order_number = %order.order_number, %status, "Order status changed by staff");
    Ok(success_response(json!({
        "order_number": order.order_number,
        "status": status,
        "message": format!("Order status updated to {}", status),
    })))
}
