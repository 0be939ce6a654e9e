use crate::{
    errors::ApiError,
    handlers::common::{map_service_error, success_response, PaginatedResponse, PaginationParams},
    services::catalog::ProductFilter,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Shopper-facing catalog, readable without a token
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/:slug", get(get_category))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/slug/:slug", get(get_product_by_slug))
}

/// Listing filters plus paging. Spelled out field by field: query strings do not
/// survive `#[serde(flatten)]` for non-string values.
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ProductListQuery {
    fn split(self) -> (ProductFilter, PaginationParams) {
        let defaults = PaginationParams::default();
        (
            ProductFilter {
                category: self.category,
                featured: self.featured,
                q: self.q,
            },
            PaginationParams {
                page: self.page.unwrap_or(defaults.page),
                per_page: self.per_page.unwrap_or(defaults.per_page),
            },
        )
    }
}

async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

/// Category with its active products
async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .catalog
        .get_category_by_slug(&slug)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, pagination) = query.split();
    let (page, per_page) = pagination.normalized();
    let (products, total) = state
        .services
        .catalog
        .list_products(filter, page, per_page)
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
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

async fn get_product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product_by_slug(&slug)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}
