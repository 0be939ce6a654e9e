pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod common;
pub mod coupons;
pub mod health;
pub mod orders;
pub mod wishlist;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        accounts::AccountService,
        catalog::CatalogService,
        commerce::{CartService, CheckoutService, CouponService, WishlistService},
        dashboard::DashboardService,
        orders::OrderService,
        payments::PaymentGateway,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub coupons: Arc<CouponService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub wishlist: Arc<WishlistService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        config: Arc<AppConfig>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(db_pool.clone())),
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            cart: Arc::new(CartService::new(db_pool.clone())),
            coupons: Arc::new(CouponService::new(db_pool.clone())),
            checkout: Arc::new(CheckoutService::new(
                db_pool.clone(),
                gateway,
                config.clone(),
            )),
            orders: Arc::new(OrderService::new(db_pool.clone())),
            wishlist: Arc::new(WishlistService::new(db_pool.clone())),
            dashboard: Arc::new(DashboardService::new(
                db_pool,
                config.low_stock_threshold,
            )),
        }
    }
}
