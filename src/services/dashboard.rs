use crate::{
    entities::{
        catalog::{product, Product, ProductModel},
        commerce::{order, Order, OrderModel, OrderStatus, PaymentStatus},
    },
    errors::ServiceError,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub pending_orders: u64,
    /// Orders placed in the last 30 days
    pub recent_orders: u64,
    pub low_stock_products: Vec<ProductModel>,
    pub latest_orders: Vec<OrderModel>,
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
    low_stock_threshold: i32,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>, low_stock_threshold: i32) -> Self {
        Self {
            db,
            low_stock_threshold,
        }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        let db = &*self.db;

        let total_products = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .count(db)
            .await?;
        let total_orders = Order::find().count(db).await?;
        let pending_orders = Order::find()
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .count(db)
            .await?;
        let recent_orders = Order::find()
            .filter(order::Column::CreatedAt.gte(Utc::now() - Duration::days(30)))
            .count(db)
            .await?;

        // Summed in Rust: SUM over decimals differs between Postgres and SQLite.
        let paid_totals: Vec<Decimal> = Order::find()
            .select_only()
            .column(order::Column::Total)
            .filter(order::Column::PaymentStatus.eq(PaymentStatus::Completed))
            .into_tuple()
            .all(db)
            .await?;
        let total_revenue: Decimal = paid_totals.into_iter().sum();

        let low_stock_products = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::Stock.lt(self.low_stock_threshold))
            .order_by_asc(product::Column::Stock)
            .all(db)
            .await?;

        let latest_orders = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .limit(5)
            .all(db)
            .await?;

        Ok(DashboardStats {
            total_products,
            total_orders,
            total_revenue: total_revenue.round_dp(2),
            pending_orders,
            recent_orders,
            low_stock_products,
            latest_orders,
        })
    }
}
