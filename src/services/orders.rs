use crate::{
    entities::{
        accounts::{user, User},
        catalog::{product, Product},
        commerce::{order, order_item, Order, OrderItem, OrderItemModel, OrderModel, OrderStatus},
    },
    errors::ServiceError,
    services::{catalog::CatalogService, commerce::cart_service::{CartService, CartSummary}},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
    pub total: Decimal,
}

impl From<OrderItemModel> for OrderLine {
    fn from(item: OrderItemModel) -> Self {
        let total = item.total().round_dp(2);
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            price: item.price.round_dp(2),
            size: item.size,
            color: item.color,
            total,
        }
    }
}

/// Order header plus its lines
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorderResult {
    pub message: String,
    pub added: usize,
    pub skipped: usize,
    pub cart: CartSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<String>,
    /// Matches order number or customer email
    pub q: Option<String>,
}

/// Order history for shoppers and order management for staff
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub(crate) async fn detail<C: ConnectionTrait>(
        db: &C,
        order: OrderModel,
    ) -> Result<OrderDetail, ServiceError> {
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(OrderLine::from)
            .collect();
        Ok(OrderDetail { order, items })
    }

    async fn find_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        order_number: &str,
    ) -> Result<OrderModel, ServiceError> {
        Order::find()
            .filter(order::Column::OrderNumber.eq(order_number.trim().to_uppercase()))
            .filter(order::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))
    }

    /// The user's orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderModel>, ServiceError> {
        Ok(Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_for_user(
        &self,
        user_id: Uuid,
        order_number: &str,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Self::find_for_user(&*self.db, user_id, order_number).await?;
        Self::detail(&*self.db, order).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid, order_number: &str) -> Result<OrderModel, ServiceError> {
        let order = Self::find_for_user(&*self.db, user_id, order_number).await?;
        if !order.status.is_cancellable() {
            return Err(ServiceError::RuleViolation(
                "This order cannot be cancelled as it has already been shipped or delivered."
                    .to_string(),
            ));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        let order = active.update(&*self.db).await?;

        info!(order_number = %order.order_number, "Order cancelled by customer");
        Ok(order)
    }

    /// Copies the order's lines back into the cart. Products that are inactive, out of
    /// stock, or whose size is no longer offered are skipped.
    #[instrument(skip(self))]
    pub async fn reorder(
        &self,
        user_id: Uuid,
        order_number: &str,
    ) -> Result<ReorderResult, ServiceError> {
        let txn = self.db.begin().await?;
        let order = Self::find_for_user(&txn, user_id, order_number).await?;
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?;
        let cart = CartService::get_or_create_cart(&txn, user_id).await?;

        let (mut added, mut skipped) = (0usize, 0usize);
        for item in items {
            let available = Product::find_by_id(item.product_id)
                .filter(product::Column::IsActive.eq(true))
                .filter(product::Column::Stock.gt(0))
                .one(&txn)
                .await?;
            let Some(product) = available else {
                skipped += 1;
                continue;
            };

            if let Some(size_id) = item.size_id {
                let sizes = CatalogService::available_sizes(&txn, product.id).await?;
                if !sizes.iter().any(|s| s.size_id == size_id) {
                    skipped += 1;
                    continue;
                }
            }

            CartService::add_line(
                &txn,
                cart.id,
                product.id,
                item.size_id,
                item.color.clone(),
                item.quantity,
            )
            .await?;
            added += 1;
        }

        let summary = CartService::summary_for(&txn, &cart).await?;
        txn.commit().await?;

        let message = if added > 0 {
            format!(
                "{} items from order #{} have been added to your cart.",
                added, order.order_number
            )
        } else {
            "No items could be added to cart. Products may be out of stock.".to_string()
        };
        info!(order_number = %order.order_number, added, skipped, "Reorder processed");
        Ok(ReorderResult {
            message,
            added,
            skipped,
            cart: summary,
        })
    }

    // ----- admin -----

    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        query: AdminOrderQuery,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let mut select = Order::find();

        if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
            let status = OrderStatus::parse(status)
                .ok_or_else(|| ServiceError::InvalidStatus("Invalid status".to_string()))?;
            select = select.filter(order::Column::Status.eq(status));
        }

        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let matching_users: Vec<Uuid> = User::find()
                .select_only()
                .column(user::Column::Id)
                .filter(
                    Condition::any()
                        .add(user::Column::Email.contains(q))
                        .add(user::Column::Username.contains(q)),
                )
                .into_tuple()
                .all(&*self.db)
                .await?;
            select = select.filter(
                Condition::any()
                    .add(order::Column::OrderNumber.contains(q.to_uppercase()))
                    .add(order::Column::Email.contains(q))
                    .add(order::Column::UserId.is_in(matching_users)),
            );
        }

        let paginator = select
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
        Self::detail(&*self.db, order).await
    }

    /// Moves an order along the status table.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: Uuid, status: &str) -> Result<OrderModel, ServiceError> {
        let next = OrderStatus::parse(status)
            .ok_or_else(|| ServiceError::InvalidStatus("Invalid status".to_string()))?;
        let order = Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

        if !order.status.can_transition_to(next) {
            warn!(
                order_number = %order.order_number,
                from = %order.status.as_str(),
                to = %next.as_str(),
                "Rejected status change"
            );
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot change order status from {} to {}",
                order.status.as_str(),
                next.as_str()
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(next);
        active.updated_at = Set(Utc::now());
        let order = active.update(&*self.db).await?;

        info!(order_number = %order.order_number, status = %next.as_str(), "Order status updated");
        Ok(order)
    }
}
