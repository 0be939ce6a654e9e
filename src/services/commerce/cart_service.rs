use crate::{
    entities::{
        catalog::{product, Product, ProductModel, Size},
        commerce::{
            applied_coupon, cart, cart_item, AppliedCoupon, Cart, CartItem, CartModel, Coupon,
            DiscountType,
        },
    },
    errors::ServiceError,
    services::{
        catalog::CatalogService,
        commerce::{coupon_service::CouponService, pricing_service::cart_totals},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Line as shown in the cart
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub size_id: Option<Uuid>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedCouponView {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
    pub discount_amount: Decimal,
    pub applied_at: DateTime<Utc>,
}

/// Cart with its derived totals
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub id: Uuid,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub total_items: i64,
    pub coupon: Option<AppliedCouponView>,
}

impl CartSummary {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub size_id: Option<Uuid>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Line loaded together with its product
pub(crate) struct PricedLine {
    pub item: cart_item::Model,
    pub product: ProductModel,
    pub size_name: Option<String>,
}

/// Per-user shopping cart
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub(crate) async fn get_or_create_cart<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        if let Some(cart) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(db)
            .await?
        {
            return Ok(cart);
        }
        let now = Utc::now();
        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        info!(cart_id = %cart.id, user_id = %user_id, "Created cart");
        Ok(cart)
    }

    /// Items with their current products. Lines whose product vanished are skipped.
    pub(crate) async fn priced_lines<C: ConnectionTrait>(
        db: &C,
        cart_id: Uuid,
    ) -> Result<Vec<PricedLine>, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .find_also_related(Product)
            .all(db)
            .await?;

        let size_ids: Vec<Uuid> = rows.iter().filter_map(|(i, _)| i.size_id).collect();
        let size_names: HashMap<Uuid, String> = if size_ids.is_empty() {
            HashMap::new()
        } else {
            Size::find()
                .filter(crate::entities::catalog::size::Column::Id.is_in(size_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|s| (s.id, s.display_name))
                .collect()
        };

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| {
                let product = product?;
                let size_name = item.size_id.and_then(|id| size_names.get(&id).cloned());
                Some(PricedLine {
                    item,
                    product,
                    size_name,
                })
            })
            .collect())
    }

    /// Totals use the stored coupon discount; it is not recomputed here.
    pub(crate) async fn summary_for<C: ConnectionTrait>(
        db: &C,
        cart: &CartModel,
    ) -> Result<CartSummary, ServiceError> {
        let lines = Self::priced_lines(db, cart.id).await?;

        let applied = AppliedCoupon::find()
            .filter(applied_coupon::Column::CartId.eq(cart.id))
            .find_also_related(Coupon)
            .one(db)
            .await?;

        let (discount, coupon) = match applied {
            Some((applied, Some(coupon))) => (
                applied.discount_amount,
                Some(AppliedCouponView {
                    code: coupon.code,
                    discount_type: coupon.discount_type,
                    discount_value: coupon.discount_value.round_dp(2),
                    max_discount: coupon.max_discount.map(|m| m.round_dp(2)),
                    discount_amount: applied.discount_amount.round_dp(2),
                    applied_at: applied.applied_at,
                }),
            ),
            _ => (Decimal::ZERO, None),
        };

        let totals = cart_totals(
            lines
                .iter()
                .map(|l| (l.product.effective_price(), l.item.quantity)),
            discount,
        );

        let items = lines
            .into_iter()
            .map(|l| {
                let unit_price = l.product.effective_price();
                CartLine {
                    id: l.item.id,
                    product_id: l.product.id,
                    product_name: l.product.name,
                    product_slug: l.product.slug,
                    size_id: l.item.size_id,
                    size: l.size_name,
                    color: l.item.color,
                    quantity: l.item.quantity,
                    unit_price: unit_price.round_dp(2),
                    total: (unit_price * Decimal::from(l.item.quantity)).round_dp(2),
                }
            })
            .collect();

        Ok(CartSummary {
            id: cart.id,
            items,
            subtotal: totals.subtotal.round_dp(2),
            discount: totals.discount.round_dp(2),
            total: totals.total.round_dp(2),
            total_items: totals.total_items,
            coupon,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartSummary, ServiceError> {
        let cart = Self::get_or_create_cart(&*self.db, user_id).await?;
        Self::summary_for(&*self.db, &cart).await
    }

    /// Adds a line, or bumps the quantity of the matching (product, size, color) line.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartSummary, ServiceError> {
        input.validate()?;
        let color = input
            .color
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let txn = self.db.begin().await?;

        let product = Product::find_by_id(input.product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let sizes = CatalogService::available_sizes(&txn, product.id).await?;
        let size_id = if sizes.is_empty() {
            None
        } else {
            let chosen = input.size_id.ok_or_else(|| {
                ServiceError::BadRequest("Please select a size before adding to cart.".to_string())
            })?;
            if !sizes.iter().any(|s| s.size_id == chosen) {
                return Err(ServiceError::BadRequest(
                    "Selected size is not available for this product.".to_string(),
                ));
            }
            Some(chosen)
        };

        let cart = Self::get_or_create_cart(&txn, user_id).await?;

        Self::add_line(&txn, cart.id, product.id, size_id, color, input.quantity).await?;

        let summary = Self::summary_for(&txn, &cart).await?;
        txn.commit().await?;
        info!(cart_id = %cart.id, product_id = %product.id, "{} added to cart", product.name);
        Ok(summary)
    }

    /// Sets a line's quantity; zero or less removes the line.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartSummary, ServiceError> {
        let txn = self.db.begin().await?;
        let cart = Self::get_or_create_cart(&txn, user_id).await?;
        let line = Self::owned_line(&txn, cart.id, item_id).await?;

        if quantity > 0 {
            let mut active: cart_item::ActiveModel = line.into();
            active.quantity = Set(quantity);
            active.updated_at = Set(Utc::now());
            active.update(&txn).await?;
        } else {
            CartItem::delete_by_id(item_id).exec(&txn).await?;
        }

        let summary = Self::summary_for(&txn, &cart).await?;
        txn.commit().await?;
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartSummary, ServiceError> {
        let txn = self.db.begin().await?;
        let cart = Self::get_or_create_cart(&txn, user_id).await?;
        Self::owned_line(&txn, cart.id, item_id).await?;
        CartItem::delete_by_id(item_id).exec(&txn).await?;

        let summary = Self::summary_for(&txn, &cart).await?;
        txn.commit().await?;
        Ok(summary)
    }

    /// Empties the cart and releases any applied coupon.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<CartSummary, ServiceError> {
        let txn = self.db.begin().await?;
        let cart = Self::get_or_create_cart(&txn, user_id).await?;

        CouponService::release_applied_coupon(&txn, cart.id).await?;
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        let summary = Self::summary_for(&txn, &cart).await?;
        txn.commit().await?;
        info!(cart_id = %cart.id, "Cart cleared");
        Ok(summary)
    }

    /// Inserts a line or adds `quantity` to the matching (product, size, color) line.
    pub(crate) async fn add_line<C: ConnectionTrait>(
        db: &C,
        cart_id: Uuid,
        product_id: Uuid,
        size_id: Option<Uuid>,
        color: Option<String>,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let mut existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id));
        existing = match size_id {
            Some(id) => existing.filter(cart_item::Column::SizeId.eq(id)),
            None => existing.filter(cart_item::Column::SizeId.is_null()),
        };
        existing = match color.as_deref() {
            Some(c) => existing.filter(cart_item::Column::Color.eq(c)),
            None => existing.filter(cart_item::Column::Color.is_null()),
        };

        let now = Utc::now();
        match existing.one(db).await? {
            Some(line) => {
                let total = line.quantity + quantity;
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(total);
                active.updated_at = Set(now);
                active.update(db).await?;
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart_id),
                    product_id: Set(product_id),
                    size_id: Set(size_id),
                    color: Set(color),
                    quantity: Set(quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(db)
                .await?;
            }
        }
        Ok(())
    }

    async fn owned_line<C: ConnectionTrait>(
        db: &C,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        CartItem::find_by_id(item_id)
            .filter(cart_item::Column::CartId.eq(cart_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))
    }
}
