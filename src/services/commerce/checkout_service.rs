use crate::{
    config::AppConfig,
    entities::commerce::{
        applied_coupon, cart, cart_item, order, order_item, AppliedCoupon, Cart, CartItem, Coupon,
        Order, OrderModel, OrderStatus, PaymentStatus,
    },
    errors::ServiceError,
    services::{
        commerce::{cart_service::CartService, pricing_service::cart_totals},
        orders::{OrderDetail, OrderService},
        payments::{amount_in_minor_units, PaymentGateway},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Shipping details entered at checkout
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShippingInput {
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 20, message = "Phone number is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, max = 20, message = "ZIP code is required"))]
    pub zip_code: String,
    #[serde(default = "default_country")]
    #[validate(length(min = 1, max = 100))]
    pub country: String,
}

fn default_country() -> String {
    "IN".to_string()
}

/// Values the browser needs to open the hosted payment form
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub key_id: String,
    pub gateway_order_id: String,
    /// Minor units (paise)
    pub amount: i64,
    pub currency: String,
    pub store_name: String,
    pub name: String,
    pub email: String,
    pub contact: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub order: OrderDetail,
    pub payment: PaymentRequest,
}

/// Callback fields posted after the hosted payment form completes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyPaymentInput {
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_id: Option<String>,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: Option<String>,
    #[serde(alias = "razorpay_signature")]
    pub signature: Option<String>,
}

/// How a payment verification ended. Each variant carries the updated order.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Verified(OrderModel),
    SignatureMismatch(OrderModel),
    VerifierFailed(OrderModel),
}

/// Turns carts into orders and records payment results
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            gateway,
            config,
        }
    }

    /// Creates a pending order from the cart and registers it with the gateway.
    ///
    /// The cart is left intact until the payment is verified. A gateway failure rolls
    /// the order back.
    #[instrument(skip(self, shipping), fields(user_id = %user_id))]
    pub async fn checkout(
        &self,
        user_id: Uuid,
        shipping: ShippingInput,
    ) -> Result<CheckoutResponse, ServiceError> {
        shipping.validate()?;

        let txn = self.db.begin().await?;
        let cart = CartService::get_or_create_cart(&txn, user_id).await?;
        let lines = CartService::priced_lines(&txn, cart.id).await?;
        if lines.is_empty() {
            return Err(ServiceError::BadRequest("Your cart is empty.".to_string()));
        }

        let applied = AppliedCoupon::find()
            .filter(applied_coupon::Column::CartId.eq(cart.id))
            .find_also_related(Coupon)
            .one(&txn)
            .await?;
        let (discount, coupon_code) = match applied {
            Some((applied, coupon)) => (applied.discount_amount, coupon.map(|c| c.code)),
            None => (Decimal::ZERO, None),
        };

        let totals = cart_totals(
            lines
                .iter()
                .map(|l| (l.product.effective_price(), l.item.quantity)),
            discount,
        );

        let now = Utc::now();
        let order_number = Self::new_order_number(&txn).await?;
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number.clone()),
            user_id: Set(user_id),
            full_name: Set(shipping.full_name.trim().to_string()),
            email: Set(shipping.email.trim().to_string()),
            phone: Set(shipping.phone.trim().to_string()),
            address: Set(shipping.address.trim().to_string()),
            city: Set(shipping.city.trim().to_string()),
            state: Set(shipping.state.trim().to_string()),
            zip_code: Set(shipping.zip_code.trim().to_string()),
            country: Set(shipping.country.trim().to_string()),
            subtotal: Set(totals.subtotal.round_dp(2)),
            discount: Set(totals.discount.round_dp(2)),
            total: Set(totals.total.round_dp(2)),
            coupon_code: Set(coupon_code),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            gateway_order_id: Set(None),
            payment_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for line in &lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(line.product.id),
                product_name: Set(line.product.name.clone()),
                quantity: Set(line.item.quantity),
                price: Set(line.product.effective_price()),
                size_id: Set(line.item.size_id),
                size: Set(line.size_name.clone()),
                color: Set(line.item.color.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        let amount = amount_in_minor_units(order.total)?;
        let currency = self.config.payment.currency.clone();
        let gateway_order = self
            .gateway
            .create_order(amount, &currency, &format!("order_{}", order_number))
            .await
            .map_err(|e| {
                error!(order_number = %order_number, error = %e, "Error creating gateway order");
                e
            })?;

        let mut active: order::ActiveModel = order.into();
        active.gateway_order_id = Set(Some(gateway_order.id.clone()));
        let order = active.update(&txn).await?;

        let detail = OrderService::detail(&txn, order).await?;
        txn.commit().await?;

        info!(
            order_number = %order_number,
            gateway_order_id = %gateway_order.id,
            amount,
            "Order created, awaiting payment"
        );

        let payment = PaymentRequest {
            key_id: self.gateway.key_id().to_string(),
            gateway_order_id: gateway_order.id,
            amount,
            currency,
            store_name: self.config.store_name.clone(),
            name: detail.order.full_name.clone(),
            email: detail.order.email.clone(),
            contact: detail.order.phone.clone(),
        };
        Ok(CheckoutResponse {
            order: detail,
            payment,
        })
    }

    /// Eight upper-case hex characters, retried on the rare collision.
    async fn new_order_number<C: ConnectionTrait>(db: &C) -> Result<String, ServiceError> {
        for _ in 0..5 {
            let candidate = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
            let taken = Order::find()
                .filter(order::Column::OrderNumber.eq(candidate.as_str()))
                .one(db)
                .await?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
        }
        Err(ServiceError::InternalError(
            "could not allocate a unique order number".to_string(),
        ))
    }

    /// Checks the gateway signature and records the result on the order.
    ///
    /// On success the user's cart is emptied and its coupon is kept as usage history.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        input: VerifyPaymentInput,
    ) -> Result<PaymentOutcome, ServiceError> {
        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let (Some(gateway_order_id), Some(payment_id), Some(signature)) = (
            present(input.gateway_order_id),
            present(input.payment_id),
            present(input.signature),
        ) else {
            warn!("Missing payment details in verification request");
            return Err(ServiceError::BadRequest("Missing payment details".to_string()));
        };

        let txn = self.db.begin().await?;
        let order = Order::find()
            .filter(order::Column::GatewayOrderId.eq(gateway_order_id.as_str()))
            .filter(order::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                error!(gateway_order_id = %gateway_order_id, "Order not found for gateway order");
                ServiceError::NotFound(
                    "Order not found. Please contact support with order details.".to_string(),
                )
            })?;

        if order.payment_status == PaymentStatus::Completed {
            info!(order_number = %order.order_number, "Payment already verified");
            return Ok(PaymentOutcome::Verified(order));
        }

        // Payment results only move pending orders.
        if !order.status.can_transition_to(OrderStatus::Processing) {
            warn!(
                order_number = %order.order_number,
                status = %order.status.as_str(),
                "Payment callback for an order that is no longer pending"
            );
            return Err(ServiceError::BadRequest(format!(
                "Order #{} is {} and can no longer be paid. Please contact support if the amount was deducted.",
                order.order_number,
                order.status.as_str().replace('_', " ")
            )));
        }

        let verdict = self
            .gateway
            .verify_signature(&gateway_order_id, &payment_id, &signature);

        let mut active: order::ActiveModel = order.clone().into();
        active.updated_at = Set(Utc::now());
        let outcome = match verdict {
            Ok(true) => {
                active.payment_status = Set(PaymentStatus::Completed);
                active.status = Set(OrderStatus::Processing);
                active.payment_id = Set(Some(payment_id));
                let order = active.update(&txn).await?;
                Self::empty_cart_after_payment(&txn, user_id).await?;
                info!(order_number = %order.order_number, "Payment successful");
                PaymentOutcome::Verified(order)
            }
            Ok(false) => {
                active.payment_status = Set(PaymentStatus::Failed);
                active.status = Set(OrderStatus::PaymentFailed);
                let order = active.update(&txn).await?;
                error!(order_number = %order.order_number, "Payment signature verification failed");
                PaymentOutcome::SignatureMismatch(order)
            }
            Err(e) => {
                active.payment_status = Set(PaymentStatus::Failed);
                active.status = Set(OrderStatus::PaymentError);
                let order = active.update(&txn).await?;
                error!(order_number = %order.order_number, error = %e, "Error verifying payment");
                PaymentOutcome::VerifierFailed(order)
            }
        };

        txn.commit().await?;
        Ok(outcome)
    }

    async fn empty_cart_after_payment<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        let Some(cart) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(db)
            .await?
        else {
            return Ok(());
        };

        AppliedCoupon::update_many()
            .col_expr(
                applied_coupon::Column::CartId,
                Expr::value(Option::<Uuid>::None),
            )
            .filter(applied_coupon::Column::CartId.eq(cart.id))
            .exec(db)
            .await?;
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(db)
            .await?;
        Ok(())
    }
}
