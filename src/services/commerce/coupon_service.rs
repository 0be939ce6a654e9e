use crate::{
    entities::commerce::{
        applied_coupon, cart, coupon, AppliedCoupon, AppliedCouponModel, Cart, Coupon,
        CouponModel, DiscountType,
    },
    errors::ServiceError,
    services::{
        catalog::non_negative_amount,
        commerce::{
            cart_service::{CartService, CartSummary},
            pricing_service::{
                calculate_discount, cart_totals, check_coupon, format_amount, normalize_code,
            },
        },
    },
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

const EMPTY_CODE: &str = "Please enter a coupon code";
const UNKNOWN_CODE: &str = "Invalid coupon code. Please check and try again.";

/// Coupon fields echoed back to the shopper
#[derive(Debug, Clone, Serialize)]
pub struct CouponBrief {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
}

impl From<&CouponModel> for CouponBrief {
    fn from(coupon: &CouponModel) -> Self {
        Self {
            code: coupon.code.clone(),
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value.round_dp(2),
            max_discount: coupon.max_discount.map(|m| m.round_dp(2)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponApplied {
    pub message: String,
    pub discount_amount: Decimal,
    pub coupon: CouponBrief,
    pub cart: CartSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponRemoved {
    pub message: String,
    pub cart: CartSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponValidation {
    pub valid: bool,
    pub message: String,
    pub discount_amount: Decimal,
    pub coupon: Option<CouponBrief>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatusFilter {
    Active,
    Expired,
    Scheduled,
    Inactive,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponListQuery {
    pub status: Option<CouponStatusFilter>,
    pub q: Option<String>,
}

/// Coupon fields as edited by staff. Updates replace every field.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CouponInput {
    #[validate(length(min = 1, max = 50, message = "Code must be 1-50 characters"))]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[validate(custom = "non_negative_amount")]
    pub discount_value: Decimal,
    #[serde(default)]
    #[validate(custom = "non_negative_amount")]
    pub min_order_amount: Decimal,
    #[validate(custom = "non_negative_amount")]
    pub max_discount: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_usage_limit")]
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: i32,
}

fn default_active() -> bool {
    true
}

fn default_usage_limit() -> i32 {
    1
}

impl CouponInput {
    fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        if self.valid_to <= self.valid_from {
            let mut errors = validator::ValidationErrors::new();
            let mut err = ValidationError::new("date_order");
            err.message = Some("Valid To date must be after Valid From date.".into());
            errors.add("valid_to", err);
            return Err(errors.into());
        }
        if normalize_code(&self.code).is_empty() {
            return Err(ServiceError::ValidationError(
                "Coupon code cannot be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponUsageEntry {
    pub user_id: Uuid,
    pub cart_id: Option<Uuid>,
    pub discount_amount: Decimal,
    pub applied_at: DateTime<Utc>,
}

impl From<AppliedCouponModel> for CouponUsageEntry {
    fn from(row: AppliedCouponModel) -> Self {
        Self {
            user_id: row.user_id,
            cart_id: row.cart_id,
            discount_amount: row.discount_amount.round_dp(2),
            applied_at: row.applied_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub uses: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponUsageReport {
    pub coupon: CouponModel,
    pub total_uses: u64,
    pub total_discount: Decimal,
    pub recent: Vec<CouponUsageEntry>,
    pub daily: Vec<DailyUsage>,
}

/// Applies, removes and administers discount coupons
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_active_by_code<C: ConnectionTrait>(
        db: &C,
        code: &str,
    ) -> Result<Option<CouponModel>, ServiceError> {
        Ok(Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .filter(coupon::Column::IsActive.eq(true))
            .one(db)
            .await?)
    }

    async fn user_uses<C: ConnectionTrait>(
        db: &C,
        coupon_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, ServiceError> {
        Ok(AppliedCoupon::find()
            .filter(applied_coupon::Column::CouponId.eq(coupon_id))
            .filter(applied_coupon::Column::UserId.eq(user_id))
            .count(db)
            .await?)
    }

    /// Applies `code` to the user's cart, replacing any coupon already there.
    ///
    /// The replaced coupon keeps its usage count.
    #[instrument(skip(self))]
    pub async fn apply(&self, user_id: Uuid, code: &str) -> Result<CouponApplied, ServiceError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(ServiceError::RuleViolation(EMPTY_CODE.to_string()));
        }

        let txn = self.db.begin().await?;

        let coupon = Self::find_active_by_code(&txn, &code)
            .await?
            .ok_or_else(|| ServiceError::RuleViolation(UNKNOWN_CODE.to_string()))?;

        let cart = CartService::get_or_create_cart(&txn, user_id).await?;
        let lines = CartService::priced_lines(&txn, cart.id).await?;
        let subtotal = cart_totals(
            lines
                .iter()
                .map(|l| (l.product.effective_price(), l.item.quantity)),
            Decimal::ZERO,
        )
        .subtotal;

        let uses = Self::user_uses(&txn, coupon.id, user_id).await?;
        let check = check_coupon(&coupon, Utc::now(), Some(uses), Some(subtotal));
        if !check.valid {
            info!(code = %coupon.code, reason = %check.message, "Coupon rejected");
            return Err(ServiceError::RuleViolation(check.message));
        }

        let discount = calculate_discount(&coupon, subtotal);

        AppliedCoupon::delete_many()
            .filter(applied_coupon::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        applied_coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            coupon_id: Set(coupon.id),
            user_id: Set(user_id),
            cart_id: Set(Some(cart.id)),
            discount_amount: Set(discount),
            applied_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        Coupon::update_many()
            .col_expr(
                coupon::Column::TimesUsed,
                Expr::col(coupon::Column::TimesUsed).add(1),
            )
            .filter(coupon::Column::Id.eq(coupon.id))
            .exec(&txn)
            .await?;

        let summary = CartService::summary_for(&txn, &cart).await?;
        txn.commit().await?;

        info!(code = %coupon.code, cart_id = %cart.id, %discount, "Coupon applied");
        Ok(CouponApplied {
            message: format!(
                "Coupon {} applied successfully! Discount: ₹{} applied to your order.",
                coupon.code,
                format_amount(discount)
            ),
            discount_amount: discount.round_dp(2),
            coupon: CouponBrief::from(&coupon),
            cart: summary,
        })
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: Uuid) -> Result<CouponRemoved, ServiceError> {
        let txn = self.db.begin().await?;
        let cart = CartService::get_or_create_cart(&txn, user_id).await?;

        let coupon = Self::release_applied_coupon(&txn, cart.id)
            .await?
            .ok_or_else(|| {
                ServiceError::RuleViolation(
                    "No coupon is currently applied to your cart".to_string(),
                )
            })?;

        let summary = CartService::summary_for(&txn, &cart).await?;
        txn.commit().await?;

        Ok(CouponRemoved {
            message: format!("Coupon {} has been removed from your cart.", coupon.code),
            cart: summary,
        })
    }

    /// Detaches the cart's coupon and gives back one use. Returns the released coupon.
    ///
    /// The counter never drops below zero.
    pub(crate) async fn release_applied_coupon<C: ConnectionTrait>(
        db: &C,
        cart_id: Uuid,
    ) -> Result<Option<CouponModel>, ServiceError> {
        let Some(applied) = AppliedCoupon::find()
            .filter(applied_coupon::Column::CartId.eq(cart_id))
            .lock_exclusive()
            .one(db)
            .await?
        else {
            return Ok(None);
        };

        AppliedCoupon::delete_by_id(applied.id).exec(db).await?;
        let released = Coupon::update_many()
            .col_expr(
                coupon::Column::TimesUsed,
                Expr::col(coupon::Column::TimesUsed).sub(1),
            )
            .filter(coupon::Column::Id.eq(applied.coupon_id))
            .filter(coupon::Column::TimesUsed.gt(0))
            .exec(db)
            .await?;
        if released.rows_affected == 0 {
            warn!(coupon_id = %applied.coupon_id, "Coupon usage already at zero");
        }

        let coupon = Coupon::find_by_id(applied.coupon_id).one(db).await?;
        if let Some(c) = &coupon {
            info!(code = %c.code, %cart_id, "Coupon released");
        }
        Ok(coupon)
    }

    /// Checks a code without touching the cart or the counters.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        user_id: Uuid,
        code: &str,
        subtotal: Option<Decimal>,
    ) -> Result<CouponValidation, ServiceError> {
        let code = normalize_code(code);
        let rejected = |message: &str| CouponValidation {
            valid: false,
            message: message.to_string(),
            discount_amount: Decimal::ZERO,
            coupon: None,
        };
        if code.is_empty() {
            return Ok(rejected(EMPTY_CODE));
        }
        let Some(coupon) = Self::find_active_by_code(&*self.db, &code).await? else {
            return Ok(rejected(UNKNOWN_CODE));
        };

        let subtotal = match subtotal {
            Some(amount) => amount,
            None => self.cart_subtotal(user_id).await?,
        };
        let uses = Self::user_uses(&*self.db, coupon.id, user_id).await?;
        let check = check_coupon(&coupon, Utc::now(), Some(uses), Some(subtotal));
        let discount_amount = if check.valid {
            calculate_discount(&coupon, subtotal)
        } else {
            Decimal::ZERO
        };

        Ok(CouponValidation {
            valid: check.valid,
            message: check.message,
            discount_amount: discount_amount.round_dp(2),
            coupon: Some(CouponBrief::from(&coupon)),
        })
    }

    async fn cart_subtotal(&self, user_id: Uuid) -> Result<Decimal, ServiceError> {
        let Some(cart) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        else {
            return Ok(Decimal::ZERO);
        };
        let lines = CartService::priced_lines(&*self.db, cart.id).await?;
        Ok(cart_totals(
            lines
                .iter()
                .map(|l| (l.product.effective_price(), l.item.quantity)),
            Decimal::ZERO,
        )
        .subtotal)
    }

    // ----- admin -----

    #[instrument(skip(self))]
    pub async fn list(&self, query: CouponListQuery) -> Result<Vec<CouponModel>, ServiceError> {
        let now = Utc::now();
        let mut select = Coupon::find();

        select = match query.status {
            Some(CouponStatusFilter::Active) => select
                .filter(coupon::Column::IsActive.eq(true))
                .filter(coupon::Column::ValidFrom.lte(now))
                .filter(coupon::Column::ValidTo.gte(now)),
            Some(CouponStatusFilter::Expired) => select.filter(coupon::Column::ValidTo.lt(now)),
            Some(CouponStatusFilter::Scheduled) => {
                select.filter(coupon::Column::ValidFrom.gt(now))
            }
            Some(CouponStatusFilter::Inactive) => select.filter(coupon::Column::IsActive.eq(false)),
            None => select,
        };

        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(coupon::Column::Code.contains(q.to_uppercase()))
                    .add(coupon::Column::Description.contains(q)),
            );
        }

        Ok(select
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<CouponModel, ServiceError> {
        Coupon::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CouponInput) -> Result<CouponModel, ServiceError> {
        input.check()?;
        let code = normalize_code(&input.code);
        self.ensure_code_unique(&code, None).await?;

        let now = Utc::now();
        let coupon = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            description: Set(input.description),
            discount_type: Set(input.discount_type),
            discount_value: Set(input.discount_value),
            min_order_amount: Set(input.min_order_amount),
            max_discount: Set(input.max_discount),
            valid_from: Set(input.valid_from),
            valid_to: Set(input.valid_to),
            is_active: Set(input.is_active),
            usage_limit: Set(input.usage_limit),
            times_used: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(coupon_id = %coupon.id, "Coupon \"{}\" created", coupon.code);
        Ok(coupon)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: Uuid, input: CouponInput) -> Result<CouponModel, ServiceError> {
        input.check()?;
        let existing = self.get(id).await?;
        let code = normalize_code(&input.code);
        self.ensure_code_unique(&code, Some(id)).await?;

        let mut active: coupon::ActiveModel = existing.into();
        active.code = Set(code);
        active.description = Set(input.description);
        active.discount_type = Set(input.discount_type);
        active.discount_value = Set(input.discount_value);
        active.min_order_amount = Set(input.min_order_amount);
        active.max_discount = Set(input.max_discount);
        active.valid_from = Set(input.valid_from);
        active.valid_to = Set(input.valid_to);
        active.is_active = Set(input.is_active);
        active.usage_limit = Set(input.usage_limit);
        active.updated_at = Set(Utc::now());
        let coupon = active.update(&*self.db).await?;

        info!(coupon_id = %coupon.id, "Coupon \"{}\" updated", coupon.code);
        Ok(coupon)
    }

    #[instrument(skip(self))]
    pub async fn toggle(&self, id: Uuid) -> Result<CouponModel, ServiceError> {
        let existing = self.get(id).await?;
        let enabled = !existing.is_active;

        let mut active: coupon::ActiveModel = existing.into();
        active.is_active = Set(enabled);
        active.updated_at = Set(Utc::now());
        let coupon = active.update(&*self.db).await?;

        info!(
            coupon_id = %coupon.id,
            "Coupon \"{}\" has been {}",
            coupon.code,
            if enabled { "activated" } else { "deactivated" }
        );
        Ok(coupon)
    }

    #[instrument(skip(self))]
    pub async fn usage(&self, id: Uuid) -> Result<CouponUsageReport, ServiceError> {
        let coupon = self.get(id).await?;

        let rows = AppliedCoupon::find()
            .filter(applied_coupon::Column::CouponId.eq(id))
            .order_by_desc(applied_coupon::Column::AppliedAt)
            .all(&*self.db)
            .await?;

        let total_discount: Decimal = rows.iter().map(|r| r.discount_amount).sum();
        let daily = daily_usage(&rows, Utc::now(), 30);
        let total_uses = rows.len() as u64;
        let recent = rows.into_iter().take(10).map(CouponUsageEntry::from).collect();

        Ok(CouponUsageReport {
            coupon,
            total_uses,
            total_discount: total_discount.round_dp(2),
            recent,
            daily,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let coupon = self.get(id).await?;

        let uses = AppliedCoupon::find()
            .filter(applied_coupon::Column::CouponId.eq(id))
            .count(&*self.db)
            .await?;
        if uses > 0 {
            return Err(ServiceError::Conflict(format!(
                "Cannot delete coupon '{}' as it has been used in orders.",
                coupon.code
            )));
        }

        Coupon::delete_by_id(id).exec(&*self.db).await?;
        info!(coupon_id = %id, "Coupon \"{}\" deleted", coupon.code);
        Ok(())
    }

    async fn ensure_code_unique(&self, code: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = Coupon::find().filter(coupon::Column::Code.eq(code));
        if let Some(id) = except {
            query = query.filter(coupon::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A coupon with code '{}' already exists",
                code
            )));
        }
        Ok(())
    }
}

/// Applications per calendar day (UTC) over the last `days` days, oldest first.
/// Days without applications are omitted.
fn daily_usage(rows: &[AppliedCouponModel], now: DateTime<Utc>, days: i64) -> Vec<DailyUsage> {
    let since = now - Duration::days(days);
    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.applied_at >= since) {
        *counts.entry(row.applied_at.date_naive()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(date, uses)| DailyUsage { date, uses })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn application(applied_at: DateTime<Utc>) -> AppliedCouponModel {
        AppliedCouponModel {
            id: Uuid::new_v4(),
            coupon_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            cart_id: None,
            discount_amount: dec!(20),
            applied_at,
        }
    }

    #[test]
    fn daily_usage_groups_by_day_and_skips_old_rows() {
        let now = Utc::now();
        let rows = vec![
            application(now),
            application(now - Duration::minutes(1)),
            application(now - Duration::days(2)),
            application(now - Duration::days(45)),
        ];
        let daily = daily_usage(&rows, now, 30);
        let total: u64 = daily.iter().map(|d| d.uses).sum();
        assert_eq!(total, 3);
        assert!(daily.windows(2).all(|w| w[0].date < w[1].date));
        assert!(daily.iter().all(|d| d.date >= (now - Duration::days(30)).date_naive()));
    }

    fn input(from: DateTime<Utc>, to: DateTime<Utc>) -> CouponInput {
        CouponInput {
            code: "save10".into(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: dec!(10),
            min_order_amount: Decimal::ZERO,
            max_discount: Some(dec!(20)),
            valid_from: from,
            valid_to: to,
            is_active: true,
            usage_limit: 5,
        }
    }

    #[test]
    fn coupon_dates_must_be_ordered() {
        let now = Utc::now();
        assert!(input(now, now + Duration::days(1)).check().is_ok());

        let err = input(now, now - Duration::days(1)).check().unwrap_err();
        match err {
            ServiceError::InvalidFields(errors) => {
                let details = crate::errors::field_errors(&errors);
                assert_eq!(
                    details["valid_to"][0],
                    "Valid To date must be after Valid From date."
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn negative_values_are_rejected() {
        let now = Utc::now();
        let mut bad = input(now, now + Duration::days(1));
        bad.discount_value = dec!(-5);
        assert!(matches!(bad.check(), Err(ServiceError::InvalidFields(_))));

        let mut zero_limit = input(now, now + Duration::days(1));
        zero_limit.usage_limit = 0;
        assert!(matches!(zero_limit.check(), Err(ServiceError::InvalidFields(_))));
    }
}
