//! Coupon rules and cart arithmetic. Pure functions; no database access.

use crate::entities::commerce::{CouponModel, DiscountType};
use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

pub const COUPON_OK_MESSAGE: &str = "Coupon applied successfully!";

/// Outcome of a coupon validity check. `message` is shown to the shopper as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponCheck {
    pub valid: bool,
    pub message: String,
}

impl CouponCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            message: COUPON_OK_MESSAGE.to_string(),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Checks a coupon at `now`. The first failing rule decides the message.
///
/// `user_uses` is the number of applications the caller already has for this coupon,
/// when a caller is known. It is compared against the same `usage_limit` as the global
/// counter. `subtotal` only takes part in the minimum-order rule when positive.
pub fn check_coupon(
    coupon: &CouponModel,
    now: DateTime<Utc>,
    user_uses: Option<u64>,
    subtotal: Option<Decimal>,
) -> CouponCheck {
    if !coupon.is_active {
        return CouponCheck::rejected("This coupon is not active");
    }

    if now < coupon.valid_from {
        return CouponCheck::rejected(format!(
            "This coupon is not valid until {}",
            format_local_time(coupon.valid_from)
        ));
    }

    if now > coupon.valid_to {
        return CouponCheck::rejected(format!(
            "This coupon expired on {}",
            format_local_time(coupon.valid_to)
        ));
    }

    if coupon.times_used >= coupon.usage_limit {
        return CouponCheck::rejected("This coupon has reached its maximum usage limit");
    }

    if let Some(uses) = user_uses {
        if coupon.usage_limit > 0 && uses >= coupon.usage_limit as u64 {
            return CouponCheck::rejected(
                "You have already used this coupon the maximum number of times",
            );
        }
    }

    if let Some(subtotal) = subtotal {
        if subtotal > Decimal::ZERO && subtotal < coupon.min_order_amount {
            return CouponCheck::rejected(format!(
                "Minimum order amount of ₹{} required for this coupon (current: ₹{})",
                format_amount(coupon.min_order_amount),
                format_amount(subtotal)
            ));
        }
    }

    CouponCheck::ok()
}

/// Discount a coupon grants on `amount`.
///
/// Never fails: a malformed coupon value or an arithmetic overflow yields zero.
pub fn calculate_discount(coupon: &CouponModel, amount: Decimal) -> Decimal {
    if amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if coupon.discount_value < Decimal::ZERO {
        warn!(code = %coupon.code, value = %coupon.discount_value, "negative coupon value, no discount");
        return Decimal::ZERO;
    }

    match coupon.discount_type {
        DiscountType::Percentage => {
            let raw = coupon
                .discount_value
                .checked_div(Decimal::ONE_HUNDRED)
                .and_then(|rate| rate.checked_mul(amount));
            let Some(mut discount) = raw else {
                warn!(code = %coupon.code, %amount, "discount calculation overflowed");
                return Decimal::ZERO;
            };
            if let Some(cap) = coupon.max_discount {
                discount = discount.min(cap);
            }
            discount.min(amount).round_dp(2)
        }
        DiscountType::Fixed => coupon.discount_value.min(amount),
    }
}

/// Derived cart figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub total_items: i64,
}

/// Totals for `(unit_price, quantity)` lines plus an already-computed discount.
pub fn cart_totals<I>(lines: I, discount: Decimal) -> CartTotals
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let (subtotal, total_items) = lines.into_iter().fold(
        (Decimal::ZERO, 0i64),
        |(sum, count), (price, quantity)| {
            (sum + price * Decimal::from(quantity), count + i64::from(quantity))
        },
    );
    let discount = discount.max(Decimal::ZERO);
    CartTotals {
        subtotal,
        discount,
        total: (subtotal - discount).max(Decimal::ZERO),
        total_items,
    }
}

/// `1234.5` -> `"1,234.50"`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = format!("{:.2}", amount.round_dp(2));
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{frac_part}")
}

/// Coupon dates are shown in the server's local time, e.g. `Mar 05, 2025 09:30 AM`.
pub fn format_local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%b %d, %Y %I:%M %p")
        .to_string()
}

/// Trimmed, upper-cased coupon code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
