//! Cart, coupons, checkout and wishlist.
pub mod cart_service;
pub mod checkout_service;
pub mod coupon_service;
pub mod pricing_service;
pub mod wishlist_service;

pub use cart_service::{AddToCartInput, CartService, CartSummary};
pub use checkout_service::{CheckoutService, PaymentOutcome, ShippingInput, VerifyPaymentInput};
pub use coupon_service::{CouponInput, CouponListQuery, CouponService};
pub use wishlist_service::WishlistService;
