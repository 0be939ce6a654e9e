pub mod applied_coupon;
pub mod cart;
pub mod cart_item;
pub mod coupon;
pub mod order;
pub mod order_item;
pub mod wishlist_item;

pub use applied_coupon::{Entity as AppliedCoupon, Model as AppliedCouponModel};
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use coupon::{DiscountType, Entity as Coupon, Model as CouponModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, PaymentStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use wishlist_item::{Entity as WishlistItem, Model as WishlistItemModel};
