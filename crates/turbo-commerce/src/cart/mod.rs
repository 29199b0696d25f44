//! Shopping cart module.
//!
//! Contains line pricing, reconciled line items, and the cart view.

mod line_item;
mod pricing;
mod view;

pub use line_item::{AddonSource, CartLineItem};
pub use pricing::{LineItemPricing, PriceCalculator, MAX_QUANTITY_PER_ITEM};
pub use view::{AppliedCoupon, CartView};
