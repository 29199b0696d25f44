//! Cart pricing domain types for TurboCommerce.
//!
//! This crate provides the types the cart reconciliation layer is built on:
//!
//! - **Money**: integer minor-unit amounts with checked arithmetic
//! - **Add-ons**: definitions, raw form values, priced selections
//! - **Cart**: `PriceCalculator`, reconciled line items, the cart view
//!
//! # Example
//!
//! ```rust
//! use turbo_commerce::prelude::*;
//!
//! let addons = vec![
//!     AddonSelection::new("wrap", "Gift wrap", Money::new(2000, Currency::USD)),
//!     AddonSelection::new("card", "Card", Money::new(1500, Currency::USD)),
//! ];
//! let line = CartLineItem::priced(
//!     LineItemKey::new("c4ca4238"),
//!     ProductId(12),
//!     "Walnut box",
//!     2,
//!     Money::new(10000, Currency::USD),
//!     addons,
//!     AddonSource::Ledger,
//! )
//! .unwrap();
//! assert_eq!(line.line_total.display(), "$270.00");
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod addon;
pub mod cart;

pub use addon::{
    config_fingerprint, config_to_wire, resolve_selections, AddonConfig, AddonConfigValue,
    AddonDefinition, AddonKind, AddonOption, AddonPrice, AddonSelection, ProductAddons,
};
pub use cart::{
    AddonSource, AppliedCoupon, CartLineItem, CartView, LineItemPricing, PriceCalculator,
    MAX_QUANTITY_PER_ITEM,
};
pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Add-ons
    pub use crate::addon::{
        resolve_selections, AddonConfig, AddonConfigValue, AddonDefinition, AddonKind,
        AddonOption, AddonPrice, AddonSelection, ProductAddons,
    };

    // Cart
    pub use crate::cart::{
        AddonSource, AppliedCoupon, CartLineItem, CartView, LineItemPricing, PriceCalculator,
    };
}
