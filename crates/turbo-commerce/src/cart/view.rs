//! The price-complete cart handed to callers.

use crate::cart::CartLineItem;
use crate::error::CommerceError;
use crate::ids::{CouponCode, LineItemKey};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// A coupon applied to the cart, as reported upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedCoupon {
    /// The coupon code used.
    pub code: CouponCode,
    /// Amount discounted.
    pub discount: Money,
}

/// A cart view: upstream totals for shipping, tax and coupons, overlaid
/// with line totals recomputed from add-on prices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartView {
    /// Cart currency.
    pub currency: Currency,
    /// Reconciled lines, in upstream order.
    pub items: Vec<CartLineItem>,
    /// Applied coupons.
    pub coupons: Vec<AppliedCoupon>,
    /// Upstream-computed discount total.
    pub discount_total: Money,
    /// Upstream-computed shipping total.
    pub shipping_total: Money,
    /// Upstream-computed tax total.
    pub tax_total: Money,
    /// What the upstream reported as its total. Kept for diagnostics only;
    /// it does not include add-on prices.
    pub server_total: Money,
    /// Sum of recomputed line totals.
    pub grand_total: Money,
    /// Lines priced without add-ons they are known to have.
    pub gaps: Vec<LineItemKey>,
}

impl CartView {
    /// Assemble a view, summing line totals into the grand total.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        currency: Currency,
        items: Vec<CartLineItem>,
        coupons: Vec<AppliedCoupon>,
        discount_total: Money,
        shipping_total: Money,
        tax_total: Money,
        server_total: Money,
    ) -> Result<Self, CommerceError> {
        let grand_total = Money::try_sum(items.iter().map(|i| &i.line_total), currency)
            .ok_or(CommerceError::Overflow)?;
        let gaps = items
            .iter()
            .filter(|i| i.is_gap())
            .map(|i| i.key.clone())
            .collect();
        Ok(Self {
            currency,
            items,
            coupons,
            discount_total,
            shipping_total,
            tax_total,
            server_total,
            grand_total,
            gaps,
        })
    }

    /// An empty cart.
    pub fn empty(currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            currency,
            items: Vec::new(),
            coupons: Vec::new(),
            discount_total: zero,
            shipping_total: zero,
            tax_total: zero,
            server_total: zero,
            grand_total: zero,
            gaps: Vec::new(),
        }
    }

    /// What the shopper pays: grand total - discounts + shipping + tax.
    pub fn amount_due(&self) -> Result<Money, CommerceError> {
        self.grand_total
            .try_subtract(&self.discount_total)
            .and_then(|m| m.try_add(&self.shipping_total))
            .and_then(|m| m.try_add(&self.tax_total))
            .ok_or(CommerceError::Overflow)
    }

    /// Get a line by key.
    pub fn get_item(&self, key: &LineItemKey) -> Option<&CartLineItem> {
        self.items.iter().find(|i| &i.key == key)
    }

    /// Total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether any line is priced without its add-ons.
    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }
}
