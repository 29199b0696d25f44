//! Priced add-on selections attached to cart lines.

use crate::error::CommerceError;
use crate::ids::AddonFieldId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// One priced add-on on a cart line.
///
/// Prices are frozen when the selection is created at add-to-cart time; a
/// later catalog price change does not reprice lines already in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonSelection {
    /// The add-on field this selection came from.
    pub field_id: AddonFieldId,
    /// Display label, e.g. "Gift wrap: Premium".
    pub label: String,
    /// Price per product unit.
    pub unit_price: Money,
    /// Multiplier for number-driven add-ons; absent means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl AddonSelection {
    pub fn new(field_id: impl Into<AddonFieldId>, label: impl Into<String>, unit_price: Money) -> Self {
        Self {
            field_id: field_id.into(),
            label: label.into(),
            unit_price,
            quantity: None,
        }
    }

    /// Set the selection multiplier.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// What this selection adds to one unit of the product.
    pub fn per_unit_amount(&self) -> Result<Money, CommerceError> {
        if self.unit_price.is_negative() {
            return Err(CommerceError::NegativePrice(self.field_id.to_string()));
        }
        self.unit_price
            .try_multiply(i64::from(self.quantity.unwrap_or(1)))
            .ok_or(CommerceError::Overflow)
    }
}
