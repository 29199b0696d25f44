//! Reconciled cart lines.

use crate::addon::AddonSelection;
use crate::cart::{LineItemPricing, PriceCalculator};
use crate::error::CommerceError;
use crate::ids::{LineItemKey, ProductId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Where a line's add-on prices came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonSource {
    /// The upstream snapshot carried priced add-ons.
    Server,
    /// The local ledger filled in what the upstream omitted.
    Ledger,
    /// The line has no add-ons.
    None,
    /// The upstream reports add-on selections without prices and the ledger
    /// knows nothing about the line. Priced as if it had no add-ons.
    Missing,
}

/// A cart line with add-ons and a recomputed total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLineItem {
    /// Server-assigned line key.
    pub key: LineItemKey,
    /// Product on this line.
    pub product_id: ProductId,
    /// Product name (denormalized for display).
    pub name: String,
    /// Quantity.
    pub quantity: i64,
    /// Unit price before add-ons.
    pub base_unit_price: Money,
    /// Priced add-ons applied to every unit.
    pub addons: Vec<AddonSelection>,
    /// Where `addons` came from.
    pub addon_source: AddonSource,
    /// (base_unit_price + add-ons) * quantity.
    pub line_total: Money,
}

impl CartLineItem {
    /// Build a line, computing its total.
    pub fn priced(
        key: LineItemKey,
        product_id: ProductId,
        name: impl Into<String>,
        quantity: i64,
        base_unit_price: Money,
        addons: Vec<AddonSelection>,
        addon_source: AddonSource,
    ) -> Result<Self, CommerceError> {
        let line_total = PriceCalculator::line_total(&base_unit_price, quantity, &addons)?;
        Ok(Self {
            key,
            product_id,
            name: name.into(),
            quantity,
            base_unit_price,
            addons,
            addon_source,
            line_total,
        })
    }

    /// Full pricing breakdown.
    pub fn pricing(&self) -> Result<LineItemPricing, CommerceError> {
        PriceCalculator::line_pricing(&self.base_unit_price, self.quantity, &self.addons)
    }

    /// Whether the line is priced without add-ons it is known to have.
    pub fn is_gap(&self) -> bool {
        self.addon_source == AddonSource::Missing
    }
}
