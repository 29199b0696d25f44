//! Cart snapshots as the upstream service reports them.
//!
//! Amounts are strings in minor units (`"10000"` is $100.00). Line items may
//! carry priced `addons`, but usually only report the raw selections under
//! `item_data` with no amounts attached.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use turbo_commerce::{AddonFieldId, AddonSelection, CouponCode, Currency, LineItemKey, Money, ProductId};

/// The whole cart, server-authoritative but missing add-on prices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCartSnapshot {
    #[serde(default)]
    pub items: Vec<ServerLineItem>,
    #[serde(default)]
    pub coupons: Vec<ServerCoupon>,
    #[serde(default)]
    pub totals: ServerTotals,
}

impl ServerCartSnapshot {
    /// Keys of every line in the snapshot.
    pub fn line_keys(&self) -> HashSet<LineItemKey> {
        self.items.iter().map(|i| i.key.clone()).collect()
    }

    /// The snapshot currency, if it names one we support.
    pub fn currency(&self) -> Option<Currency> {
        Currency::from_code(&self.totals.currency_code)
    }

    pub fn item(&self, key: &LineItemKey) -> Option<&ServerLineItem> {
        self.items.iter().find(|i| &i.key == key)
    }
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLineItem {
    pub key: LineItemKey,
    /// Product id.
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    pub prices: ServerItemPrices,
    /// Raw add-on selections, without prices.
    #[serde(default)]
    pub item_data: Vec<ServerItemData>,
    /// Priced add-ons, when the upstream chooses to report them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addons: Option<Vec<ServerAddon>>,
}

impl ServerLineItem {
    /// Unit price before add-ons.
    pub fn base_unit_price(&self, currency: Currency) -> Option<Money> {
        Money::parse_minor(&self.prices.price, currency)
    }

    /// Priced add-ons, if the line carries usable ones.
    ///
    /// An empty list counts as "no data", as does a list with any price that
    /// does not parse: a partial list would undercount silently.
    pub fn priced_addons(&self, currency: Currency) -> Option<Vec<AddonSelection>> {
        let addons = self.addons.as_ref().filter(|a| !a.is_empty())?;
        addons.iter().map(|a| a.to_selection(currency)).collect()
    }

    /// Whether the upstream reports add-on selections for this line.
    pub fn has_raw_selections(&self) -> bool {
        !self.item_data.is_empty()
    }
}

/// Per-line prices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerItemPrices {
    /// Unit price, minor units.
    pub price: String,
}

/// A raw selection: what was chosen, not what it costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerItemData {
    pub name: String,
    pub value: String,
}

/// A priced add-on as reported by the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddon {
    pub field_id: AddonFieldId,
    pub label: String,
    /// Per-unit price, minor units.
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl ServerAddon {
    fn to_selection(&self, currency: Currency) -> Option<AddonSelection> {
        let price = Money::parse_minor(&self.price, currency)?;
        let selection = AddonSelection::new(self.field_id.clone(), self.label.clone(), price);
        Some(match self.quantity {
            Some(q) => selection.with_quantity(q),
            None => selection,
        })
    }
}

/// An applied coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCoupon {
    pub code: CouponCode,
    #[serde(default)]
    pub totals: ServerCouponTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCouponTotals {
    #[serde(default)]
    pub total_discount: String,
}

/// Cart totals. `total_price` excludes add-ons and is never trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTotals {
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
    #[serde(default)]
    pub total_items: String,
    #[serde(default)]
    pub total_discount: String,
    #[serde(default)]
    pub total_shipping: Option<String>,
    #[serde(default)]
    pub total_tax: String,
    #[serde(default)]
    pub total_price: String,
}

fn default_currency_code() -> String {
    Currency::default().code().to_string()
}

impl Default for ServerTotals {
    fn default() -> Self {
        Self {
            currency_code: default_currency_code(),
            total_items: String::new(),
            total_discount: String::new(),
            total_shipping: None,
            total_tax: String::new(),
            total_price: String::new(),
        }
    }
}

/// Parse an informational total, treating absent or unreadable values as
/// zero.
pub(crate) fn lenient_amount(raw: Option<&str>, currency: Currency) -> Money {
    match raw.map(str::trim) {
        None | Some("") => Money::zero(currency),
        Some(raw) => Money::parse_minor(raw, currency).unwrap_or_else(|| {
            tracing::warn!(value = raw, "unreadable upstream amount; using zero");
            Money::zero(currency)
        }),
    }
}
