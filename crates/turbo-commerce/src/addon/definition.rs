//! Add-on definitions as published by the product catalog.

use crate::error::CommerceError;
use crate::ids::{AddonFieldId, ProductId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// The input type of an add-on field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonKind {
    /// Pick exactly one option (select, radio).
    SingleChoice,
    /// Pick any number of options (checkboxes).
    MultiChoice,
    /// Free-form text (engraving, message).
    Text,
    /// Free-form number; when priced, it multiplies the field price.
    Number,
    /// A calendar date.
    Date,
}

impl AddonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddonKind::SingleChoice => "single_choice",
            AddonKind::MultiChoice => "multi_choice",
            AddonKind::Text => "text",
            AddonKind::Number => "number",
            AddonKind::Date => "date",
        }
    }

    /// Whether values of this kind select from `options`.
    pub fn is_choice(&self) -> bool {
        matches!(self, AddonKind::SingleChoice | AddonKind::MultiChoice)
    }
}

/// How an add-on (or one of its options) is priced, per product unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AddonPrice {
    /// A fixed amount added to every unit.
    Fixed(Money),
    /// A share of the product's base unit price, in basis points.
    PercentOfBase(i64),
}

impl AddonPrice {
    /// Resolve to a concrete per-unit amount against the base unit price.
    pub fn resolve(&self, base_unit_price: &Money) -> Result<Money, CommerceError> {
        match self {
            AddonPrice::Fixed(amount) => {
                if amount.currency != base_unit_price.currency {
                    return Err(CommerceError::CurrencyMismatch {
                        expected: base_unit_price.currency.code().to_string(),
                        got: amount.currency.code().to_string(),
                    });
                }
                Ok(*amount)
            }
            AddonPrice::PercentOfBase(bps) => base_unit_price
                .try_basis_points(*bps)
                .ok_or(CommerceError::Overflow),
        }
    }
}

/// One selectable option of a choice add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonOption {
    /// Option label shown to the shopper.
    pub label: String,
    /// Price of the option; `None` means free.
    #[serde(default)]
    pub price: Option<AddonPrice>,
}

impl AddonOption {
    pub fn new(label: impl Into<String>, price: Option<AddonPrice>) -> Self {
        Self {
            label: label.into(),
            price,
        }
    }
}

/// A configurable add-on field on a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonDefinition {
    /// Field identifier, also the key in the add-item `addonConfig`.
    pub field_id: AddonFieldId,
    /// Field label.
    pub label: String,
    /// Input type.
    pub kind: AddonKind,
    /// Price for non-choice kinds.
    #[serde(default)]
    pub price: Option<AddonPrice>,
    /// Options for choice kinds.
    #[serde(default)]
    pub options: Vec<AddonOption>,
    /// Whether the shopper must fill the field in.
    #[serde(default)]
    pub required: bool,
}

impl AddonDefinition {
    /// Create a field with no price and no options.
    pub fn new(field_id: impl Into<AddonFieldId>, label: impl Into<String>, kind: AddonKind) -> Self {
        Self {
            field_id: field_id.into(),
            label: label.into(),
            kind,
            price: None,
            options: Vec::new(),
            required: false,
        }
    }

    /// Set the field price.
    pub fn with_price(mut self, price: AddonPrice) -> Self {
        self.price = Some(price);
        self
    }

    /// Append an option.
    pub fn with_option(mut self, option: AddonOption) -> Self {
        self.options.push(option);
        self
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A product's base price together with its add-on form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAddons {
    pub product_id: ProductId,
    /// Base unit price, before add-ons.
    pub base_unit_price: Money,
    /// Add-on fields in display order.
    #[serde(default)]
    pub addons: Vec<AddonDefinition>,
}

impl ProductAddons {
    /// Look up a field definition.
    pub fn field(&self, field_id: &AddonFieldId) -> Option<&AddonDefinition> {
        self.addons.iter().find(|a| &a.field_id == field_id)
    }
}
