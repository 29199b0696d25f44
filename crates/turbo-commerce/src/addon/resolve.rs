//! Turning raw add-on form values into priced selections.

use crate::addon::{AddonConfig, AddonConfigValue, AddonDefinition, AddonPrice, AddonSelection, ProductAddons};
use crate::error::CommerceError;
use crate::money::Money;

/// Resolve a shopper's add-on form into priced selections.
///
/// Selections come out in the product's field order. Multi-choice fields
/// produce one selection per chosen option. Fields left empty are skipped
/// unless they are required.
pub fn resolve_selections(
    product: &ProductAddons,
    config: &AddonConfig,
) -> Result<Vec<AddonSelection>, CommerceError> {
    if product.base_unit_price.is_negative() {
        return Err(CommerceError::NegativePrice(format!("product {}", product.product_id)));
    }

    if let Some(unknown) = config.keys().find(|field| product.field(field).is_none()) {
        return Err(CommerceError::UnknownAddon(unknown.to_string()));
    }

    let mut selections = Vec::new();
    for definition in &product.addons {
        let resolved = match config.get(&definition.field_id) {
            Some(value) => resolve_field(definition, value, &product.base_unit_price)?,
            None => Vec::new(),
        };
        if resolved.is_empty() && definition.required {
            return Err(CommerceError::RequiredAddonMissing(definition.field_id.to_string()));
        }
        selections.extend(resolved);
    }
    Ok(selections)
}

fn resolve_field(
    definition: &AddonDefinition,
    value: &AddonConfigValue,
    base: &Money,
) -> Result<Vec<AddonSelection>, CommerceError> {
    let field = definition.field_id.as_str();
    if value.kind() != definition.kind {
        return Err(CommerceError::invalid_value(
            field,
            format!("expected {}, got {}", definition.kind.as_str(), value.kind().as_str()),
        ));
    }

    match value {
        AddonConfigValue::Choice(index) => Ok(vec![choice(definition, *index, base)?]),
        AddonConfigValue::Choices(indices) => {
            let mut seen = Vec::with_capacity(indices.len());
            for index in indices {
                if seen.contains(index) {
                    return Err(CommerceError::invalid_value(
                        field,
                        format!("option {} selected twice", index),
                    ));
                }
                seen.push(*index);
            }
            indices
                .iter()
                .map(|index| choice(definition, *index, base))
                .collect()
        }
        AddonConfigValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(Vec::new());
            }
            let label = format!("{}: {}", definition.label, text);
            Ok(vec![priced(definition, label, definition.price.as_ref(), base)?])
        }
        AddonConfigValue::Number(n) => {
            if *n < 0 {
                return Err(CommerceError::invalid_value(field, "must not be negative"));
            }
            if *n == 0 {
                return Ok(Vec::new());
            }
            let quantity = u32::try_from(*n)
                .map_err(|_| CommerceError::invalid_value(field, "number too large"))?;
            let label = format!("{}: {}", definition.label, n);
            let selection = priced(definition, label, definition.price.as_ref(), base)?;
            Ok(vec![selection.with_quantity(quantity)])
        }
        AddonConfigValue::Date(date) => {
            let label = format!("{}: {}", definition.label, date.format("%Y-%m-%d"));
            Ok(vec![priced(definition, label, definition.price.as_ref(), base)?])
        }
    }
}

fn choice(definition: &AddonDefinition, index: usize, base: &Money) -> Result<AddonSelection, CommerceError> {
    let option = definition.options.get(index).ok_or_else(|| {
        CommerceError::invalid_value(
            definition.field_id.as_str(),
            format!("option {} out of range ({} options)", index, definition.options.len()),
        )
    })?;
    let label = format!("{}: {}", definition.label, option.label);
    priced(definition, label, option.price.as_ref(), base)
}

fn priced(
    definition: &AddonDefinition,
    label: String,
    price: Option<&AddonPrice>,
    base: &Money,
) -> Result<AddonSelection, CommerceError> {
    let unit_price = match price {
        Some(price) => price.resolve(base)?,
        None => Money::zero(base.currency),
    };
    if unit_price.is_negative() {
        return Err(CommerceError::NegativePrice(definition.field_id.to_string()));
    }
    Ok(AddonSelection::new(definition.field_id.clone(), label, unit_price))
}
