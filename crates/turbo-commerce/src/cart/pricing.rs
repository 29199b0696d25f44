//! Line item price calculations.

use crate::addon::AddonSelection;
use crate::error::CommerceError;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// Pure line pricing: `(base + sum of add-ons per unit) * quantity`.
///
/// All arithmetic is checked integer math in minor units, so recomputing a
/// line any number of times always yields the same amount.
pub struct PriceCalculator;

impl PriceCalculator {
    /// Sum of add-on amounts for one product unit.
    pub fn addons_per_unit(
        currency: Currency,
        addons: &[AddonSelection],
    ) -> Result<Money, CommerceError> {
        addons.iter().try_fold(Money::zero(currency), |acc, addon| {
            let amount = addon.per_unit_amount()?;
            if amount.currency != currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: currency.code().to_string(),
                    got: amount.currency.code().to_string(),
                });
            }
            acc.try_add(&amount).ok_or(CommerceError::Overflow)
        })
    }

    /// Price of one unit including add-ons.
    pub fn unit_price(
        base_unit_price: &Money,
        addons: &[AddonSelection],
    ) -> Result<Money, CommerceError> {
        if base_unit_price.is_negative() {
            return Err(CommerceError::NegativePrice("base unit price".to_string()));
        }
        let addons = Self::addons_per_unit(base_unit_price.currency, addons)?;
        base_unit_price.try_add(&addons).ok_or(CommerceError::Overflow)
    }

    /// Total for a line.
    ///
    /// ```
    /// use turbo_commerce::addon::AddonSelection;
    /// use turbo_commerce::cart::PriceCalculator;
    /// use turbo_commerce::money::{Currency, Money};
    ///
    /// let addons = vec![
    ///     AddonSelection::new("a", "A", Money::new(2000, Currency::USD)),
    ///     AddonSelection::new("b", "B", Money::new(1500, Currency::USD)),
    /// ];
    /// let total = PriceCalculator::line_total(&Money::new(10000, Currency::USD), 2, &addons).unwrap();
    /// assert_eq!(total.amount_cents, 27000);
    /// ```
    pub fn line_total(
        base_unit_price: &Money,
        quantity: i64,
        addons: &[AddonSelection],
    ) -> Result<Money, CommerceError> {
        Ok(Self::line_pricing(base_unit_price, quantity, addons)?.total)
    }

    /// Full breakdown for a line.
    pub fn line_pricing(
        base_unit_price: &Money,
        quantity: i64,
        addons: &[AddonSelection],
    ) -> Result<LineItemPricing, CommerceError> {
        if quantity < 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let addons_per_unit = Self::addons_per_unit(base_unit_price.currency, addons)?;
        let unit_price = Self::unit_price(base_unit_price, addons)?;
        let total = unit_price
            .try_multiply(quantity)
            .ok_or(CommerceError::Overflow)?;
        Ok(LineItemPricing {
            base_unit_price: *base_unit_price,
            addons_per_unit,
            unit_price,
            quantity,
            total,
        })
    }

    /// Validate a quantity for an add or update request.
    pub fn check_quantity(quantity: i64) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }
        Ok(())
    }
}

/// Pricing breakdown for a single line item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItemPricing {
    /// Product price per unit, before add-ons.
    pub base_unit_price: Money,
    /// Add-on amount per unit.
    pub addons_per_unit: Money,
    /// base_unit_price + addons_per_unit.
    pub unit_price: Money,
    /// Quantity.
    pub quantity: i64,
    /// unit_price * quantity.
    pub total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[test]
    fn test_line_total_without_addons() {
        assert_eq!(PriceCalculator::line_total(&usd(10000), 2, &[]).unwrap(), usd(20000));
    }

    #[test]
    fn test_line_total_with_addons() {
        let addons = vec![
            AddonSelection::new("a", "A", usd(2000)),
            AddonSelection::new("b", "B", usd(1500)),
        ];
        let pricing = PriceCalculator::line_pricing(&usd(10000), 2, &addons).unwrap();
        assert_eq!(pricing.addons_per_unit, usd(3500));
        assert_eq!(pricing.unit_price, usd(13500));
        assert_eq!(pricing.total, usd(27000));
    }

    #[test]
    fn test_addon_quantity_multiplies_per_unit() {
        let addons = vec![AddonSelection::new("letters", "Letters", usd(100)).with_quantity(5)];
        assert_eq!(PriceCalculator::line_total(&usd(1000), 3, &addons).unwrap(), usd(4500));
    }

    #[test]
    fn test_recomputation_is_stable() {
        let addons = vec![AddonSelection::new("a", "A", usd(333))];
        let first = PriceCalculator::line_total(&usd(999), 7, &addons).unwrap();
        for _ in 0..100 {
            assert_eq!(PriceCalculator::line_total(&usd(999), 7, &addons).unwrap(), first);
        }
    }

    #[test]
    fn test_rejects_negative_inputs() {
        assert!(PriceCalculator::line_total(&usd(-1), 1, &[]).is_err());
        assert_eq!(
            PriceCalculator::line_total(&usd(100), -1, &[]),
            Err(CommerceError::InvalidQuantity(-1))
        );
    }

    #[test]
    fn test_currency_mismatch() {
        let addons = vec![AddonSelection::new("a", "A", Money::new(100, Currency::EUR))];
        assert!(matches!(
            PriceCalculator::line_total(&usd(100), 1, &addons),
            Err(CommerceError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert_eq!(
            PriceCalculator::line_total(&usd(i64::MAX), 2, &[]),
            Err(CommerceError::Overflow)
        );
    }

    #[test]
    fn test_check_quantity() {
        assert!(PriceCalculator::check_quantity(1).is_ok());
        assert!(PriceCalculator::check_quantity(0).is_err());
        assert_eq!(
            PriceCalculator::check_quantity(MAX_QUANTITY_PER_ITEM + 1),
            Err(CommerceError::QuantityExceedsLimit(
                MAX_QUANTITY_PER_ITEM + 1,
                MAX_QUANTITY_PER_ITEM
            ))
        );
    }
}
