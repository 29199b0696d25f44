//! Money type for representing monetary values.
//!
//! Uses cents-based integer representation to avoid floating-point
//! precision issues that plague monetary calculations. Every total in the
//! cart is derived with checked integer arithmetic; decimals only appear
//! when formatting for display.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    CNY,
    INR,
    MXN,
}

impl Currency {
    /// Get the currency code (e.g., "USD").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::CHF => "CHF",
            Currency::CNY => "CNY",
            Currency::INR => "INR",
            Currency::MXN => "MXN",
        }
    }

    /// Get the currency symbol (e.g., "$").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
            Currency::JPY => "\u{00a5}",
            Currency::CAD => "CA$",
            Currency::AUD => "A$",
            Currency::CHF => "CHF",
            Currency::CNY => "\u{00a5}",
            Currency::INR => "\u{20b9}",
            Currency::MXN => "MX$",
        }
    }

    /// Get the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "JPY" => Some(Currency::JPY),
            "CAD" => Some(Currency::CAD),
            "AUD" => Some(Currency::AUD),
            "CHF" => Some(Currency::CHF),
            "CNY" => Some(Currency::CNY),
            "INR" => Some(Currency::INR),
            "MXN" => Some(Currency::MXN),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
///
/// Amounts are stored in the smallest unit of the currency (e.g., cents for USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in smallest currency unit (e.g., cents).
    pub amount_cents: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from cents.
    pub fn new(amount_cents: i64, currency: Currency) -> Self {
        Self {
            amount_cents,
            currency,
        }
    }

    /// Parse an amount already expressed in minor units, as the upstream
    /// cart service reports prices (`"10000"` is $100.00).
    ///
    /// ```
    /// use turbo_commerce::money::{Money, Currency};
    /// let price = Money::parse_minor("10000", Currency::USD).unwrap();
    /// assert_eq!(price.amount_cents, 10000);
    /// assert!(Money::parse_minor("12.50", Currency::USD).is_none());
    /// ```
    pub fn parse_minor(raw: &str, currency: Currency) -> Option<Self> {
        raw.trim()
            .parse::<i64>()
            .ok()
            .map(|amount| Self::new(amount, currency))
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_cents == 0
    }

    /// Check if this is positive.
    pub fn is_positive(&self) -> bool {
        self.amount_cents > 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.amount_cents < 0
    }

    /// Format as a display string (e.g., "$49.99").
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.display_amount())
    }

    /// Format as a display string without symbol (e.g., "49.99").
    pub fn display_amount(&self) -> String {
        let places = self.currency.decimal_places();
        let sign = if self.amount_cents < 0 { "-" } else { "" };
        let abs = self.amount_cents.unsigned_abs();
        if places == 0 {
            return format!("{}{}", sign, abs);
        }
        let divisor = 10_u64.pow(places);
        format!(
            "{}{}.{:0width$}",
            sign,
            abs / divisor,
            abs % divisor,
            width = places as usize
        )
    }

    /// Try to add another Money value.
    ///
    /// Returns None if currencies don't match or the sum overflows.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_cents
            .checked_add(other.amount_cents)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Try to subtract another Money value.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_cents
            .checked_sub(other.amount_cents)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Multiply by a scalar, returning None on overflow.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        self.amount_cents
            .checked_mul(factor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Take a share of this amount expressed in basis points (1/100 of a
    /// percent), rounding half away from zero.
    ///
    /// ```
    /// use turbo_commerce::money::{Money, Currency};
    /// let base = Money::new(1999, Currency::USD);
    /// // 10% of $19.99 is $1.999, which rounds to $2.00
    /// assert_eq!(base.try_basis_points(1000).unwrap().amount_cents, 200);
    /// ```
    pub fn try_basis_points(&self, basis_points: i64) -> Option<Money> {
        let scaled = (self.amount_cents as i128).checked_mul(basis_points as i128)?;
        let half = if scaled < 0 { -5_000 } else { 5_000 };
        let rounded = (scaled + half) / 10_000;
        i64::try_from(rounded)
            .ok()
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Sum an iterator of Money values, returning None on currency mismatch
    /// or overflow.
    pub fn try_sum<'a>(
        mut iter: impl Iterator<Item = &'a Money>,
        currency: Currency,
    ) -> Option<Money> {
        iter.try_fold(Money::zero(currency), |acc, m| acc.try_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let m = Money::new(4999, Currency::USD);
        assert_eq!(m.amount_cents, 4999);
        assert_eq!(m.currency, Currency::USD);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(4999, Currency::USD).display(), "$49.99");
        assert_eq!(Money::new(5, Currency::USD).display(), "$0.05");
        assert_eq!(Money::new(-1250, Currency::USD).display(), "$-12.50");
        assert_eq!(Money::new(100, Currency::JPY).display(), "\u{00a5}100");
    }

    #[test]
    fn test_parse_minor() {
        assert_eq!(
            Money::parse_minor(" 27000 ", Currency::USD),
            Some(Money::new(27000, Currency::USD))
        );
        assert_eq!(Money::parse_minor("", Currency::USD), None);
        assert_eq!(Money::parse_minor("abc", Currency::USD), None);
    }

    #[test]
    fn test_money_addition() {
        let a = Money::new(1000, Currency::USD);
        let b = Money::new(500, Currency::USD);
        assert_eq!(a.try_add(&b).unwrap().amount_cents, 1500);
    }

    #[test]
    fn test_money_subtraction() {
        let a = Money::new(1000, Currency::USD);
        let b = Money::new(300, Currency::USD);
        assert_eq!(a.try_subtract(&b).unwrap().amount_cents, 700);
    }

    #[test]
    fn test_money_multiply_overflow() {
        let m = Money::new(i64::MAX / 2 + 1, Currency::USD);
        assert!(m.try_multiply(2).is_none());
        assert_eq!(
            Money::new(1000, Currency::USD).try_multiply(3).unwrap().amount_cents,
            3000
        );
    }

    #[test]
    fn test_basis_points_rounding() {
        let m = Money::new(10000, Currency::USD);
        assert_eq!(m.try_basis_points(1000).unwrap().amount_cents, 1000);
        assert_eq!(
            Money::new(5, Currency::USD).try_basis_points(5000).unwrap().amount_cents,
            3
        );
    }

    #[test]
    fn test_money_currency_mismatch() {
        let usd = Money::new(1000, Currency::USD);
        let eur = Money::new(1000, Currency::EUR);
        assert!(usd.try_add(&eur).is_none());
        assert!(Money::try_sum([usd, eur].iter(), Currency::USD).is_none());
    }

    #[test]
    fn test_try_sum() {
        let values = [
            Money::new(100, Currency::USD),
            Money::new(250, Currency::USD),
        ];
        assert_eq!(
            Money::try_sum(values.iter(), Currency::USD).unwrap().amount_cents,
            350
        );
        assert!(Money::try_sum(std::iter::empty(), Currency::USD)
            .unwrap()
            .is_zero());
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_code("eur"), Some(Currency::EUR));
        assert_eq!(Currency::from_code("INVALID"), None);
    }
}
