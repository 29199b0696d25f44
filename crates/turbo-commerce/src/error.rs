//! Commerce error types.

use thiserror::Error;

/// Errors that can occur while pricing a cart or resolving add-ons.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommerceError {
    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Negative price where only non-negative amounts make sense.
    #[error("Negative price for {0}")]
    NegativePrice(String),

    /// The product has no add-on field with this id.
    #[error("Unknown add-on field: {0}")]
    UnknownAddon(String),

    /// A required add-on field was not filled in.
    #[error("Required add-on missing: {0}")]
    RequiredAddonMissing(String),

    /// The submitted value does not fit the add-on field.
    #[error("Invalid value for add-on {field}: {reason}")]
    InvalidAddonValue { field: String, reason: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CommerceError {
    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CommerceError::InvalidAddonValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::SerializationError(e.to_string())
    }
}
