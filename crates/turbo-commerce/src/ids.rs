//! Newtype IDs for type-safe identifiers.
//!
//! Using newtypes prevents accidentally mixing up different ID types,
//! e.g., passing an add-on field id where a line item key is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate string-backed newtype ID structs.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Server-assigned, opaque cart line key.
    ///
    /// Stable across quantity and coupon updates, but not across the cart
    /// being emptied and recreated.
    LineItemKey
);
define_id!(
    /// Identifier of an add-on field in a product's configuration form.
    AddonFieldId
);
define_id!(
    /// A coupon code as entered by the shopper.
    CouponCode
);
define_id!(
    /// Client-generated key for an add-to-cart that the upstream has not
    /// confirmed yet.
    ProvisionalKey
);

impl ProvisionalKey {
    /// Generate a new unique provisional key.
    pub fn generate() -> Self {
        Self(format!("provisional-{}", generate_id()))
    }
}

/// Upstream catalog product identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl ProductId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Generate a unique ID using timestamp and a process-wide counter.
fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{:x}-{:x}", timestamp, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let key = LineItemKey::new("a1b2c3");
        assert_eq!(key.as_str(), "a1b2c3");
    }

    #[test]
    fn test_provisional_generation() {
        let k1 = ProvisionalKey::generate();
        let k2 = ProvisionalKey::generate();
        assert_ne!(k1, k2);
        assert!(k1.as_str().starts_with("provisional-"));
    }

    #[test]
    fn test_id_serializes_transparently() {
        let key = LineItemKey::new("e4da3b7f");
        assert_eq!(serde_json::to_string(&key).unwrap(), r#""e4da3b7f""#);

        let product: ProductId = serde_json::from_str("42").unwrap();
        assert_eq!(product, ProductId(42));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(format!("{}", AddonFieldId::new("engraving")), "engraving");
        assert_eq!(format!("{}", ProductId(7)), "7");
    }
}
