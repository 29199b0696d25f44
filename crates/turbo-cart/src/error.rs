//! Cart synchronization error types.

use serde::Deserialize;
use thiserror::Error;
use turbo_commerce::{CommerceError, ProductId};
use turbo_data::FetchError;

/// Errors surfaced by the cart engine and its upstream collaborators.
///
/// `Clone` so a single in-flight refresh result can be handed to every
/// caller that joined it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Network failure, timeout, 5xx or an unreadable response body.
    #[error("Upstream cart service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream refused the request (4xx).
    #[error("Upstream rejected request ({status} {code}): {message}")]
    UpstreamRejected {
        status: u16,
        code: String,
        message: String,
    },

    /// The add-on catalog could not be reached.
    #[error("Add-on catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The catalog has no entry for the product.
    #[error("Product not found in catalog: {0}")]
    ProductNotFound(ProductId),

    /// An identical add-to-cart is still outstanding.
    #[error("An identical add to cart for product {0} is already in progress")]
    DuplicateAdd(ProductId),

    /// Validation or arithmetic failure in the pricing domain.
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    /// The engine was disposed.
    #[error("Cart engine has been disposed")]
    Disposed,
}

impl CartError {
    /// Whether a higher layer may offer a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CartError::UpstreamUnavailable(_) | CartError::CatalogUnavailable(_)
        )
    }

    /// Map a fetch failure from the cart service.
    pub(crate) fn from_upstream(err: FetchError) -> Self {
        match err {
            FetchError::HttpError { status, message } if (400..500).contains(&status) => {
                let body: UpstreamErrorBody = serde_json::from_str(&message).unwrap_or_default();
                CartError::UpstreamRejected {
                    status,
                    code: body.code.unwrap_or_else(|| "http_error".to_string()),
                    message: body.message.unwrap_or(message),
                }
            }
            other => CartError::UpstreamUnavailable(other.to_string()),
        }
    }

    /// Map a fetch failure from the catalog.
    pub(crate) fn from_catalog(err: FetchError, product_id: ProductId) -> Self {
        match err {
            FetchError::HttpError { status: 404, .. } => CartError::ProductNotFound(product_id),
            other => CartError::CatalogUnavailable(other.to_string()),
        }
    }
}

/// Error payload the cart service sends with 4xx responses.
#[derive(Debug, Default, Deserialize)]
struct UpstreamErrorBody {
    code: Option<String>,
    message: Option<String>,
}
