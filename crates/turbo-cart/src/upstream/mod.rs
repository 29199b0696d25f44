//! The session cart service.
//!
//! Every call returns the full cart as the upstream sees it afterwards.
//! Nothing here retries: a repeated add-item can create a second line
//! instead of bumping the quantity, so retry policy belongs to the caller.

mod http;
mod snapshot;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use turbo_commerce::{config_to_wire, AddonConfig, CouponCode, LineItemKey, ProductId};

use crate::CartError;

pub use http::HttpCartClient;
pub use snapshot::{
    ServerAddon, ServerCartSnapshot, ServerCoupon, ServerCouponTotals, ServerItemData,
    ServerItemPrices, ServerLineItem, ServerTotals,
};
pub(crate) use snapshot::lenient_amount;

/// Client for the upstream session cart.
#[async_trait]
pub trait UpstreamCartClient: Send + Sync {
    async fn get_cart(&self) -> Result<ServerCartSnapshot, CartError>;

    /// Not safe to retry.
    async fn add_item(&self, request: &AddItemRequest) -> Result<ServerCartSnapshot, CartError>;

    async fn update_item(
        &self,
        key: &LineItemKey,
        quantity: i64,
    ) -> Result<ServerCartSnapshot, CartError>;

    async fn remove_item(&self, key: &LineItemKey) -> Result<ServerCartSnapshot, CartError>;

    async fn apply_coupon(&self, code: &CouponCode) -> Result<ServerCartSnapshot, CartError>;

    async fn remove_coupon(&self, code: &CouponCode) -> Result<ServerCartSnapshot, CartError>;

    async fn select_shipping_rate(
        &self,
        package_id: u32,
        rate_id: &str,
    ) -> Result<ServerCartSnapshot, CartError>;
}

/// An add-to-cart as sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub addon_config: AddonConfig,
}

impl AddItemRequest {
    pub fn new(product_id: ProductId, quantity: i64, addon_config: AddonConfig) -> Self {
        Self {
            product_id,
            quantity,
            addon_config,
        }
    }

    /// The request body: `{productId, quantity, addonConfig}` with each
    /// add-on value in its per-kind wire shape.
    pub fn to_body(&self) -> AddItemBody {
        AddItemBody {
            product_id: self.product_id,
            quantity: self.quantity,
            addon_config: config_to_wire(&self.addon_config),
        }
    }
}

/// Wire shape of [`AddItemRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody {
    pub product_id: ProductId,
    pub quantity: i64,
    pub addon_config: Map<String, Value>,
}
