//! HTTP implementation of [`UpstreamCartClient`].

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use turbo_commerce::{CouponCode, LineItemKey};
use turbo_data::{FetchClient, FetchError};

use super::{AddItemRequest, ServerCartSnapshot, UpstreamCartClient};
use crate::CartError;

/// Talks to the cart service's REST endpoints through a [`FetchClient`].
///
/// Session continuity comes from the client's transport (the default one
/// keeps a cookie jar).
#[derive(Clone)]
pub struct HttpCartClient {
    fetch: FetchClient,
}

impl HttpCartClient {
    /// `fetch` should already carry the cart API base URL.
    pub fn new(fetch: FetchClient) -> Self {
        Self { fetch }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<ServerCartSnapshot, CartError> {
        let result: Result<ServerCartSnapshot, FetchError> = async {
            self.fetch
                .post(path)
                .json(body)?
                .send()
                .await?
                .error_for_status()?
                .json::<ServerCartSnapshot>()
        }
        .await;
        Self::finish("POST", path, result)
    }

    fn finish(
        method: &str,
        path: &str,
        result: Result<ServerCartSnapshot, FetchError>,
    ) -> Result<ServerCartSnapshot, CartError> {
        result.map_err(|e| {
            let err = CartError::from_upstream(e);
            tracing::warn!(method, path, error = %err, "cart service call failed");
            err
        })
    }
}

#[async_trait]
impl UpstreamCartClient for HttpCartClient {
    async fn get_cart(&self) -> Result<ServerCartSnapshot, CartError> {
        let result: Result<ServerCartSnapshot, FetchError> = async {
            self.fetch
                .get("/cart")
                .send()
                .await?
                .error_for_status()?
                .json::<ServerCartSnapshot>()
        }
        .await;
        Self::finish("GET", "/cart", result)
    }

    async fn add_item(&self, request: &AddItemRequest) -> Result<ServerCartSnapshot, CartError> {
        self.post("/cart/add-item", &request.to_body()).await
    }

    async fn update_item(
        &self,
        key: &LineItemKey,
        quantity: i64,
    ) -> Result<ServerCartSnapshot, CartError> {
        self.post("/cart/update-item", &json!({ "key": key, "quantity": quantity }))
            .await
    }

    async fn remove_item(&self, key: &LineItemKey) -> Result<ServerCartSnapshot, CartError> {
        self.post("/cart/remove-item", &json!({ "key": key })).await
    }

    async fn apply_coupon(&self, code: &CouponCode) -> Result<ServerCartSnapshot, CartError> {
        self.post("/cart/apply-coupon", &json!({ "code": code })).await
    }

    async fn remove_coupon(&self, code: &CouponCode) -> Result<ServerCartSnapshot, CartError> {
        self.post("/cart/remove-coupon", &json!({ "code": code })).await
    }

    async fn select_shipping_rate(
        &self,
        package_id: u32,
        rate_id: &str,
    ) -> Result<ServerCartSnapshot, CartError> {
        self.post(
            "/cart/select-shipping-rate",
            &json!({ "package_id": package_id, "rate_id": rate_id }),
        )
        .await
    }
}
