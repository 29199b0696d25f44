//! Product add-on catalog lookups.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use turbo_cache::{CacheStore, Clock, TtlClass, TtlConfig};
use turbo_commerce::{ProductAddons, ProductId};
use turbo_data::{FetchClient, FetchError};

use crate::CartError;

/// Read-only source of add-on definitions.
#[async_trait]
pub trait AddonCatalog: Send + Sync {
    async fn product_addons(&self, product_id: ProductId) -> Result<ProductAddons, CartError>;
}

/// A fixed, in-memory catalog.
#[derive(Debug, Default)]
pub struct StaticAddonCatalog {
    products: RwLock<HashMap<ProductId, ProductAddons>>,
}

impl StaticAddonCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product.
    pub fn insert(&self, product: ProductAddons) {
        self.products.write().insert(product.product_id, product);
    }

    pub fn with_product(self, product: ProductAddons) -> Self {
        self.insert(product);
        self
    }
}

#[async_trait]
impl AddonCatalog for StaticAddonCatalog {
    async fn product_addons(&self, product_id: ProductId) -> Result<ProductAddons, CartError> {
        self.products
            .read()
            .get(&product_id)
            .cloned()
            .ok_or(CartError::ProductNotFound(product_id))
    }
}

/// Fetches `GET {base}/products/{id}/addons`.
#[derive(Clone)]
pub struct HttpAddonCatalog {
    fetch: FetchClient,
}

impl HttpAddonCatalog {
    pub fn new(fetch: FetchClient) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl AddonCatalog for HttpAddonCatalog {
    async fn product_addons(&self, product_id: ProductId) -> Result<ProductAddons, CartError> {
        let path = format!("/products/{}/addons", product_id);
        let result: Result<ProductAddons, FetchError> = async {
            self.fetch
                .get(path.as_str())
                .send()
                .await?
                .error_for_status()?
                .json::<ProductAddons>()
        }
        .await;

        result.map_err(|e| {
            let err = CartError::from_catalog(e, product_id);
            tracing::warn!(product = %product_id, error = %err, "add-on catalog lookup failed");
            err
        })
    }
}

/// Long-TTL cache in front of another catalog.
///
/// When a refresh fails and a stale definition is cached, the stale one is
/// served; catalog data changes rarely and add-to-cart should not fail for it.
pub struct CachedAddonCatalog<C> {
    inner: C,
    cache: CacheStore<ProductId, ProductAddons>,
}

impl<C: AddonCatalog> CachedAddonCatalog<C> {
    pub fn new(inner: C, ttls: TtlConfig) -> Self {
        Self {
            inner,
            cache: CacheStore::with_config(ttls),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(clock);
        self
    }

    /// Drop a cached product so the next lookup goes to the source.
    pub fn invalidate(&self, product_id: ProductId) {
        self.cache.invalidate(&product_id);
    }
}

#[async_trait]
impl<C: AddonCatalog> AddonCatalog for CachedAddonCatalog<C> {
    async fn product_addons(&self, product_id: ProductId) -> Result<ProductAddons, CartError> {
        if let Some(product) = self.cache.get_fresh(&product_id) {
            return Ok(product);
        }

        match self.inner.product_addons(product_id).await {
            Ok(product) => {
                self.cache.set_class(product_id, product.clone(), TtlClass::Long);
                Ok(product)
            }
            Err(err @ CartError::CatalogUnavailable(_)) => match self.cache.get(&product_id) {
                Some(stale) => {
                    tracing::warn!(product = %product_id, error = %err, "serving stale add-on definitions");
                    Ok(stale)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }
}
