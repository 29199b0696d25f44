//! Price-complete carts on top of a session cart service that omits
//! add-on prices.
//!
//! - [`AddonLedger`]: line key to priced add-ons, persisted across restarts
//! - [`UpstreamCartClient`]: the session cart service ([`HttpCartClient`])
//! - [`AddonCatalog`]: product add-on definitions used to price selections
//! - [`CartSyncEngine`]: single-flight refresh and reconciliation
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_cart::prelude::*;
//!
//! let engine = CartSyncEngine::from_config(&CartConfig::load("cart.toml")?)?;
//! engine.ensure_initialized();
//!
//! let view = engine.view().await?;
//! for line in &view.items {
//!     println!("{} x{} = {}", line.name, line.quantity, line.line_total);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod upstream;

pub use catalog::{AddonCatalog, CachedAddonCatalog, HttpAddonCatalog, StaticAddonCatalog};
pub use config::{CartConfig, ConfigError, StorageBackend, StorageConfig, UpstreamConfig};
pub use engine::{CartSyncEngine, CartSyncEngineBuilder, SyncState};
pub use error::CartError;
pub use ledger::{AddonLedger, LedgerEntries, LEDGER_SCHEMA_VERSION};
pub use upstream::{AddItemRequest, HttpCartClient, ServerCartSnapshot, UpstreamCartClient};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        AddonCatalog, AddonLedger, CartConfig, CartError, CartSyncEngine, HttpCartClient,
        StaticAddonCatalog, SyncState, UpstreamCartClient,
    };
    pub use turbo_commerce::prelude::*;
}
