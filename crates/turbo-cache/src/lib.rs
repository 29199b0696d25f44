//! Caching and durable persistence for TurboCommerce.
//!
//! Two layers live here:
//!
//! - [`CacheStore`]: an in-memory map with per-entry TTL, used for cart and
//!   catalog snapshots. Stale reads are allowed; only explicit pruning or
//!   invalidation removes entries.
//! - [`PersistenceAdapter`]: a versioned snapshot stored under one namespaced
//!   key in a [`DurableStorage`] backend, hydrated once per process and
//!   written through on every change.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use turbo_cache::{cache_key, MemoryStorage, PersistenceAdapter};
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let adapter: PersistenceAdapter<BTreeMap<String, u32>> =
//!     PersistenceAdapter::new(storage, cache_key!("turbo-cart", "example"), 1);
//!
//! let mut state = BTreeMap::new();
//! state.insert("line".to_string(), 2);
//! adapter.persist(&state);
//! ```

mod error;
mod persist;
mod storage;
mod store;

pub use error::CacheError;
pub use persist::{Migration, PersistedSnapshot, PersistenceAdapter};
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
pub use store::{CacheEntry, CacheStore, Clock, ManualClock, SystemClock, TtlClass, TtlConfig};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CacheError, CacheStore, DurableStorage, FileStorage, MemoryStorage, PersistenceAdapter,
        TtlClass, TtlConfig,
    };
}
