//! Reconciles upstream cart snapshots with the add-on ledger.
//!
//! Every refresh fetches the cart, prunes ledger entries for lines that no
//! longer exist, fills in add-on prices the upstream left out, and
//! recomputes every line total. Concurrent refreshes share one upstream
//! call. Mutations are always followed by a refresh that started after the
//! mutation finished, so a slow snapshot fetched earlier can never be the
//! one a mutation reports.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use turbo_cache::{CacheStore, Clock, TtlClass, TtlConfig};
use turbo_commerce::{
    config_fingerprint, resolve_selections, AddonConfig, AddonSelection, AddonSource, AppliedCoupon,
    CartLineItem, CartView, CouponCode, Currency, LineItemKey, PriceCalculator, ProductId,
    ProvisionalKey,
};

use crate::catalog::{AddonCatalog, CachedAddonCatalog, HttpAddonCatalog};
use crate::config::{CartConfig, ConfigError};
use crate::ledger::AddonLedger;
use crate::upstream::{
    lenient_amount, AddItemRequest, HttpCartClient, ServerCartSnapshot, ServerLineItem,
    UpstreamCartClient,
};
use crate::CartError;

const CART_SLOT: &str = "cart";

/// Where the engine is in its refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No refresh running and no view yet (or the last refresh failed).
    Idle,
    /// A refresh is in flight.
    Refreshing,
    /// The last refresh produced the current view.
    Reconciled,
}

type SharedRefresh = Shared<BoxFuture<'static, Result<CartView, CartError>>>;

struct InFlight {
    id: u64,
    /// Mutation generation when this refresh started.
    generation: u64,
    future: SharedRefresh,
}

struct EngineInner {
    client: Arc<dyn UpstreamCartClient>,
    catalog: Arc<dyn AddonCatalog>,
    ledger: Arc<AddonLedger>,
    snapshots: CacheStore<&'static str, ServerCartSnapshot>,
    view: RwLock<Option<CartView>>,
    state: Mutex<SyncState>,
    inflight: Mutex<Option<InFlight>>,
    next_flight: AtomicU64,
    mutations: AtomicU64,
    cycles: AtomicU64,
    pending_adds: Mutex<HashSet<(ProductId, String)>>,
    currency: Currency,
    disposed: AtomicBool,
}

/// Builder for [`CartSyncEngine`].
pub struct CartSyncEngineBuilder {
    client: Arc<dyn UpstreamCartClient>,
    catalog: Arc<dyn AddonCatalog>,
    ledger: Arc<AddonLedger>,
    ttls: TtlConfig,
    clock: Option<Arc<dyn Clock>>,
    currency: Currency,
}

impl CartSyncEngineBuilder {
    pub fn ttls(mut self, ttls: TtlConfig) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Currency to fall back to when a snapshot names one we do not know.
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn build(self) -> CartSyncEngine {
        let mut snapshots = CacheStore::with_config(self.ttls);
        if let Some(clock) = self.clock {
            snapshots = snapshots.with_clock(clock);
        }
        CartSyncEngine {
            inner: Arc::new(EngineInner {
                client: self.client,
                catalog: self.catalog,
                ledger: self.ledger,
                snapshots,
                view: RwLock::new(None),
                state: Mutex::new(SyncState::Idle),
                inflight: Mutex::new(None),
                next_flight: AtomicU64::new(1),
                mutations: AtomicU64::new(0),
                cycles: AtomicU64::new(0),
                pending_adds: Mutex::new(HashSet::new()),
                currency: self.currency,
                disposed: AtomicBool::new(false),
            }),
        }
    }
}

/// Produces price-complete cart views on top of an upstream that omits
/// add-on prices.
///
/// Cheap to clone; clones share state.
///
/// # Example
///
/// ```rust,ignore
/// let engine = CartSyncEngine::from_config(&CartConfig::load("cart.toml")?)?;
/// let view = engine.add_item(ProductId(12), 2, config).await?;
/// println!("{}", view.grand_total);
/// ```
#[derive(Clone)]
pub struct CartSyncEngine {
    inner: Arc<EngineInner>,
}

impl CartSyncEngine {
    pub fn builder(
        client: Arc<dyn UpstreamCartClient>,
        catalog: Arc<dyn AddonCatalog>,
        ledger: Arc<AddonLedger>,
    ) -> CartSyncEngineBuilder {
        CartSyncEngineBuilder {
            client,
            catalog,
            ledger,
            ttls: TtlConfig::default(),
            clock: None,
            currency: Currency::default(),
        }
    }

    /// Wire an engine to the HTTP cart service, a cached HTTP catalog and
    /// the configured ledger storage.
    pub fn from_config(config: &CartConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let storage = config.open_storage()?;
        let ledger = AddonLedger::with_storage(storage, config.storage.key.clone());
        let client = HttpCartClient::new(config.cart_client()?);
        let catalog = CachedAddonCatalog::new(
            HttpAddonCatalog::new(config.catalog_client()?),
            config.cache,
        );

        Ok(Self::builder(Arc::new(client), Arc::new(catalog), Arc::new(ledger))
            .ttls(config.cache)
            .currency(config.currency)
            .build())
    }

    /// Hydrate the ledger if that has not happened yet. Called on first use
    /// by every operation; calling it early just moves the storage read.
    pub fn ensure_initialized(&self) {
        self.inner.ledger.hydrate();
    }

    pub fn ledger(&self) -> &Arc<AddonLedger> {
        &self.inner.ledger
    }

    /// The catalog used to price selections.
    pub fn catalog(&self) -> &Arc<dyn AddonCatalog> {
        &self.inner.catalog
    }

    pub fn state(&self) -> SyncState {
        *self.inner.state.lock()
    }

    /// The last reconciled view, without touching the network.
    pub fn current(&self) -> Option<CartView> {
        self.inner.view.read().clone()
    }

    /// Number of refreshes that completed successfully.
    pub fn completed_cycles(&self) -> u64 {
        self.inner.cycles.load(Ordering::SeqCst)
    }

    /// The current view while the cart snapshot is fresh, a new one
    /// otherwise.
    pub async fn view(&self) -> Result<CartView, CartError> {
        self.inner.check_live()?;
        if self.inner.snapshots.is_fresh(&CART_SLOT) {
            let current = self.current();
            if let Some(view) = current {
                return Ok(view);
            }
        }
        self.refresh().await
    }

    /// Fetch and reconcile the cart, joining a refresh already in flight.
    pub async fn refresh(&self) -> Result<CartView, CartError> {
        self.refresh_since(0).await
    }

    /// Add a product with add-ons.
    ///
    /// The add-ons are priced from the catalog before anything is sent
    /// upstream, so the ledger holds the prices the shopper saw.
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: i64,
        config: AddonConfig,
    ) -> Result<CartView, CartError> {
        self.inner.check_live()?;
        self.ensure_initialized();
        PriceCalculator::check_quantity(quantity)?;
        let _guard = AddGuard::acquire(&self.inner, product_id, config_fingerprint(&config))?;

        let product = self.inner.catalog.product_addons(product_id).await?;
        let selections = resolve_selections(&product, &config)?;
        let request = AddItemRequest::new(product_id, quantity, config);

        if selections.is_empty() {
            self.inner.client.add_item(&request).await?;
            return self.after_mutation().await;
        }

        let prior_keys = self.live_line_keys().await?;
        let staged = StagedAdd::new(&self.inner.ledger, product_id, selections);
        let snapshot = match self.inner.client.add_item(&request).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.inner.ledger.discard(&staged.key);
                return Err(err);
            }
        };

        self.claim(&staged.key, &snapshot, &prior_keys, product_id);
        drop(staged);
        self.after_mutation().await
    }

    /// Change a line's quantity. Zero removes the line. Add-ons are kept.
    pub async fn update_item(&self, key: &LineItemKey, quantity: i64) -> Result<CartView, CartError> {
        if quantity == 0 {
            return self.remove_item(key).await;
        }
        self.inner.check_live()?;
        self.ensure_initialized();
        PriceCalculator::check_quantity(quantity)?;
        self.inner.client.update_item(key, quantity).await?;
        self.after_mutation().await
    }

    pub async fn remove_item(&self, key: &LineItemKey) -> Result<CartView, CartError> {
        self.inner.check_live()?;
        self.ensure_initialized();
        self.inner.client.remove_item(key).await?;
        self.inner.ledger.remove_item(key);
        self.after_mutation().await
    }

    pub async fn apply_coupon(&self, code: &CouponCode) -> Result<CartView, CartError> {
        self.inner.check_live()?;
        self.ensure_initialized();
        self.inner.client.apply_coupon(code).await?;
        self.after_mutation().await
    }

    pub async fn remove_coupon(&self, code: &CouponCode) -> Result<CartView, CartError> {
        self.inner.check_live()?;
        self.ensure_initialized();
        self.inner.client.remove_coupon(code).await?;
        self.after_mutation().await
    }

    pub async fn select_shipping_rate(
        &self,
        package_id: u32,
        rate_id: &str,
    ) -> Result<CartView, CartError> {
        self.inner.check_live()?;
        self.ensure_initialized();
        self.inner.client.select_shipping_rate(package_id, rate_id).await?;
        self.after_mutation().await
    }

    /// Abandon any refresh in flight, drop cached state and release the
    /// ledger. Every later call fails with [`CartError::Disposed`].
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.inflight.lock().take();
        self.inner.view.write().take();
        self.inner.snapshots.invalidate_all();
        self.inner.ledger.dispose();
        self.inner.set_state(SyncState::Idle);
        tracing::info!("cart engine disposed");
    }

    /// Wait for a refresh that started at or after mutation generation
    /// `generation`. Older in-flight refreshes are awaited first, never
    /// overlapped.
    async fn refresh_since(&self, generation: u64) -> Result<CartView, CartError> {
        self.inner.check_live()?;
        self.ensure_initialized();

        loop {
            let (id, future, current) = {
                let mut slot = self.inner.inflight.lock();
                match slot.as_ref() {
                    Some(flight) => {
                        let current = flight.generation >= generation;
                        if current {
                            tracing::debug!(flight = flight.id, "joining in-flight cart refresh");
                        }
                        (flight.id, flight.future.clone(), current)
                    }
                    None => {
                        let flight = self.inner.start_flight();
                        let started = (flight.id, flight.future.clone(), true);
                        *slot = Some(flight);
                        started
                    }
                }
            };

            let result = future.await;
            self.inner.finish_flight(id);
            if current {
                return result;
            }
            self.inner.check_live()?;
        }
    }

    async fn after_mutation(&self) -> Result<CartView, CartError> {
        self.inner.snapshots.invalidate(&CART_SLOT);
        let generation = self.inner.mutations.fetch_add(1, Ordering::SeqCst) + 1;
        self.refresh_since(generation).await
    }

    /// Line keys right before an add, read from the upstream rather than the
    /// cached snapshot, which may predate lines added elsewhere.
    async fn live_line_keys(&self) -> Result<HashSet<LineItemKey>, CartError> {
        Ok(self.inner.client.get_cart().await?.line_keys())
    }

    fn claim(
        &self,
        provisional: &ProvisionalKey,
        snapshot: &ServerCartSnapshot,
        prior_keys: &HashSet<LineItemKey>,
        product_id: ProductId,
    ) {
        let ledger = &self.inner.ledger;
        match locate_new_key(snapshot, prior_keys, product_id) {
            KeyMatch::Found(key) => {
                ledger.commit(provisional, key);
            }
            KeyMatch::Merged => {
                tracing::debug!(product = %product_id, "add merged into an existing line");
                ledger.discard(provisional);
            }
            KeyMatch::Ambiguous(candidates) => {
                tracing::warn!(
                    product = %product_id,
                    candidates = candidates.len(),
                    "cannot tell which line the add created; its add-ons are unaccounted for"
                );
                ledger.discard(provisional);
            }
        }
    }
}

impl EngineInner {
    fn check_live(&self) -> Result<(), CartError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(CartError::Disposed);
        }
        Ok(())
    }

    fn set_state(&self, state: SyncState) {
        *self.state.lock() = state;
    }

    fn start_flight(self: &Arc<Self>) -> InFlight {
        let id = self.next_flight.fetch_add(1, Ordering::SeqCst);
        let generation = self.mutations.load(Ordering::SeqCst);
        let inner = Arc::clone(self);
        tracing::debug!(flight = id, generation, "starting cart refresh");
        InFlight {
            id,
            generation,
            future: async move { inner.run_refresh().await }.boxed().shared(),
        }
    }

    fn finish_flight(&self, id: u64) {
        let mut slot = self.inflight.lock();
        if slot.as_ref().is_some_and(|f| f.id == id) {
            *slot = None;
        }
    }

    async fn run_refresh(self: Arc<Self>) -> Result<CartView, CartError> {
        self.check_live()?;
        self.set_state(SyncState::Refreshing);
        let epoch = self.ledger.epoch();

        let snapshot = match self.client.get_cart().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.set_state(SyncState::Idle);
                tracing::warn!(error = %err, "cart refresh failed");
                return Err(err);
            }
        };
        self.check_live()?;

        let view = match self.reconcile(&snapshot, epoch) {
            Ok(view) => view,
            Err(err) => {
                self.set_state(SyncState::Idle);
                tracing::warn!(error = %err, "cart reconciliation failed");
                return Err(err);
            }
        };

        self.snapshots.set_class(CART_SLOT, snapshot, TtlClass::Short);
        *self.view.write() = Some(view.clone());
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_state(SyncState::Reconciled);
        tracing::debug!(
            cycle,
            items = view.items.len(),
            gaps = view.gaps.len(),
            grand_total = %view.grand_total,
            "cart reconciled"
        );
        Ok(view)
    }

    /// Pick the add-ons a line is priced with. Server prices win and are
    /// recorded; the ledger fills in when they are absent. Add-ons that do
    /// not price in `currency` are never recorded and never used.
    fn line_addons(
        &self,
        item: &ServerLineItem,
        currency: Currency,
    ) -> (Vec<AddonSelection>, AddonSource) {
        if let Some(addons) = item.priced_addons(currency) {
            match PriceCalculator::addons_per_unit(currency, &addons) {
                Ok(_) => {
                    if self.ledger.get_item_addons(&item.key) != addons {
                        self.ledger.set_item_addons(item.key.clone(), addons.clone());
                    }
                    return (addons, AddonSource::Server);
                }
                Err(err) => tracing::warn!(
                    key = %item.key,
                    error = %err,
                    "ignoring unpriceable add-ons from the cart service"
                ),
            }
        }

        let known = self.ledger.get_item_addons(&item.key);
        if !known.is_empty() {
            match PriceCalculator::addons_per_unit(currency, &known) {
                Ok(_) => return (known, AddonSource::Ledger),
                Err(err) => {
                    tracing::warn!(key = %item.key, error = %err, "dropping unpriceable ledger entry");
                    self.ledger.remove_item(&item.key);
                }
            }
        }

        if item.has_raw_selections() {
            tracing::warn!(
                key = %item.key,
                product = %item.id,
                "line has add-ons with no known prices; pricing without them"
            );
            (Vec::new(), AddonSource::Missing)
        } else {
            (Vec::new(), AddonSource::None)
        }
    }

    fn reconcile(&self, snapshot: &ServerCartSnapshot, epoch: u64) -> Result<CartView, CartError> {
        let currency = snapshot.currency().unwrap_or_else(|| {
            tracing::warn!(
                code = %snapshot.totals.currency_code,
                fallback = %self.currency,
                "unsupported cart currency"
            );
            self.currency
        });

        self.ledger
            .sync_with_server_keys_as_of(&snapshot.line_keys(), epoch);

        let mut items = Vec::with_capacity(snapshot.items.len());
        for item in &snapshot.items {
            let base = item.base_unit_price(currency).ok_or_else(|| {
                CartError::UpstreamUnavailable(format!(
                    "malformed price {:?} on line {}",
                    item.prices.price, item.key
                ))
            })?;

            let (addons, source) = self.line_addons(item, currency);
            items.push(CartLineItem::priced(
                item.key.clone(),
                item.id,
                item.name.clone(),
                item.quantity,
                base,
                addons,
                source,
            )?);
        }
        self.ledger.complete_cycle();

        let coupons = snapshot
            .coupons
            .iter()
            .map(|c| AppliedCoupon {
                code: c.code.clone(),
                discount: lenient_amount(Some(c.totals.total_discount.as_str()), currency),
            })
            .collect();
        let totals = &snapshot.totals;

        CartView::assemble(
            currency,
            items,
            coupons,
            lenient_amount(Some(totals.total_discount.as_str()), currency),
            lenient_amount(totals.total_shipping.as_deref(), currency),
            lenient_amount(Some(totals.total_tax.as_str()), currency),
            lenient_amount(Some(totals.total_price.as_str()), currency),
        )
        .map_err(CartError::from)
    }
}

/// Selections staged for an add. Dropping it settles the entry, so an add
/// abandoned mid-flight ages out instead of lingering.
struct StagedAdd {
    ledger: Arc<AddonLedger>,
    key: ProvisionalKey,
}

impl StagedAdd {
    fn new(
        ledger: &Arc<AddonLedger>,
        product_id: ProductId,
        selections: Vec<AddonSelection>,
    ) -> Self {
        Self {
            ledger: Arc::clone(ledger),
            key: ledger.stage(product_id, selections),
        }
    }
}

impl Drop for StagedAdd {
    fn drop(&mut self) {
        self.ledger.settle(&self.key);
    }
}

/// Rejects a second identical add while the first is outstanding.
struct AddGuard {
    inner: Arc<EngineInner>,
    slot: (ProductId, String),
}

impl AddGuard {
    fn acquire(
        inner: &Arc<EngineInner>,
        product_id: ProductId,
        fingerprint: String,
    ) -> Result<Self, CartError> {
        let slot = (product_id, fingerprint);
        if !inner.pending_adds.lock().insert(slot.clone()) {
            tracing::debug!(product = %product_id, "duplicate add to cart rejected");
            return Err(CartError::DuplicateAdd(product_id));
        }
        Ok(Self {
            inner: Arc::clone(inner),
            slot,
        })
    }
}

impl Drop for AddGuard {
    fn drop(&mut self) {
        self.inner.pending_adds.lock().remove(&self.slot);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyMatch {
    Found(LineItemKey),
    /// No new line: the upstream bumped an existing one.
    Merged,
    Ambiguous(Vec<LineItemKey>),
}

/// Find the line an add created by elimination against the keys seen
/// before it.
fn locate_new_key(
    snapshot: &ServerCartSnapshot,
    prior_keys: &HashSet<LineItemKey>,
    product_id: ProductId,
) -> KeyMatch {
    let fresh: Vec<_> = snapshot
        .items
        .iter()
        .filter(|item| !prior_keys.contains(&item.key))
        .collect();

    match fresh.as_slice() {
        [] => KeyMatch::Merged,
        [only] => KeyMatch::Found(only.key.clone()),
        several => {
            let same_product: Vec<_> = several.iter().filter(|i| i.id == product_id).collect();
            match same_product.as_slice() {
                [only] => KeyMatch::Found(only.key.clone()),
                _ => KeyMatch::Ambiguous(several.iter().map(|i| i.key.clone()).collect()),
            }
        }
    }
}
