//! Client-side record of priced add-ons per cart line.
//!
//! The cart service drops add-on prices from its snapshots, so the ledger
//! keeps what was selected (and what it cost) keyed by the server's line
//! key. It is written through to durable storage on every change and
//! hydrated from it once per process.
//!
//! Adding to the cart is two-phase: the selections are [`staged`] under a
//! [`ProvisionalKey`] before the upstream call, then [`committed`] under the
//! line key the upstream assigned. Provisional entries live in memory only.
//! They do not age while their add is outstanding; once [`settled`] they get
//! one reconciliation cycle to be claimed.
//!
//! [`staged`]: AddonLedger::stage
//! [`committed`]: AddonLedger::commit
//! [`settled`]: AddonLedger::settle

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use turbo_cache::{cache_key, DurableStorage, PersistenceAdapter};
use turbo_commerce::{AddonSelection, LineItemKey, ProductId, ProvisionalKey};

/// The persisted payload: line key to priced selections.
pub type LedgerEntries = BTreeMap<LineItemKey, Vec<AddonSelection>>;

/// Schema version written with every snapshot.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
struct ConfirmedEntry {
    addons: Vec<AddonSelection>,
    written_at: u64,
}

#[derive(Debug, Clone)]
struct ProvisionalEntry {
    product_id: ProductId,
    addons: Vec<AddonSelection>,
    /// Cycle the add returned in; `None` while it is outstanding.
    settled_at_cycle: Option<u64>,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: BTreeMap<LineItemKey, ConfirmedEntry>,
    provisional: HashMap<ProvisionalKey, ProvisionalEntry>,
    /// Keys removed before hydration; disk copies of these must not return.
    removed_before_hydration: HashSet<LineItemKey>,
    epoch: u64,
    cycle: u64,
    hydrated: bool,
    persist_pending: bool,
}

/// Line key to priced add-ons, written through to durable storage.
pub struct AddonLedger {
    state: Mutex<LedgerState>,
    adapter: PersistenceAdapter<LedgerEntries>,
}

impl AddonLedger {
    /// Create a ledger over an adapter.
    pub fn new(adapter: PersistenceAdapter<LedgerEntries>) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            adapter,
        }
    }

    /// Create a ledger stored under `key` at the current schema version.
    pub fn with_storage(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        Self::new(PersistenceAdapter::new(storage, key, LEDGER_SCHEMA_VERSION))
    }

    /// Create a ledger under the default namespaced key.
    pub fn with_default_key(storage: Arc<dyn DurableStorage>) -> Self {
        Self::with_storage(storage, cache_key!("turbo-cart", "addon-ledger"))
    }

    /// Load persisted entries, once. Returns how many entries were merged.
    ///
    /// Entries written before hydration win over their persisted copies, and
    /// keys removed before hydration stay removed. If anything changed while
    /// unhydrated, the merged state is persisted afterwards.
    pub fn hydrate(&self) -> usize {
        let mut state = self.state.lock();
        if state.hydrated {
            return 0;
        }

        let mut merged = 0;
        if let Some(snapshot) = self.adapter.hydrate() {
            for (key, addons) in snapshot.entries {
                if state.removed_before_hydration.contains(&key) || state.entries.contains_key(&key) {
                    continue;
                }
                state.entries.insert(
                    key,
                    ConfirmedEntry {
                        addons,
                        written_at: 0,
                    },
                );
                merged += 1;
            }
        }
        state.hydrated = true;
        state.removed_before_hydration.clear();
        tracing::info!(
            entries = merged,
            storage_available = self.adapter.is_available(),
            "add-on ledger hydrated"
        );

        if state.persist_pending {
            self.persist_locked(&mut state);
        }
        merged
    }

    /// Mark the ledger hydrated without reading storage. Whatever is in
    /// memory becomes authoritative and is persisted if anything is pending.
    pub fn bypass_hydration(&self) {
        let mut state = self.state.lock();
        if state.hydrated {
            return;
        }
        state.hydrated = true;
        state.removed_before_hydration.clear();
        tracing::info!("add-on ledger hydration bypassed");
        if state.persist_pending {
            self.persist_locked(&mut state);
        }
    }

    pub fn is_hydrated(&self) -> bool {
        self.state.lock().hydrated
    }

    /// Record the add-ons of a line, replacing any previous selection.
    pub fn set_item_addons(&self, key: LineItemKey, addons: Vec<AddonSelection>) {
        let mut state = self.state.lock();
        state.epoch += 1;
        let written_at = state.epoch;
        state.removed_before_hydration.remove(&key);
        state.entries.insert(key, ConfirmedEntry { addons, written_at });
        self.persist_locked(&mut state);
    }

    /// The add-ons of a line, or an empty list.
    pub fn get_item_addons(&self, key: &LineItemKey) -> Vec<AddonSelection> {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|e| e.addons.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &LineItemKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Forget a line. Returns whether it was known.
    pub fn remove_item(&self, key: &LineItemKey) -> bool {
        let mut state = self.state.lock();
        let existed = state.entries.remove(key).is_some();
        if !state.hydrated {
            state.removed_before_hydration.insert(key.clone());
        }
        if existed || !state.hydrated {
            state.epoch += 1;
            self.persist_locked(&mut state);
        }
        existed
    }

    /// Prune every entry whose key is not live. Returns the pruned keys.
    pub fn sync_with_server_keys(&self, live: &HashSet<LineItemKey>) -> Vec<LineItemKey> {
        self.sync_with_server_keys_as_of(live, u64::MAX)
    }

    /// Prune entries absent from `live`, but only those written at or
    /// before `epoch`: anything recorded after the snapshot was requested
    /// cannot be judged by it.
    ///
    /// Refuses to prune before hydration, since an empty in-memory ledger
    /// says nothing about what storage holds.
    pub fn sync_with_server_keys_as_of(
        &self,
        live: &HashSet<LineItemKey>,
        epoch: u64,
    ) -> Vec<LineItemKey> {
        let mut state = self.state.lock();
        if !state.hydrated {
            tracing::warn!("ledger not hydrated; skipping prune");
            return Vec::new();
        }

        let pruned: Vec<LineItemKey> = state
            .entries
            .iter()
            .filter(|(key, entry)| !live.contains(*key) && entry.written_at <= epoch)
            .map(|(key, _)| key.clone())
            .collect();
        if pruned.is_empty() {
            return pruned;
        }

        for key in &pruned {
            state.entries.remove(key);
        }
        tracing::debug!(pruned = pruned.len(), "pruned orphaned ledger entries");
        self.persist_locked(&mut state);
        pruned
    }

    /// The current write epoch. Capture it before fetching a snapshot and
    /// hand it to [`sync_with_server_keys_as_of`](Self::sync_with_server_keys_as_of).
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Hold selections for an add-to-cart whose line key is not known yet.
    ///
    /// The entry is kept however many cycles complete until it is
    /// [`settle`](Self::settle)d, committed or discarded.
    pub fn stage(&self, product_id: ProductId, addons: Vec<AddonSelection>) -> ProvisionalKey {
        let key = ProvisionalKey::generate();
        let mut state = self.state.lock();
        state.provisional.insert(
            key.clone(),
            ProvisionalEntry {
                product_id,
                addons,
                settled_at_cycle: None,
            },
        );
        tracing::debug!(provisional = %key, product = %product_id, "staged add-on selections");
        key
    }

    /// Move staged selections to the confirmed line key. Returns false if the
    /// provisional entry is gone (discarded or aged out).
    pub fn commit(&self, provisional: &ProvisionalKey, key: LineItemKey) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.provisional.remove(provisional) else {
            tracing::warn!(provisional = %provisional, "commit of unknown provisional entry");
            return false;
        };
        state.epoch += 1;
        let written_at = state.epoch;
        tracing::debug!(
            provisional = %provisional,
            key = %key,
            product = %entry.product_id,
            "committed add-on selections"
        );
        state.removed_before_hydration.remove(&key);
        state.entries.insert(
            key,
            ConfirmedEntry {
                addons: entry.addons,
                written_at,
            },
        );
        self.persist_locked(&mut state);
        true
    }

    /// Mark the add behind a provisional entry as finished, starting its
    /// grace cycle. Returns false if the entry is gone or already settled.
    pub fn settle(&self, provisional: &ProvisionalKey) -> bool {
        let mut state = self.state.lock();
        let cycle = state.cycle;
        match state.provisional.get_mut(provisional) {
            Some(entry) if entry.settled_at_cycle.is_none() => {
                entry.settled_at_cycle = Some(cycle);
                true
            }
            _ => false,
        }
    }

    /// Drop staged selections. Returns whether they existed.
    pub fn discard(&self, provisional: &ProvisionalKey) -> bool {
        self.state.lock().provisional.remove(provisional).is_some()
    }

    pub fn provisional_count(&self) -> usize {
        self.state.lock().provisional.len()
    }

    /// Mark the end of a reconciliation cycle. Settled provisional entries
    /// that have lived through a whole cycle without being claimed are
    /// dropped; the number dropped is returned.
    pub fn complete_cycle(&self) -> usize {
        let mut state = self.state.lock();
        state.cycle += 1;
        let cycle = state.cycle;
        let before = state.provisional.len();
        state
            .provisional
            .retain(|_, entry| entry.settled_at_cycle.map_or(true, |at| cycle - at < 2));
        let dropped = before - state.provisional.len();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped unclaimed provisional entries");
        }
        dropped
    }

    /// A copy of the confirmed entries.
    pub fn entries(&self) -> LedgerEntries {
        Self::confirmed(&self.state.lock())
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Remove every entry, in memory and in storage.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.provisional.clear();
        state.epoch += 1;
        state.persist_pending = false;
        self.adapter.clear();
    }

    /// Flush a pending persist and drop in-memory state.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        if state.hydrated && state.persist_pending {
            self.persist_locked(&mut state);
        }
        state.entries.clear();
        state.provisional.clear();
        state.removed_before_hydration.clear();
        tracing::debug!("add-on ledger disposed");
    }

    /// Whether the last storage access succeeded.
    pub fn is_persistent(&self) -> bool {
        self.adapter.is_available()
    }

    fn confirmed(state: &LedgerState) -> LedgerEntries {
        state
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.addons.clone()))
            .collect()
    }

    /// Write through, or queue the write until hydration has merged storage.
    fn persist_locked(&self, state: &mut LedgerState) {
        if !state.hydrated {
            state.persist_pending = true;
            return;
        }
        // A failed write stays pending so dispose can retry it.
        state.persist_pending = !self.adapter.persist(&Self::confirmed(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbo_cache::MemoryStorage;
    use turbo_commerce::{Currency, Money};

    fn addon(field: &str, cents: i64) -> AddonSelection {
        AddonSelection::new(field, field.to_uppercase(), Money::new(cents, Currency::USD))
    }

    fn key(k: &str) -> LineItemKey {
        LineItemKey::new(k)
    }

    fn ledger(storage: &Arc<MemoryStorage>) -> AddonLedger {
        AddonLedger::with_default_key(storage.clone())
    }

    fn live(keys: &[&str]) -> HashSet<LineItemKey> {
        keys.iter().map(|k| key(k)).collect()
    }

    #[test]
    fn test_set_and_get_is_immediate() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();

        assert!(ledger.get_item_addons(&key("a")).is_empty());
        ledger.set_item_addons(key("a"), vec![addon("wrap", 2000)]);
        assert_eq!(ledger.get_item_addons(&key("a")), vec![addon("wrap", 2000)]);
        assert!(ledger.contains(&key("a")));
    }

    #[test]
    fn test_writes_through_to_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();
        ledger.set_item_addons(key("a"), vec![addon("wrap", 2000)]);

        let reloaded = AddonLedger::with_default_key(storage.clone());
        assert_eq!(reloaded.hydrate(), 1);
        assert_eq!(reloaded.get_item_addons(&key("a")), vec![addon("wrap", 2000)]);

        ledger.remove_item(&key("a"));
        let reloaded = AddonLedger::with_default_key(storage);
        assert_eq!(reloaded.hydrate(), 0);
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_prune_keeps_live_entries_untouched() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();
        ledger.set_item_addons(key("a"), vec![addon("wrap", 2000)]);
        ledger.set_item_addons(key("b"), vec![addon("card", 1500)]);
        ledger.set_item_addons(key("c"), Vec::new());

        let pruned = ledger.sync_with_server_keys(&live(&["a", "c", "z"]));

        assert_eq!(pruned, vec![key("b")]);
        assert_eq!(ledger.get_item_addons(&key("a")), vec![addon("wrap", 2000)]);
        assert!(ledger.contains(&key("c")));
        assert!(!ledger.contains(&key("b")));
        assert!(!ledger.contains(&key("z")));
    }

    #[test]
    fn test_prune_spares_entries_written_after_epoch() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();
        ledger.set_item_addons(key("old"), vec![addon("wrap", 2000)]);

        let epoch = ledger.epoch();
        ledger.set_item_addons(key("new"), vec![addon("card", 1500)]);

        let pruned = ledger.sync_with_server_keys_as_of(&live(&[]), epoch);
        assert_eq!(pruned, vec![key("old")]);
        assert!(ledger.contains(&key("new")));
    }

    #[test]
    fn test_no_prune_before_hydration() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let seeded = ledger(&storage);
            seeded.hydrate();
            seeded.set_item_addons(key("a"), vec![addon("wrap", 2000)]);
        }

        let ledger = ledger(&storage);
        assert!(ledger.sync_with_server_keys(&live(&[])).is_empty());
        ledger.hydrate();
        assert!(ledger.contains(&key("a")));
    }

    #[test]
    fn test_mutations_before_hydration_are_kept() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let seeded = ledger(&storage);
            seeded.hydrate();
            seeded.set_item_addons(key("a"), vec![addon("wrap", 2000)]);
            seeded.set_item_addons(key("b"), vec![addon("card", 1500)]);
        }

        let ledger = ledger(&storage);
        ledger.set_item_addons(key("a"), vec![addon("wrap", 2500)]);
        ledger.remove_item(&key("b"));
        ledger.set_item_addons(key("c"), vec![addon("ribbon", 300)]);
        assert_eq!(ledger.get_item_addons(&key("c")), vec![addon("ribbon", 300)]);

        ledger.hydrate();
        assert_eq!(ledger.get_item_addons(&key("a")), vec![addon("wrap", 2500)]);
        assert!(!ledger.contains(&key("b")));
        assert!(ledger.contains(&key("c")));

        let reloaded = AddonLedger::with_default_key(storage);
        reloaded.hydrate();
        assert_eq!(reloaded.entries(), ledger.entries());
    }

    #[test]
    fn test_hydrate_twice_ignores_storage_changes() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();

        let other = AddonLedger::with_default_key(storage.clone());
        other.bypass_hydration();
        other.set_item_addons(key("x"), vec![addon("wrap", 100)]);

        assert_eq!(ledger.hydrate(), 0);
        assert!(!ledger.contains(&key("x")));
    }

    #[test]
    fn test_provisional_commit_and_discard() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();

        let staged = ledger.stage(ProductId(12), vec![addon("wrap", 2000)]);
        assert_eq!(ledger.provisional_count(), 1);
        assert!(ledger.is_empty());

        assert!(ledger.commit(&staged, key("a")));
        assert_eq!(ledger.get_item_addons(&key("a")), vec![addon("wrap", 2000)]);
        assert!(!ledger.commit(&staged, key("b")));

        let dropped = ledger.stage(ProductId(12), vec![addon("card", 1500)]);
        assert!(ledger.discard(&dropped));
        assert!(!ledger.discard(&dropped));
        assert_eq!(ledger.provisional_count(), 0);
    }

    #[test]
    fn test_provisional_entries_are_not_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();
        ledger.stage(ProductId(1), vec![addon("wrap", 2000)]);

        let reloaded = AddonLedger::with_default_key(storage);
        reloaded.hydrate();
        assert!(reloaded.is_empty());
        assert_eq!(reloaded.provisional_count(), 0);
    }

    #[test]
    fn test_outstanding_provisional_never_ages() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();
        let staged = ledger.stage(ProductId(1), vec![addon("wrap", 2000)]);

        for _ in 0..5 {
            assert_eq!(ledger.complete_cycle(), 0);
        }
        assert!(ledger.commit(&staged, key("a")));
        assert_eq!(ledger.get_item_addons(&key("a")), vec![addon("wrap", 2000)]);
        assert!(!ledger.settle(&staged));
    }

    #[test]
    fn test_unclaimed_provisional_survives_one_cycle() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();
        let staged = ledger.stage(ProductId(1), vec![addon("wrap", 2000)]);
        ledger.complete_cycle();

        assert!(ledger.settle(&staged));
        assert!(!ledger.settle(&staged));
        assert_eq!(ledger.complete_cycle(), 0);
        assert_eq!(ledger.provisional_count(), 1);
        assert_eq!(ledger.complete_cycle(), 1);
        assert_eq!(ledger.provisional_count(), 0);
    }

    #[test]
    fn test_disabled_storage_keeps_memory_state() {
        let storage = Arc::new(MemoryStorage::disabled());
        let ledger = ledger(&storage);
        assert_eq!(ledger.hydrate(), 0);
        assert!(ledger.is_hydrated());

        ledger.set_item_addons(key("a"), vec![addon("wrap", 2000)]);
        assert_eq!(ledger.get_item_addons(&key("a")), vec![addon("wrap", 2000)]);
        assert!(!ledger.is_persistent());
    }

    #[test]
    fn test_clear_and_dispose() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ledger(&storage);
        ledger.hydrate();
        ledger.set_item_addons(key("a"), vec![addon("wrap", 2000)]);

        ledger.dispose();
        assert!(ledger.is_empty());
        let reloaded = AddonLedger::with_default_key(storage.clone());
        assert_eq!(reloaded.hydrate(), 1);

        reloaded.clear();
        assert!(reloaded.is_empty());
        let again = AddonLedger::with_default_key(storage);
        assert_eq!(again.hydrate(), 0);
    }
}
