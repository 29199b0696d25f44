//! Shared fakes for engine tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use turbo_cache::MemoryStorage;
use turbo_cart::upstream::{
    ServerAddon, ServerCoupon, ServerCouponTotals, ServerItemData, ServerItemPrices,
    ServerLineItem, ServerTotals,
};
use turbo_cart::{
    AddItemRequest, AddonLedger, CartError, CartSyncEngine, ServerCartSnapshot,
    StaticAddonCatalog, UpstreamCartClient,
};
use turbo_commerce::{
    config_fingerprint, resolve_selections, AddonConfig, AddonConfigValue, AddonDefinition,
    AddonKind, AddonOption, AddonPrice, AddonSelection, CouponCode, Currency, LineItemKey, Money,
    ProductAddons, ProductId,
};

pub const BOX: ProductId = ProductId(12);
pub const CARD: ProductId = ProductId(14);

pub fn usd(cents: i64) -> Money {
    Money::new(cents, Currency::USD)
}

/// $100 box with gift wrap ($20 "Premium") and a $15 greeting card, plus
/// a free text engraving.
pub fn walnut_box() -> ProductAddons {
    ProductAddons {
        product_id: BOX,
        base_unit_price: usd(10000),
        addons: vec![
            AddonDefinition::new("wrap", "Gift wrap", AddonKind::SingleChoice)
                .with_option(AddonOption::new("None", None))
                .with_option(AddonOption::new("Premium", Some(AddonPrice::Fixed(usd(2000))))),
            AddonDefinition::new("card", "Greeting card", AddonKind::SingleChoice)
                .with_option(AddonOption::new("Birthday", Some(AddonPrice::Fixed(usd(1500))))),
            AddonDefinition::new("engraving", "Engraving", AddonKind::Text),
        ],
    }
}

/// $5 card with no add-ons.
pub fn plain_card() -> ProductAddons {
    ProductAddons {
        product_id: CARD,
        base_unit_price: usd(500),
        addons: Vec::new(),
    }
}

/// Premium wrap and the birthday card: +$35 per unit.
pub fn wrap_and_card() -> AddonConfig {
    let mut config = AddonConfig::new();
    config.insert("wrap".into(), AddonConfigValue::Choice(1));
    config.insert("card".into(), AddonConfigValue::Choice(0));
    config
}

pub fn engraving(text: &str) -> AddonConfig {
    let mut config = AddonConfig::new();
    config.insert("engraving".into(), AddonConfigValue::Text(text.into()));
    config
}

pub fn catalog() -> Arc<StaticAddonCatalog> {
    Arc::new(
        StaticAddonCatalog::new()
            .with_product(walnut_box())
            .with_product(plain_card()),
    )
}

#[derive(Debug, Clone)]
struct FakeLine {
    key: LineItemKey,
    product: ProductId,
    name: String,
    quantity: i64,
    base: Money,
    fingerprint: String,
    selections: Vec<AddonSelection>,
}

#[derive(Debug, Default)]
struct FakeCart {
    lines: Vec<FakeLine>,
    coupons: Vec<CouponCode>,
    shipping: i64,
    next_key: u64,
}

/// An in-memory session cart that, like the real service, reports add-on
/// selections without their prices and merges identical adds.
pub struct FakeUpstream {
    products: HashMap<ProductId, ProductAddons>,
    cart: Mutex<FakeCart>,
    fail_next: Mutex<Option<CartError>>,
    fail_next_add: Mutex<Option<CartError>>,
    pub report_addon_prices: AtomicBool,
    /// Report every add-on price as `-500`.
    pub report_negative_prices: AtomicBool,
    pub get_calls: AtomicUsize,
    pub add_calls: AtomicUsize,
    /// Number of upcoming `get_cart` calls to hold; `usize::MAX` holds all.
    held_gets: AtomicUsize,
    hold_adds: AtomicBool,
    gate: Semaphore,
}

impl FakeUpstream {
    pub fn new() -> Arc<Self> {
        let products = [walnut_box(), plain_card()]
            .into_iter()
            .map(|p| (p.product_id, p))
            .collect();
        Arc::new(Self {
            products,
            cart: Mutex::new(FakeCart::default()),
            fail_next: Mutex::new(None),
            fail_next_add: Mutex::new(None),
            report_addon_prices: AtomicBool::new(false),
            report_negative_prices: AtomicBool::new(false),
            get_calls: AtomicUsize::new(0),
            add_calls: AtomicUsize::new(0),
            held_gets: AtomicUsize::new(0),
            hold_adds: AtomicBool::new(false),
            gate: Semaphore::new(0),
        })
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn adds(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: CartError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    /// Make the next `add_item` fail with `err` before touching the cart.
    pub fn fail_next_add(&self, err: CartError) {
        *self.fail_next_add.lock().unwrap() = Some(err);
    }

    /// Hold every `get_cart` after it has taken its snapshot, until
    /// [`release`](Self::release).
    pub fn hold_gets(&self) {
        self.held_gets.store(usize::MAX, Ordering::SeqCst);
    }

    /// Hold only the next `get_cart`, after it has taken its snapshot.
    pub fn hold_next_get(&self) {
        self.held_gets.store(1, Ordering::SeqCst);
    }

    /// Hold every `add_item` before it reaches the cart.
    pub fn hold_adds(&self) {
        self.hold_adds.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held_gets.store(0, Ordering::SeqCst);
        self.hold_adds.store(false, Ordering::SeqCst);
        self.gate.add_permits(64);
    }

    fn take_get_hold(&self) -> bool {
        self.held_gets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(n),
                n => Some(n - 1),
            })
            .is_ok()
    }

    async fn wait_at_gate(&self) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }

    /// Remove a line behind the engine's back.
    pub fn remove_out_of_band(&self, key: &LineItemKey) {
        self.cart.lock().unwrap().lines.retain(|l| &l.key != key);
    }

    /// Add a line behind the engine's back.
    pub fn add_out_of_band(&self, product: ProductId, quantity: i64, config: &AddonConfig) -> LineItemKey {
        self.insert_line(product, quantity, config)
            .unwrap_or_else(|e| panic!("out-of-band add failed: {e}"))
    }

    pub fn keys(&self) -> Vec<LineItemKey> {
        self.cart.lock().unwrap().lines.iter().map(|l| l.key.clone()).collect()
    }

    fn take_failure(&self) -> Result<(), CartError> {
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn insert_line(&self, product: ProductId, quantity: i64, config: &AddonConfig) -> Result<LineItemKey, CartError> {
        let definition = self.products.get(&product).ok_or_else(|| CartError::UpstreamRejected {
            status: 400,
            code: "woocommerce_rest_cart_invalid_product".into(),
            message: "This product cannot be added to the cart.".into(),
        })?;
        let selections = resolve_selections(definition, config)?;
        let fingerprint = config_fingerprint(config);

        let mut cart = self.cart.lock().unwrap();
        if let Some(line) = cart
            .lines
            .iter_mut()
            .find(|l| l.product == product && l.fingerprint == fingerprint)
        {
            line.quantity += quantity;
            return Ok(line.key.clone());
        }

        cart.next_key += 1;
        let key = LineItemKey::new(format!("line-{:04}", cart.next_key));
        cart.lines.push(FakeLine {
            key: key.clone(),
            product,
            name: format!("Product {}", product),
            quantity,
            base: definition.base_unit_price,
            fingerprint,
            selections,
        });
        Ok(key)
    }

    pub fn snapshot(&self) -> ServerCartSnapshot {
        let cart = self.cart.lock().unwrap();
        let with_prices = self.report_addon_prices.load(Ordering::SeqCst);
        let negative = self.report_negative_prices.load(Ordering::SeqCst);

        let items: Vec<ServerLineItem> = cart
            .lines
            .iter()
            .map(|line| ServerLineItem {
                key: line.key.clone(),
                id: line.product,
                name: line.name.clone(),
                quantity: line.quantity,
                prices: ServerItemPrices {
                    price: line.base.amount_cents.to_string(),
                },
                item_data: line
                    .selections
                    .iter()
                    .map(|s| ServerItemData {
                        name: s.label.clone(),
                        value: s.field_id.to_string(),
                    })
                    .collect(),
                addons: with_prices.then(|| {
                    line.selections
                        .iter()
                        .map(|s| ServerAddon {
                            field_id: s.field_id.clone(),
                            label: s.label.clone(),
                            price: if negative {
                                "-500".to_string()
                            } else {
                                s.unit_price.amount_cents.to_string()
                            },
                            quantity: s.quantity,
                        })
                        .collect()
                }),
            })
            .collect();

        let items_total: i64 = cart.lines.iter().map(|l| l.base.amount_cents * l.quantity).sum();
        let discount: i64 = 1000 * cart.coupons.len() as i64;
        ServerCartSnapshot {
            items,
            coupons: cart
                .coupons
                .iter()
                .map(|code| ServerCoupon {
                    code: code.clone(),
                    totals: ServerCouponTotals {
                        total_discount: "1000".into(),
                    },
                })
                .collect(),
            totals: ServerTotals {
                currency_code: "USD".into(),
                total_items: items_total.to_string(),
                total_discount: discount.to_string(),
                total_shipping: Some(cart.shipping.to_string()),
                total_tax: "0".into(),
                total_price: (items_total - discount + cart.shipping).to_string(),
            },
        }
    }
}

#[async_trait]
impl UpstreamCartClient for FakeUpstream {
    async fn get_cart(&self) -> Result<ServerCartSnapshot, CartError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let snapshot = self.snapshot();
        if self.take_get_hold() {
            self.wait_at_gate().await;
        }
        Ok(snapshot)
    }

    async fn add_item(&self, request: &AddItemRequest) -> Result<ServerCartSnapshot, CartError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_adds.load(Ordering::SeqCst) {
            self.wait_at_gate().await;
        }
        if let Some(err) = self.fail_next_add.lock().unwrap().take() {
            return Err(err);
        }
        self.take_failure()?;
        self.insert_line(request.product_id, request.quantity, &request.addon_config)?;
        Ok(self.snapshot())
    }

    async fn update_item(&self, key: &LineItemKey, quantity: i64) -> Result<ServerCartSnapshot, CartError> {
        self.take_failure()?;
        {
            let mut cart = self.cart.lock().unwrap();
            let line = cart
                .lines
                .iter_mut()
                .find(|l| &l.key == key)
                .ok_or_else(|| CartError::UpstreamRejected {
                    status: 404,
                    code: "woocommerce_rest_cart_invalid_key".into(),
                    message: "Cart item does not exist.".into(),
                })?;
            line.quantity = quantity;
        }
        Ok(self.snapshot())
    }

    async fn remove_item(&self, key: &LineItemKey) -> Result<ServerCartSnapshot, CartError> {
        self.take_failure()?;
        self.remove_out_of_band(key);
        Ok(self.snapshot())
    }

    async fn apply_coupon(&self, code: &CouponCode) -> Result<ServerCartSnapshot, CartError> {
        self.take_failure()?;
        if code.as_str() != "SAVE10" {
            return Err(CartError::UpstreamRejected {
                status: 400,
                code: "woocommerce_rest_cart_coupon_error".into(),
                message: format!("Coupon \"{}\" does not exist!", code),
            });
        }
        self.cart.lock().unwrap().coupons.push(code.clone());
        Ok(self.snapshot())
    }

    async fn remove_coupon(&self, code: &CouponCode) -> Result<ServerCartSnapshot, CartError> {
        self.take_failure()?;
        self.cart.lock().unwrap().coupons.retain(|c| c != code);
        Ok(self.snapshot())
    }

    async fn select_shipping_rate(&self, _package_id: u32, rate_id: &str) -> Result<ServerCartSnapshot, CartError> {
        self.take_failure()?;
        self.cart.lock().unwrap().shipping = if rate_id == "flat_rate:1" { 800 } else { 0 };
        Ok(self.snapshot())
    }
}

/// An engine over the fake, with a ledger on `storage`.
pub fn new_engine(upstream: &Arc<FakeUpstream>, storage: &Arc<MemoryStorage>) -> CartSyncEngine {
    let ledger = AddonLedger::with_default_key(storage.clone());
    CartSyncEngine::builder(upstream.clone(), catalog(), Arc::new(ledger)).build()
}
