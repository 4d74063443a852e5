//! # Loopback Bridge
//!
//! In-process [`BillingBridge`] answering every call from a [`ProductCatalog`].
//!
//! Asynchronous results are encoded in the session's payload shape and queued
//! to a single tokio worker, which invokes the registered callbacks in order.
//! Product details returned by a query are cached, and a launched flow uses
//! the cached details when present.

use crate::catalog::ProductCatalog;
use billing_core::{
    AccountIdentifiers, BillingBridge, BillingResult, BoxedBillingCallbacks, ConsumeResult,
    PayloadShape, ProductDetails, ProductDetailsResult, ProductType, Purchase, PurchaseState,
    PurchasesResult, ReferralDeeplinkResult, ResponseCode, UnfetchedProduct, UnfetchedStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A callback queued for delivery
#[derive(Debug)]
enum Delivery {
    SetupFinished(String),
    ServiceDisconnected,
    PurchasesUpdated(String),
    PurchasesResponse(String),
    ProductDetails(String),
    Consume(String),
}

/// Tunable behavior of the loopback bridge
#[derive(Debug, Clone)]
pub struct LoopbackOptions {
    pub platform: String,
    /// Result reported by setup-finished
    pub setup_result: BillingResult,
    /// Feature ids reported as supported
    pub supported_features: HashSet<i32>,
    pub app_update_available: bool,
    pub store_deeplink: Option<String>,
    pub fallback_deeplink: Option<String>,
    /// State assigned to new purchases
    pub purchase_state: PurchaseState,
    pub package_name: String,
}

impl Default for LoopbackOptions {
    fn default() -> Self {
        Self {
            platform: "loopback".to_string(),
            setup_result: BillingResult::new(ResponseCode::Ok, "Setup successful"),
            supported_features: HashSet::new(),
            app_update_available: false,
            store_deeplink: None,
            fallback_deeplink: None,
            purchase_state: PurchaseState::Purchased,
            package_name: "com.example.billing".to_string(),
        }
    }
}

impl LoopbackOptions {
    /// Builder: report this result when setup finishes
    pub fn with_setup_result(mut self, result: BillingResult) -> Self {
        self.setup_result = result;
        self
    }

    /// Builder: mark a feature id as supported
    pub fn with_feature(mut self, feature: i32) -> Self {
        self.supported_features.insert(feature);
        self
    }

    pub fn with_app_update(mut self, available: bool) -> Self {
        self.app_update_available = available;
        self
    }

    pub fn with_deeplinks(mut self, store: Option<String>, fallback: Option<String>) -> Self {
        self.store_deeplink = store;
        self.fallback_deeplink = fallback;
        self
    }

    pub fn with_purchase_state(mut self, state: PurchaseState) -> Self {
        self.purchase_state = state;
        self
    }
}

#[derive(Default)]
struct LoopbackState {
    connected: bool,
    details_cache: HashMap<String, ProductDetails>,
    owned: Vec<Purchase>,
}

/// Loopback bridge delivering callbacks from a tokio worker
pub struct LoopbackBridge {
    catalog: ProductCatalog,
    shape: PayloadShape,
    options: LoopbackOptions,
    state: Mutex<LoopbackState>,
    callbacks: Arc<RwLock<Option<BoxedBillingCallbacks>>>,
    outbox: mpsc::UnboundedSender<Delivery>,
}

impl LoopbackBridge {
    /// Create a bridge whose delivery worker runs on `runtime`
    pub fn new(catalog: ProductCatalog, shape: PayloadShape, runtime: &Handle) -> Self {
        Self::with_options(catalog, shape, LoopbackOptions::default(), runtime)
    }

    pub fn with_options(
        catalog: ProductCatalog,
        shape: PayloadShape,
        options: LoopbackOptions,
        runtime: &Handle,
    ) -> Self {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let callbacks = Arc::new(RwLock::new(None));
        runtime.spawn(deliver(inbox, callbacks.clone()));

        Self {
            catalog,
            shape,
            options,
            state: Mutex::new(LoopbackState::default()),
            callbacks,
            outbox,
        }
    }

    /// Drop the service connection as the backend would, notifying the session
    pub fn simulate_disconnect(&self) {
        self.lock().connected = false;
        warn!("Loopback service disconnected");
        self.send(Delivery::ServiceDisconnected);
    }

    /// Purchases currently owned
    pub fn owned_purchases(&self) -> Vec<Purchase> {
        self.lock().owned.clone()
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn send(&self, delivery: Delivery) {
        if self.outbox.send(delivery).is_err() {
            warn!("Loopback delivery worker stopped; callback dropped");
        }
    }

    fn disconnected() -> BillingResult {
        BillingResult::new(ResponseCode::ServiceDisconnected, "Service not connected")
    }

    fn purchases_of(&self, product_type: &str) -> PurchasesResult {
        let state = self.lock();
        if !state.connected {
            return PurchasesResult::new(Self::disconnected(), Vec::new());
        }

        let product_type: ProductType = match product_type.parse() {
            Ok(product_type) => product_type,
            Err(e) => {
                return PurchasesResult::new(
                    BillingResult::new(ResponseCode::DeveloperError, e.to_string()),
                    Vec::new(),
                )
            }
        };

        let purchases = state
            .owned
            .iter()
            .filter(|p| {
                p.products.iter().any(|id| {
                    self.catalog
                        .get(id)
                        .map_or(false, |c| c.product_type == product_type)
                })
            })
            .cloned()
            .collect();
        PurchasesResult::new(BillingResult::ok(), purchases)
    }

    /// Resolve the product for a flow: cached details first, then the catalog
    fn flow_product(&self, state: &LoopbackState, product_id: &str, product_type: &str) -> Option<ProductDetails> {
        if let Some(details) = state.details_cache.get(product_id) {
            return Some(details.clone());
        }
        let product_type: ProductType = product_type.parse().ok()?;
        self.catalog
            .find_active(product_id, product_type)
            .map(|p| p.to_details())
    }
}

async fn deliver(
    mut inbox: mpsc::UnboundedReceiver<Delivery>,
    callbacks: Arc<RwLock<Option<BoxedBillingCallbacks>>>,
) {
    while let Some(delivery) = inbox.recv().await {
        let target = match callbacks.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let Some(target) = target else {
            debug!(?delivery, "No callbacks registered; delivery dropped");
            continue;
        };

        match delivery {
            Delivery::SetupFinished(payload) => target.billing_setup_finished(&payload),
            Delivery::ServiceDisconnected => target.billing_service_disconnected(),
            Delivery::PurchasesUpdated(payload) => target.purchases_updated(&payload),
            Delivery::PurchasesResponse(payload) => target.purchases_response(&payload),
            Delivery::ProductDetails(payload) => target.product_details_response(&payload),
            Delivery::Consume(payload) => target.consume_response(&payload),
        }
    }
}

impl BillingBridge for LoopbackBridge {
    fn platform_name(&self) -> &str {
        &self.options.platform
    }

    fn initialize(&self, public_key: &str, listener_name: &str, callbacks: BoxedBillingCallbacks) {
        info!(listener = listener_name, key_len = public_key.len(), "Loopback bridge initialized");
        match self.callbacks.write() {
            Ok(mut guard) => *guard = Some(callbacks),
            Err(poisoned) => *poisoned.into_inner() = Some(callbacks),
        }
    }

    fn start_connection(&self) {
        let result = self.options.setup_result.clone();
        self.lock().connected = result.is_ok();
        self.send(Delivery::SetupFinished(self.shape.encode_billing_result(&result)));
    }

    fn end_connection(&self) {
        self.lock().connected = false;
        info!("Loopback connection ended");
    }

    fn is_ready(&self) -> bool {
        self.lock().connected
    }

    fn query_product_details_async(&self, product_ids: &[String], product_type: &str) {
        let mut state = self.lock();
        let result = if !state.connected {
            ProductDetailsResult {
                billing_result: Self::disconnected(),
                product_details: Vec::new(),
                unfetched_products: Vec::new(),
            }
        } else {
            let mut product_details = Vec::new();
            let mut unfetched_products = Vec::new();

            match product_type.parse::<ProductType>() {
                Ok(product_type) => {
                    for id in product_ids {
                        match self.catalog.find_active(id, product_type) {
                            Some(product) => {
                                let details = product.to_details();
                                state.details_cache.insert(id.clone(), details.clone());
                                product_details.push(details);
                            }
                            None => unfetched_products.push(UnfetchedProduct {
                                product_id: id.clone(),
                                product_type,
                                status_code: UnfetchedStatus::PRODUCT_NOT_FOUND,
                            }),
                        }
                    }
                    ProductDetailsResult {
                        billing_result: BillingResult::ok(),
                        product_details,
                        unfetched_products,
                    }
                }
                Err(e) => ProductDetailsResult {
                    billing_result: BillingResult::new(ResponseCode::DeveloperError, e.to_string()),
                    product_details,
                    unfetched_products,
                },
            }
        };
        drop(state);

        debug!(
            fetched = result.product_details.len(),
            unfetched = result.unfetched_products.len(),
            "Product details resolved"
        );
        self.send(Delivery::ProductDetails(self.shape.encode_product_details(&result)));
    }

    fn launch_billing_flow(
        &self,
        product_id: &str,
        product_type: &str,
        developer_payload: Option<&str>,
        obfuscated_account_id: Option<&str>,
        free_trial: bool,
    ) -> String {
        let mut state = self.lock();
        if !state.connected {
            return self.shape.encode_billing_result(&Self::disconnected());
        }

        let Some(details) = self.flow_product(&state, product_id, product_type) else {
            return self.shape.encode_billing_result(&BillingResult::new(
                ResponseCode::ItemUnavailable,
                format!("Unknown product: {}", product_id),
            ));
        };

        if state.owned.iter().any(|p| p.contains_product(product_id)) {
            return self.shape.encode_billing_result(&BillingResult::new(
                ResponseCode::ItemAlreadyOwned,
                "Item already owned",
            ));
        }

        let now = chrono::Utc::now().timestamp_millis();
        let purchase = Purchase {
            account_identifiers: obfuscated_account_id.map(|id| AccountIdentifiers {
                obfuscated_account_id: Some(id.to_string()),
            }),
            developer_payload: developer_payload.map(str::to_string),
            order_id: format!("LBO.{}", Uuid::new_v4()),
            package_name: self.options.package_name.clone(),
            products: vec![details.product_id.clone()],
            purchase_state: self.options.purchase_state,
            purchase_time: now,
            purchase_token: Uuid::new_v4().to_string(),
            is_auto_renewing: details.is_subscription(),
            ..Default::default()
        };
        state.owned.push(purchase.clone());
        drop(state);

        info!(
            product_id,
            free_trial,
            token = %purchase.purchase_token,
            "Loopback purchase completed"
        );
        let update = PurchasesResult::new(BillingResult::ok(), vec![purchase]);
        self.send(Delivery::PurchasesUpdated(self.shape.encode_purchases(&update)));

        self.shape.encode_billing_result(&BillingResult::ok())
    }

    fn consume_async(&self, purchase_token: &str) {
        let mut state = self.lock();
        let billing_result = if !state.connected {
            Self::disconnected()
        } else {
            match state.owned.iter().position(|p| p.purchase_token == purchase_token) {
                Some(index) => {
                    state.owned.remove(index);
                    BillingResult::ok()
                }
                None => BillingResult::new(ResponseCode::ItemNotOwned, "Purchase not found"),
            }
        };
        drop(state);

        let result = ConsumeResult {
            billing_result,
            purchase_token: purchase_token.to_string(),
        };
        self.send(Delivery::Consume(self.shape.encode_consume(&result)));
    }

    fn is_feature_supported(&self, feature: i32) -> String {
        let result = if self.options.supported_features.contains(&feature) {
            BillingResult::ok()
        } else {
            BillingResult::new(ResponseCode::FeatureNotSupported, format!("Feature {} not supported", feature))
        };
        self.shape.encode_billing_result(&result)
    }

    fn query_purchases_async(&self, product_type: &str) {
        let result = self.purchases_of(product_type);
        self.send(Delivery::PurchasesResponse(self.shape.encode_purchases(&result)));
    }

    fn query_purchases(&self, product_type: &str) -> String {
        self.shape.encode_purchases(&self.purchases_of(product_type))
    }

    fn get_referral_deeplink(&self) -> String {
        let result = ReferralDeeplinkResult {
            billing_result: BillingResult::ok(),
            store_deeplink: self.options.store_deeplink.clone(),
            fallback_deeplink: self.options.fallback_deeplink.clone(),
        };
        self.shape.encode_referral_deeplink(&result)
    }

    fn is_app_update_available(&self) -> bool {
        self.options.app_update_available
    }

    fn launch_app_update_dialog(&self) {
        info!("Loopback app update dialog launched");
    }

    fn launch_app_update_store(&self) {
        info!("Loopback app update store launched");
    }
}
