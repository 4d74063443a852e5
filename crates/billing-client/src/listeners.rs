//! # Listener Registry
//!
//! One listener slot per response category. Listeners are plain shared
//! closures; registering a new listener replaces the previous one.

use billing_core::{BillingResult, ConsumeResult, ProductDetailsResult, PurchasesResult};
use std::sync::{Arc, RwLock};

/// Response categories that can carry a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerCategory {
    ConnectionState,
    PurchasesUpdated,
    PurchasesResponse,
    ProductDetailsResponse,
    ConsumeResponse,
}

impl ListenerCategory {
    pub const ALL: [ListenerCategory; 5] = [
        ListenerCategory::ConnectionState,
        ListenerCategory::PurchasesUpdated,
        ListenerCategory::PurchasesResponse,
        ListenerCategory::ProductDetailsResponse,
        ListenerCategory::ConsumeResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerCategory::ConnectionState => "connection-state",
            ListenerCategory::PurchasesUpdated => "purchases-updated",
            ListenerCategory::PurchasesResponse => "purchases-response",
            ListenerCategory::ProductDetailsResponse => "product-details-response",
            ListenerCategory::ConsumeResponse => "consume-response",
        }
    }
}

impl std::fmt::Display for ListenerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event delivered to the connection-state listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    SetupFinished(BillingResult),
    ServiceDisconnected,
}

/// A shared listener closure
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A single listener slot
///
/// Readers clone the `Arc` out and release the lock before invoking it, so
/// a listener may re-register listeners without deadlocking.
pub struct Slot<T> {
    listener: RwLock<Option<Listener<T>>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            listener: RwLock::new(None),
        }
    }
}

impl<T> Slot<T> {
    pub fn get(&self) -> Option<Listener<T>> {
        match self.listener.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, listener: Listener<T>) {
        self.replace(Some(listener));
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    pub fn is_set(&self) -> bool {
        match self.listener.read() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    fn replace(&self, listener: Option<Listener<T>>) {
        match self.listener.write() {
            Ok(mut guard) => *guard = listener,
            Err(poisoned) => *poisoned.into_inner() = listener,
        }
    }
}

/// Listener set registered in one go at session start
#[derive(Default, Clone)]
pub struct Listeners {
    connection: Option<Listener<ConnectionEvent>>,
    purchases_updated: Option<Listener<PurchasesResult>>,
    purchases_response: Option<Listener<PurchasesResult>>,
    product_details: Option<Listener<ProductDetailsResult>>,
    consume: Option<Listener<ConsumeResult>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connection<F>(mut self, f: F) -> Self
    where
        F: Fn(ConnectionEvent) + Send + Sync + 'static,
    {
        self.connection = Some(Arc::new(f));
        self
    }

    pub fn on_purchases_updated<F>(mut self, f: F) -> Self
    where
        F: Fn(PurchasesResult) + Send + Sync + 'static,
    {
        self.purchases_updated = Some(Arc::new(f));
        self
    }

    pub fn on_purchases_response<F>(mut self, f: F) -> Self
    where
        F: Fn(PurchasesResult) + Send + Sync + 'static,
    {
        self.purchases_response = Some(Arc::new(f));
        self
    }

    pub fn on_product_details<F>(mut self, f: F) -> Self
    where
        F: Fn(ProductDetailsResult) + Send + Sync + 'static,
    {
        self.product_details = Some(Arc::new(f));
        self
    }

    pub fn on_consume<F>(mut self, f: F) -> Self
    where
        F: Fn(ConsumeResult) + Send + Sync + 'static,
    {
        self.consume = Some(Arc::new(f));
        self
    }
}

/// Session-scoped listener table
#[derive(Default)]
pub struct ListenerRegistry {
    pub connection: Slot<ConnectionEvent>,
    pub purchases_updated: Slot<PurchasesResult>,
    pub purchases_response: Slot<PurchasesResult>,
    pub product_details: Slot<ProductDetailsResult>,
    pub consume: Slot<ConsumeResult>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install every listener present in `listeners`; absent ones keep their slot
    pub fn register(&self, listeners: Listeners) {
        if let Some(l) = listeners.connection {
            self.connection.set(l);
        }
        if let Some(l) = listeners.purchases_updated {
            self.purchases_updated.set(l);
        }
        if let Some(l) = listeners.purchases_response {
            self.purchases_response.set(l);
        }
        if let Some(l) = listeners.product_details {
            self.product_details.set(l);
        }
        if let Some(l) = listeners.consume {
            self.consume.set(l);
        }
    }

    pub fn is_registered(&self, category: ListenerCategory) -> bool {
        match category {
            ListenerCategory::ConnectionState => self.connection.is_set(),
            ListenerCategory::PurchasesUpdated => self.purchases_updated.is_set(),
            ListenerCategory::PurchasesResponse => self.purchases_response.is_set(),
            ListenerCategory::ProductDetailsResponse => self.product_details.is_set(),
            ListenerCategory::ConsumeResponse => self.consume.is_set(),
        }
    }

    pub fn clear(&self, category: ListenerCategory) {
        match category {
            ListenerCategory::ConnectionState => self.connection.clear(),
            ListenerCategory::PurchasesUpdated => self.purchases_updated.clear(),
            ListenerCategory::PurchasesResponse => self.purchases_response.clear(),
            ListenerCategory::ProductDetailsResponse => self.product_details.clear(),
            ListenerCategory::ConsumeResponse => self.consume.clear(),
        }
    }

    pub fn clear_all(&self) {
        for category in ListenerCategory::ALL {
            self.clear(category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_register_subset() {
        let registry = ListenerRegistry::new();
        registry.register(Listeners::new().on_consume(|_| {}));

        assert!(registry.is_registered(ListenerCategory::ConsumeResponse));
        assert!(!registry.is_registered(ListenerCategory::PurchasesUpdated));
    }

    #[test]
    fn test_last_write_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let registry = ListenerRegistry::new();

        let counter = first.clone();
        registry.register(Listeners::new().on_connection(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = second.clone();
        registry.register(Listeners::new().on_connection(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let listener = registry.connection.get().unwrap();
        listener(ConnectionEvent::ServiceDisconnected);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear() {
        let registry = ListenerRegistry::new();
        registry.register(
            Listeners::new()
                .on_purchases_updated(|_| {})
                .on_purchases_response(|_| {})
                .on_product_details(|_| {}),
        );

        registry.clear(ListenerCategory::PurchasesUpdated);
        assert!(!registry.is_registered(ListenerCategory::PurchasesUpdated));
        assert!(registry.is_registered(ListenerCategory::PurchasesResponse));

        registry.clear_all();
        for category in ListenerCategory::ALL {
            assert!(!registry.is_registered(category));
        }
    }

    #[test]
    fn test_listener_can_replace_itself() {
        let registry = Arc::new(ListenerRegistry::new());
        let inner = registry.clone();
        registry.consume.set(Arc::new(move |_| inner.consume.clear()));

        let listener = registry.consume.get().unwrap();
        listener(ConsumeResult {
            billing_result: BillingResult::ok(),
            purchase_token: "t".to_string(),
        });
        assert!(!registry.consume.is_set());
    }
}
