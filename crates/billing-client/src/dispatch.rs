//! # Callback Dispatch
//!
//! Routes serialized bridge callbacks to typed listeners.
//!
//! Every entry point follows the same steps:
//! 1. Drop the callback if the session was torn down
//! 2. Parse the payload with the session's [`ResponseParser`]
//! 3. Take the listener out of its slot and invoke it on the current thread
//!
//! A malformed payload is logged and dropped. A missing listener is a no-op.
//! Because delivery happens synchronously on the thread the bridge called
//! in on, each category sees results in the order the bridge delivered them.

use crate::connection::ConnectionTracker;
use crate::listeners::{ConnectionEvent, ListenerCategory, ListenerRegistry, Slot};
use billing_core::{BillingCallbacks, PayloadKind, ResponseParser, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to a delivered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Parsed and handed to the registered listener
    Delivered,
    /// Parsed, but no listener is registered for the category
    NoListener,
    /// Payload could not be parsed; dropped
    Malformed,
    /// Session was torn down; dropped without parsing
    Ignored,
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered)
    }
}

/// Callback entry points of a billing session
pub struct Dispatcher {
    parser: ResponseParser,
    listeners: Arc<ListenerRegistry>,
    connection: Arc<ConnectionTracker>,
}

impl Dispatcher {
    pub fn new(
        parser: ResponseParser,
        listeners: Arc<ListenerRegistry>,
        connection: Arc<ConnectionTracker>,
    ) -> Self {
        Self {
            parser,
            listeners,
            connection,
        }
    }

    pub fn dispatch_setup_finished(&self, payload: &str) -> DispatchOutcome {
        let category = ListenerCategory::ConnectionState;
        if self.ignored(category) {
            return DispatchOutcome::Ignored;
        }

        let result = match self.parser.setup_finished(payload) {
            Ok(result) => result,
            Err(e) => return malformed(category, e),
        };

        let Some(transition) = self.connection.setup_finished(result.is_ok()) else {
            warn!(
                state = %self.connection.state(),
                result = %result,
                "Setup finished without a connection attempt; ignored"
            );
            return DispatchOutcome::Ignored;
        };
        info!(
            from = %transition.from,
            to = %transition.to,
            result = %result,
            "Billing setup finished"
        );

        deliver(category, &self.listeners.connection, ConnectionEvent::SetupFinished(result))
    }

    pub fn dispatch_service_disconnected(&self) -> DispatchOutcome {
        let category = ListenerCategory::ConnectionState;
        if self.ignored(category) {
            return DispatchOutcome::Ignored;
        }

        let transition = self.connection.disconnected();
        if transition.is_change() {
            info!(from = %transition.from, "Billing service disconnected");
        } else {
            debug!("Billing service disconnected while already disconnected");
        }

        deliver(category, &self.listeners.connection, ConnectionEvent::ServiceDisconnected)
    }

    pub fn dispatch_purchases_updated(&self, payload: &str) -> DispatchOutcome {
        self.route(
            ListenerCategory::PurchasesUpdated,
            |p| p.purchases(PayloadKind::PurchasesUpdated, payload),
            &self.listeners.purchases_updated,
        )
    }

    pub fn dispatch_purchases_response(&self, payload: &str) -> DispatchOutcome {
        self.route(
            ListenerCategory::PurchasesResponse,
            |p| p.purchases(PayloadKind::PurchasesResponse, payload),
            &self.listeners.purchases_response,
        )
    }

    pub fn dispatch_product_details_response(&self, payload: &str) -> DispatchOutcome {
        self.route(
            ListenerCategory::ProductDetailsResponse,
            |p| p.product_details(payload),
            &self.listeners.product_details,
        )
    }

    pub fn dispatch_consume_response(&self, payload: &str) -> DispatchOutcome {
        self.route(
            ListenerCategory::ConsumeResponse,
            |p| p.consume(payload),
            &self.listeners.consume,
        )
    }

    fn route<T, F>(&self, category: ListenerCategory, parse: F, slot: &Slot<T>) -> DispatchOutcome
    where
        F: FnOnce(&ResponseParser) -> Result<T>,
    {
        if self.ignored(category) {
            return DispatchOutcome::Ignored;
        }

        match parse(&self.parser) {
            Ok(value) => deliver(category, slot, value),
            Err(e) => malformed(category, e),
        }
    }

    fn ignored(&self, category: ListenerCategory) -> bool {
        let torn_down = self.connection.is_torn_down();
        if torn_down {
            debug!(%category, "Callback after teardown ignored");
        }
        torn_down
    }
}

fn malformed(category: ListenerCategory, error: billing_core::BillingError) -> DispatchOutcome {
    warn!(%category, error = %error, "Dropping malformed callback payload");
    DispatchOutcome::Malformed
}

fn deliver<T>(category: ListenerCategory, slot: &Slot<T>, value: T) -> DispatchOutcome {
    let Some(listener) = slot.get() else {
        debug!(%category, "No listener registered");
        return DispatchOutcome::NoListener;
    };

    if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
        error!(%category, "Listener panicked");
    }
    DispatchOutcome::Delivered
}

impl BillingCallbacks for Dispatcher {
    fn billing_setup_finished(&self, payload: &str) {
        self.dispatch_setup_finished(payload);
    }

    fn billing_service_disconnected(&self) {
        self.dispatch_service_disconnected();
    }

    fn purchases_updated(&self, payload: &str) {
        self.dispatch_purchases_updated(payload);
    }

    fn purchases_response(&self, payload: &str) {
        self.dispatch_purchases_response(payload);
    }

    fn product_details_response(&self, payload: &str) {
        self.dispatch_product_details_response(payload);
    }

    fn consume_response(&self, payload: &str) {
        self.dispatch_consume_response(payload);
    }
}
