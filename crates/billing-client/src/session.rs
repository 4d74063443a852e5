//! # Billing Session
//!
//! The request facade. A session owns its bridge handle, listener table, and
//! connection tracker. Validated requests are flattened into primitive bridge
//! calls; immediate payloads are parsed into typed results.
//!
//! When the bridge is unavailable, or the session is disconnected, nothing is
//! forwarded and each operation resolves to a documented default:
//!
//! | Operation | Default |
//! |-----------|---------|
//! | `is_ready`, `is_app_update_available` | `false` |
//! | operations returning [`BillingResult`] | `ServiceDisconnected` |
//! | `query_purchases` | `ServiceDisconnected`, no purchases |
//! | `get_referral_deeplink` | `ServiceDisconnected`, no links |

use crate::config::SessionConfig;
use crate::connection::{ConnectionState, ConnectionTracker};
use crate::dispatch::Dispatcher;
use crate::listeners::{ListenerRegistry, Listeners};
use billing_core::{
    BillingFlowParams, BillingResult, BoxedBillingBridge, BoxedBillingCallbacks,
    BridgeAvailability, ConsumeParams, PurchasesResult, QueryProductDetailsParams,
    QueryPurchasesParams, ReferralDeeplinkResult, ResponseCode, ResponseParser,
};
use billing_core::{PayloadKind, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Why a call could not be forwarded
enum Blocked {
    Unavailable(String),
    Disconnected,
}

impl Blocked {
    fn result(&self) -> BillingResult {
        let message = match self {
            Blocked::Unavailable(platform) => {
                format!("billing bridge unavailable on {}", platform)
            }
            Blocked::Disconnected => "billing session is disconnected".to_string(),
        };
        BillingResult::new(ResponseCode::ServiceDisconnected, message)
    }
}

/// A single billing session
pub struct BillingSession {
    config: SessionConfig,
    availability: BridgeAvailability,
    parser: ResponseParser,
    listeners: Arc<ListenerRegistry>,
    connection: Arc<ConnectionTracker>,
    dispatcher: Arc<Dispatcher>,
}

impl BillingSession {
    pub fn new(config: SessionConfig, availability: BridgeAvailability) -> Self {
        let parser = ResponseParser::new(config.payload_shape);
        let listeners = Arc::new(ListenerRegistry::new());
        let connection = Arc::new(ConnectionTracker::new());
        let dispatcher = Arc::new(Dispatcher::new(
            parser,
            listeners.clone(),
            connection.clone(),
        ));

        Self {
            config,
            availability,
            parser,
            listeners,
            connection,
            dispatcher,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn availability(&self) -> &BridgeAvailability {
        &self.availability
    }

    /// Listener table, for re-registration after start
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Callback entry points handed to the bridge
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    /// Last-known connection state; never blocks
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Register listeners, initialize the bridge, and start connecting.
    ///
    /// While a connection is in progress or ready, only the listeners are
    /// replaced; the bridge is left as it is.
    #[instrument(skip(self, listeners), fields(listener = %self.config.listener_name))]
    pub fn start(&self, listeners: Listeners) -> BillingResult {
        self.listeners.register(listeners);

        let bridge = match self.availability.bridge() {
            Some(bridge) => bridge,
            None => return self.blocked(Blocked::Unavailable(self.platform()), "start"),
        };

        let state = self.connection.state();
        if state != ConnectionState::Disconnected {
            debug!(%state, "Session already started; listeners replaced");
            return BillingResult::ok();
        }

        let callbacks: BoxedBillingCallbacks = self.dispatcher.clone();
        bridge.initialize(&self.config.public_key, &self.config.listener_name, callbacks);
        info!(
            platform = %bridge.platform_name(),
            shape = %self.parser.shape().as_str(),
            "Billing bridge initialized"
        );

        self.connect(bridge)
    }

    /// Reconnect after a disconnect or teardown
    #[instrument(skip(self))]
    pub fn restart_connection(&self) -> BillingResult {
        match self.availability.bridge() {
            Some(bridge) => self.connect(bridge),
            None => self.blocked(Blocked::Unavailable(self.platform()), "restart_connection"),
        }
    }

    /// Tear the session down; callbacks still in flight are ignored
    #[instrument(skip(self))]
    pub fn end_connection(&self) {
        let transition = self.connection.tear_down();
        info!(from = %transition.from, "Billing session ended");

        if let Some(bridge) = self.availability.bridge() {
            bridge.end_connection();
        }
    }

    pub fn is_ready(&self) -> bool {
        match self.forwardable("is_ready") {
            Ok(bridge) => bridge.is_ready(),
            Err(_) => false,
        }
    }

    #[instrument(skip(self, params), fields(product_type = %params.product_type()))]
    pub fn query_product_details_async(&self, params: &QueryProductDetailsParams) -> BillingResult {
        let bridge = match self.forwardable("query_product_details_async") {
            Ok(bridge) => bridge,
            Err(result) => return result,
        };

        let product_ids = params.product_ids();
        debug!(?product_ids, "Forwarding product details query");
        bridge.query_product_details_async(&product_ids, params.product_type().as_str());
        BillingResult::ok()
    }

    #[instrument(skip(self, params), fields(sku = %params.sku()))]
    pub fn launch_billing_flow(&self, params: &BillingFlowParams) -> BillingResult {
        let bridge = match self.forwardable("launch_billing_flow") {
            Ok(bridge) => bridge,
            Err(result) => return result,
        };

        debug!(
            sku_type = %params.sku_type(),
            has_developer_payload = params.developer_payload().is_some(),
            has_account_id = params.obfuscated_account_id().is_some(),
            free_trial = params.free_trial(),
            "Forwarding billing flow launch"
        );
        let payload = bridge.launch_billing_flow(
            params.sku(),
            params.sku_type().as_str(),
            params.developer_payload(),
            params.obfuscated_account_id(),
            params.free_trial(),
        );
        immediate(self.parser.billing_result(&payload))
    }

    #[instrument(skip(self, params))]
    pub fn consume_async(&self, params: &ConsumeParams) -> BillingResult {
        let bridge = match self.forwardable("consume_async") {
            Ok(bridge) => bridge,
            Err(result) => return result,
        };

        debug!("Forwarding consume");
        bridge.consume_async(params.purchase_token());
        BillingResult::ok()
    }

    #[instrument(skip(self))]
    pub fn is_feature_supported(&self, feature: i32) -> BillingResult {
        let bridge = match self.forwardable("is_feature_supported") {
            Ok(bridge) => bridge,
            Err(result) => return result,
        };

        immediate(self.parser.billing_result(&bridge.is_feature_supported(feature)))
    }

    #[instrument(skip(self, params), fields(product_type = %params.product_type()))]
    pub fn query_purchases_async(&self, params: &QueryPurchasesParams) -> BillingResult {
        let bridge = match self.forwardable("query_purchases_async") {
            Ok(bridge) => bridge,
            Err(result) => return result,
        };

        debug!("Forwarding purchases query");
        bridge.query_purchases_async(params.product_type().as_str());
        BillingResult::ok()
    }

    /// Legacy synchronous purchases query
    #[instrument(skip(self, params), fields(product_type = %params.product_type()))]
    pub fn query_purchases(&self, params: &QueryPurchasesParams) -> PurchasesResult {
        let bridge = match self.forwardable("query_purchases") {
            Ok(bridge) => bridge,
            Err(result) => return PurchasesResult::new(result, Vec::new()),
        };

        let payload = bridge.query_purchases(params.product_type().as_str());
        self.parser
            .purchases(PayloadKind::PurchasesResponse, &payload)
            .unwrap_or_else(|e| PurchasesResult::new(malformed_result(&e), Vec::new()))
    }

    #[instrument(skip(self))]
    pub fn get_referral_deeplink(&self) -> ReferralDeeplinkResult {
        let bridge = match self.forwardable("get_referral_deeplink") {
            Ok(bridge) => bridge,
            Err(result) => return without_links(result),
        };

        let payload = bridge.get_referral_deeplink();
        self.parser
            .referral_deeplink(&payload)
            .unwrap_or_else(|e| without_links(malformed_result(&e)))
    }

    pub fn is_app_update_available(&self) -> bool {
        match self.forwardable("is_app_update_available") {
            Ok(bridge) => bridge.is_app_update_available(),
            Err(_) => false,
        }
    }

    #[instrument(skip(self))]
    pub fn launch_app_update_dialog(&self) -> BillingResult {
        match self.forwardable("launch_app_update_dialog") {
            Ok(bridge) => {
                bridge.launch_app_update_dialog();
                BillingResult::ok()
            }
            Err(result) => result,
        }
    }

    #[instrument(skip(self))]
    pub fn launch_app_update_store(&self) -> BillingResult {
        match self.forwardable("launch_app_update_store") {
            Ok(bridge) => {
                bridge.launch_app_update_store();
                BillingResult::ok()
            }
            Err(result) => result,
        }
    }

    fn connect(&self, bridge: &BoxedBillingBridge) -> BillingResult {
        if self.connection.connect() {
            info!("Starting billing connection");
            bridge.start_connection();
        } else {
            debug!(state = %self.connection.state(), "Connection already started");
        }
        BillingResult::ok()
    }

    /// Bridge handle if calls may be forwarded, else the default result
    fn forwardable(&self, operation: &str) -> std::result::Result<&BoxedBillingBridge, BillingResult> {
        let bridge = match self.availability.bridge() {
            Some(bridge) => bridge,
            None => return Err(self.blocked(Blocked::Unavailable(self.platform()), operation)),
        };
        if self.connection.state() == ConnectionState::Disconnected {
            return Err(self.blocked(Blocked::Disconnected, operation));
        }
        Ok(bridge)
    }

    fn blocked(&self, reason: Blocked, operation: &str) -> BillingResult {
        let result = reason.result();
        warn!(operation, reason = %result.debug_message, "Billing call not forwarded");
        result
    }

    fn platform(&self) -> String {
        self.availability.platform().to_string()
    }
}

fn immediate(parsed: Result<BillingResult>) -> BillingResult {
    parsed.unwrap_or_else(|e| malformed_result(&e))
}

fn malformed_result(error: &billing_core::BillingError) -> BillingResult {
    warn!(error = %error, "Malformed immediate payload");
    BillingResult::new(ResponseCode::Error, error.to_string())
}

fn without_links(billing_result: BillingResult) -> ReferralDeeplinkResult {
    ReferralDeeplinkResult {
        billing_result,
        store_deeplink: None,
        fallback_deeplink: None,
    }
}
