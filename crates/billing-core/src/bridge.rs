//! # Bridge Boundary
//!
//! Traits describing the native billing bridge and the callback entry points
//! it invokes. The bridge accepts flattened primitive arguments and answers
//! with serialized payload strings; parsing happens on this side.
//!
//! ```text
//!   BillingSession ──(primitive calls)──▶ BillingBridge
//!         ▲                                    │
//!         └──────(payload strings)──── BillingCallbacks
//! ```

use std::sync::Arc;

/// Outbound calls into the native billing bridge
///
/// Asynchronous operations return immediately; their results arrive later
/// through the [`BillingCallbacks`] handed over in [`initialize`](Self::initialize).
/// Implementations may deliver callbacks from any thread.
pub trait BillingBridge: Send + Sync {
    /// Name of the platform this bridge runs on (for logging)
    fn platform_name(&self) -> &str;

    fn initialize(&self, public_key: &str, listener_name: &str, callbacks: BoxedBillingCallbacks);

    fn start_connection(&self);

    fn end_connection(&self);

    fn is_ready(&self) -> bool;

    fn query_product_details_async(&self, product_ids: &[String], product_type: &str);

    /// Launch the purchase flow; returns an immediate BillingResult payload
    fn launch_billing_flow(
        &self,
        product_id: &str,
        product_type: &str,
        developer_payload: Option<&str>,
        obfuscated_account_id: Option<&str>,
        free_trial: bool,
    ) -> String;

    fn consume_async(&self, purchase_token: &str);

    /// Returns an immediate BillingResult payload
    fn is_feature_supported(&self, feature: i32) -> String;

    fn query_purchases_async(&self, product_type: &str);

    /// Legacy synchronous query; returns an immediate purchases payload
    fn query_purchases(&self, product_type: &str) -> String;

    /// Returns an immediate referral deeplink payload
    fn get_referral_deeplink(&self) -> String;

    fn is_app_update_available(&self) -> bool;

    fn launch_app_update_dialog(&self);

    fn launch_app_update_store(&self);
}

/// Inbound entry points invoked by the bridge, one serialized payload each
pub trait BillingCallbacks: Send + Sync {
    fn billing_setup_finished(&self, payload: &str);

    fn billing_service_disconnected(&self);

    fn purchases_updated(&self, payload: &str);

    fn purchases_response(&self, payload: &str);

    fn product_details_response(&self, payload: &str);

    fn consume_response(&self, payload: &str);
}

/// Type alias for a shared bridge handle
pub type BoxedBillingBridge = Arc<dyn BillingBridge>;

/// Type alias for shared callback entry points
pub type BoxedBillingCallbacks = Arc<dyn BillingCallbacks>;

/// Whether a native bridge exists on this platform
#[derive(Clone)]
pub enum BridgeAvailability {
    Available(BoxedBillingBridge),
    Unavailable { platform: String },
}

impl BridgeAvailability {
    /// Use the injected bridge, or mark the current platform unavailable
    pub fn detect(bridge: Option<BoxedBillingBridge>) -> Self {
        match bridge {
            Some(bridge) => BridgeAvailability::Available(bridge),
            None => Self::unavailable(),
        }
    }

    /// Unavailable on the platform this binary was built for
    pub fn unavailable() -> Self {
        BridgeAvailability::Unavailable {
            platform: std::env::consts::OS.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, BridgeAvailability::Available(_))
    }

    pub fn bridge(&self) -> Option<&BoxedBillingBridge> {
        match self {
            BridgeAvailability::Available(bridge) => Some(bridge),
            BridgeAvailability::Unavailable { .. } => None,
        }
    }

    pub fn platform(&self) -> &str {
        match self {
            BridgeAvailability::Available(bridge) => bridge.platform_name(),
            BridgeAvailability::Unavailable { platform } => platform,
        }
    }
}

impl std::fmt::Debug for BridgeAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeAvailability::Available(bridge) => f
                .debug_tuple("Available")
                .field(&bridge.platform_name())
                .finish(),
            BridgeAvailability::Unavailable { platform } => f
                .debug_struct("Unavailable")
                .field("platform", platform)
                .finish(),
        }
    }
}
