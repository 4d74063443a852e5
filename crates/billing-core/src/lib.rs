//! # Billing Core
//!
//! Platform-independent building blocks for the billing SDK facade.
//!
//! This crate provides:
//! - Result and value types (products, purchases, outcome codes)
//! - Validated request builders
//! - Pure response parsers for both payload shapes
//! - The [`BillingBridge`] / [`BillingCallbacks`] boundary traits
//!
//! It performs no I/O; the session and dispatcher live in `billing-client`.

pub mod billing_flow;
pub mod billing_result;
pub mod bridge;
pub mod consume;
pub mod error;
pub mod product;
pub mod purchase;
pub mod query_params;
pub mod response;

pub use billing_flow::{BillingFlowParams, BillingFlowParamsBuilder, ProductDetailsParams};
pub use billing_result::{BillingResult, ResponseCode};
pub use bridge::{
    BillingBridge, BillingCallbacks, BoxedBillingBridge, BoxedBillingCallbacks,
    BridgeAvailability,
};
pub use consume::ConsumeParams;
pub use error::{BillingError, ErrorKind, Result};
pub use product::{
    price_micros_to_units, OneTimePurchaseOfferDetails, Price, PricingPhase, PricingPhases,
    ProductDetails, ProductType, SubscriptionOfferDetails, TrialDetails, UnfetchedProduct,
    UnfetchedStatus,
};
pub use purchase::{AccountIdentifiers, Purchase, PurchaseState};
pub use query_params::{Product, QueryProductDetailsParams, QueryPurchasesParams};
pub use response::{
    ConsumeResult, PayloadKind, PayloadShape, ProductDetailsResult, PurchasesResult,
    ReferralDeeplinkResult, ResponseParser,
};
