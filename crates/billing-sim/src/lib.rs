//! # Billing Sim
//!
//! Loopback billing bridge for tests and local demos. Every outbound call is
//! answered from an in-memory product catalog; no network, no persistence.

pub mod catalog;
pub mod loopback;

pub use catalog::{CatalogProduct, ProductCatalog};
pub use loopback::{LoopbackBridge, LoopbackOptions};
