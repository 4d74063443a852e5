//! # Billing Client
//!
//! Session layer of billing-kit: owns the bridge handle, tracks the
//! connection, and routes bridge callbacks to typed listeners.
//!
//! ## Example
//!
//! ```rust,ignore
//! use billing_client::{BillingSession, Listeners, SessionConfig};
//! use billing_core::BridgeAvailability;
//!
//! let session = BillingSession::new(SessionConfig::from_env()?, BridgeAvailability::detect(bridge));
//! session.start(
//!     Listeners::new()
//!         .on_connection(|event| println!("{:?}", event))
//!         .on_purchases_updated(|result| println!("{} purchases", result.purchases.len())),
//! );
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod listeners;
pub mod session;

pub use config::{SessionConfig, DEFAULT_LISTENER_NAME};
pub use connection::{ConnectionState, ConnectionTracker, Transition};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use listeners::{ConnectionEvent, Listener, ListenerCategory, ListenerRegistry, Listeners, Slot};
pub use session::BillingSession;
