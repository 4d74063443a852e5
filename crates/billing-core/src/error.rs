//! # Billing Error Types
//!
//! Typed error handling for billing-kit.
//! Builders and parsers return `Result<T, BillingError>`. Backend failures are
//! never errors: they arrive as data in a [`BillingResult`](crate::BillingResult).

use crate::response::PayloadKind;
use thiserror::Error;

/// Error category, grouping [`BillingError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A builder setter received an empty or illegal value
    InvalidArgument,
    /// `build()` was called before required fields were set
    IncompleteState,
    /// A bridge payload could not be parsed into the expected shape
    MalformedResponse,
    /// The platform has no native billing bridge
    BridgeUnavailable,
    /// Session configuration is missing or invalid
    Configuration,
}

/// Core error type for request construction and payload parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Setter received an empty/illegal value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Product list was empty
    #[error("Product list must not be empty")]
    EmptyProductList,

    /// The same product id appears more than once in a query
    #[error("Product id should not be repeated: {product_id}")]
    DuplicateProductId { product_id: String },

    /// Products of different types were mixed in one query
    #[error("All products must be of the same type: expected {expected}, found {found}")]
    MixedProductTypes { expected: String, found: String },

    /// Billing flow received more than one product
    #[error("Only one product is supported per billing flow, got {count}")]
    UnsupportedProductCount { count: usize },

    /// Build invoked before mandatory fields were set
    #[error("Incomplete request: {0}")]
    IncompleteState(String),

    /// Payload could not be parsed
    #[error("Malformed {kind} payload: {message}")]
    MalformedResponse { kind: PayloadKind, message: String },

    /// No native bridge on this platform
    #[error("Billing bridge unavailable on {platform}")]
    BridgeUnavailable { platform: String },

    /// Configuration errors (missing keys, invalid values)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BillingError {
    /// Create a malformed-response error for a payload kind
    pub fn malformed(kind: PayloadKind, message: impl Into<String>) -> Self {
        BillingError::MalformedResponse {
            kind,
            message: message.into(),
        }
    }

    /// Returns the category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            BillingError::InvalidArgument(_)
            | BillingError::EmptyProductList
            | BillingError::DuplicateProductId { .. }
            | BillingError::MixedProductTypes { .. }
            | BillingError::UnsupportedProductCount { .. } => ErrorKind::InvalidArgument,
            BillingError::IncompleteState(_) => ErrorKind::IncompleteState,
            BillingError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            BillingError::BridgeUnavailable { .. } => ErrorKind::BridgeUnavailable,
            BillingError::Configuration(_) => ErrorKind::Configuration,
        }
    }

}

/// Result type alias for builder and parser operations
pub type Result<T> = std::result::Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BillingError::EmptyProductList.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            BillingError::DuplicateProductId {
                product_id: "coin_100".into()
            }
            .kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            BillingError::IncompleteState("token".into()).kind(),
            ErrorKind::IncompleteState
        );
        assert_eq!(
            BillingError::malformed(PayloadKind::Consume, "eof").kind(),
            ErrorKind::MalformedResponse
        );
    }

    #[test]
    fn test_validation_messages_are_distinct() {
        let empty = BillingError::EmptyProductList.to_string();
        let duplicate = BillingError::DuplicateProductId {
            product_id: "coin_100".into(),
        }
        .to_string();
        let mixed = BillingError::MixedProductTypes {
            expected: "inapp".into(),
            found: "subs".into(),
        }
        .to_string();

        assert_ne!(empty, duplicate);
        assert_ne!(duplicate, mixed);
        assert_ne!(empty, mixed);
        assert!(duplicate.contains("coin_100"));
    }
}
