//! # Billing Result
//!
//! Outcome code plus debug message, returned by every backend operation.

use serde::{Deserialize, Serialize};

/// Response codes reported by the billing backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    ServiceTimeout,
    FeatureNotSupported,
    ServiceDisconnected,
    Ok,
    UserCanceled,
    ServiceUnavailable,
    BillingUnavailable,
    ItemUnavailable,
    DeveloperError,
    Error,
    ItemAlreadyOwned,
    ItemNotOwned,
    NetworkError,
    /// Code outside the known enumeration (passthrough)
    Unknown(i32),
}

impl ResponseCode {
    /// Map a wire code to a response code
    pub fn from_code(code: i32) -> Self {
        match code {
            -3 => ResponseCode::ServiceTimeout,
            -2 => ResponseCode::FeatureNotSupported,
            -1 => ResponseCode::ServiceDisconnected,
            0 => ResponseCode::Ok,
            1 => ResponseCode::UserCanceled,
            2 => ResponseCode::ServiceUnavailable,
            3 => ResponseCode::BillingUnavailable,
            4 => ResponseCode::ItemUnavailable,
            5 => ResponseCode::DeveloperError,
            6 => ResponseCode::Error,
            7 => ResponseCode::ItemAlreadyOwned,
            8 => ResponseCode::ItemNotOwned,
            12 => ResponseCode::NetworkError,
            other => ResponseCode::Unknown(other),
        }
    }

    /// Wire value of this code
    pub fn code(&self) -> i32 {
        match self {
            ResponseCode::ServiceTimeout => -3,
            ResponseCode::FeatureNotSupported => -2,
            ResponseCode::ServiceDisconnected => -1,
            ResponseCode::Ok => 0,
            ResponseCode::UserCanceled => 1,
            ResponseCode::ServiceUnavailable => 2,
            ResponseCode::BillingUnavailable => 3,
            ResponseCode::ItemUnavailable => 4,
            ResponseCode::DeveloperError => 5,
            ResponseCode::Error => 6,
            ResponseCode::ItemAlreadyOwned => 7,
            ResponseCode::ItemNotOwned => 8,
            ResponseCode::NetworkError => 12,
            ResponseCode::Unknown(code) => *code,
        }
    }

}

impl From<ResponseCode> for i32 {
    fn from(code: ResponseCode) -> Self {
        code.code()
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseCode::Unknown(code) => write!(f, "UNKNOWN({})", code),
            other => write!(f, "{:?}({})", other, other.code()),
        }
    }
}

/// Outcome of a backend operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BillingResult {
    pub response_code: i32,

    /// Omitted by the bridge when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub debug_message: String,
}

impl BillingResult {
    pub fn new(code: ResponseCode, debug_message: impl Into<String>) -> Self {
        Self {
            response_code: code.code(),
            debug_message: debug_message.into(),
        }
    }

    /// Successful result with no message
    pub fn ok() -> Self {
        Self::new(ResponseCode::Ok, "")
    }

    /// Result carrying only a raw wire code
    pub fn from_code(response_code: i32) -> Self {
        Self {
            response_code,
            debug_message: String::new(),
        }
    }

    pub fn code(&self) -> ResponseCode {
        ResponseCode::from_code(self.response_code)
    }

    pub fn is_ok(&self) -> bool {
        self.code() == ResponseCode::Ok
    }
}

impl Default for BillingResult {
    fn default() -> Self {
        Self::ok()
    }
}

impl std::fmt::Display for BillingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.debug_message.is_empty() {
            write!(f, "{}", self.code())
        } else {
            write!(f, "{}: {}", self.code(), self.debug_message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_mapping() {
        for code in [-3, -2, -1, 0, 1, 2, 3, 4, 5, 6, 7, 8, 12] {
            assert_eq!(ResponseCode::from_code(code).code(), code);
        }
        assert_eq!(ResponseCode::from_code(42), ResponseCode::Unknown(42));
        assert_eq!(ResponseCode::from_code(9).code(), 9);
    }

    #[test]
    fn test_billing_result_wire_format() {
        let result = BillingResult::new(ResponseCode::Ok, "OK");
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"ResponseCode":0,"DebugMessage":"OK"}"#);

        let without_message = serde_json::to_string(&BillingResult::ok()).unwrap();
        assert_eq!(without_message, r#"{"ResponseCode":0}"#);
    }

    #[test]
    fn test_billing_result_missing_message() {
        let result: BillingResult = serde_json::from_str(r#"{"ResponseCode":7}"#).unwrap();
        assert_eq!(result.code(), ResponseCode::ItemAlreadyOwned);
        assert!(result.debug_message.is_empty());
        assert!(!result.is_ok());
    }

    #[test]
    fn test_display() {
        let result = BillingResult::new(ResponseCode::UserCanceled, "closed dialog");
        assert_eq!(result.to_string(), "UserCanceled(1): closed dialog");
        assert_eq!(ResponseCode::Unknown(99).to_string(), "UNKNOWN(99)");
    }
}
