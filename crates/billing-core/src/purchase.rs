//! # Purchase Types
//!
//! Purchases reported by the billing backend. A purchase is identified by its
//! purchase token, which is also the handle used for consumption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};

/// Purchase state as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PurchaseState {
    Purchased,
    Canceled,
    Pending,
    /// Code outside the known enumeration
    Unspecified(i32),
}

impl PurchaseState {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PurchaseState::Purchased,
            1 => PurchaseState::Canceled,
            2 => PurchaseState::Pending,
            other => PurchaseState::Unspecified(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            PurchaseState::Purchased => 0,
            PurchaseState::Canceled => 1,
            PurchaseState::Pending => 2,
            PurchaseState::Unspecified(code) => *code,
        }
    }
}

impl Default for PurchaseState {
    fn default() -> Self {
        PurchaseState::Purchased
    }
}

impl Serialize for PurchaseState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for PurchaseState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        i32::deserialize(deserializer).map(PurchaseState::from_code)
    }
}

/// Account identifiers attached at billing-flow launch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountIdentifiers {
    #[serde(default)]
    pub obfuscated_account_id: Option<String>,
}

/// A completed (or pending) purchase
///
/// Field names follow the bridge's PascalCase encoding. The legacy payload
/// shape carries camelCase records, decoded separately by the response parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Purchase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_identifiers: Option<AccountIdentifiers>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_payload: Option<String>,

    #[serde(default)]
    pub order_id: String,

    #[serde(default)]
    pub original_json: String,

    #[serde(default)]
    pub package_name: String,

    /// Product ids covered by this purchase, duplicates removed
    #[serde(default, deserialize_with = "deserialize_product_set")]
    pub products: Vec<String>,

    #[serde(default)]
    pub purchase_state: PurchaseState,

    /// Epoch milliseconds
    #[serde(default)]
    pub purchase_time: i64,

    pub purchase_token: String,

    #[serde(default)]
    pub signature: String,

    #[serde(default)]
    pub is_auto_renewing: bool,
}

pub(crate) fn deserialize_product_set<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    let mut products = Vec::with_capacity(raw.len());
    for product in raw {
        if !products.contains(&product) {
            products.push(product);
        }
    }
    Ok(products)
}

impl Purchase {
    /// Create a purchase with the given token and products
    pub fn new(purchase_token: impl Into<String>, products: Vec<String>) -> Self {
        Self {
            purchase_token: purchase_token.into(),
            products,
            ..Default::default()
        }
    }

    /// Check if the purchase covers a product
    pub fn contains_product(&self, product_id: &str) -> bool {
        self.products.iter().any(|p| p == product_id)
    }

    pub fn is_purchased(&self) -> bool {
        self.purchase_state == PurchaseState::Purchased
    }

    pub fn is_pending(&self) -> bool {
        self.purchase_state == PurchaseState::Pending
    }

    pub fn obfuscated_account_id(&self) -> Option<&str> {
        self.account_identifiers
            .as_ref()
            .and_then(|ids| ids.obfuscated_account_id.as_deref())
    }

    /// Purchase time as a UTC timestamp
    pub fn purchase_time_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.purchase_time)
    }
}

impl PartialEq for Purchase {
    fn eq(&self, other: &Self) -> bool {
        self.purchase_token == other.purchase_token
    }
}

impl Eq for Purchase {}

impl Hash for Purchase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.purchase_token.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_purchase_state_codes() {
        assert_eq!(PurchaseState::from_code(0), PurchaseState::Purchased);
        assert_eq!(PurchaseState::from_code(2), PurchaseState::Pending);
        assert_eq!(PurchaseState::from_code(9), PurchaseState::Unspecified(9));
        assert_eq!(
            serde_json::to_string(&PurchaseState::Canceled).unwrap(),
            "1"
        );
    }

    #[test]
    fn test_parse_current_purchase() {
        let json = r#"{
            "AccountIdentifiers": {"ObfuscatedAccountId": "acc-42"},
            "OrderId": "order-1",
            "OriginalJson": "{}",
            "PackageName": "com.example.game",
            "Products": ["coin_100", "coin_100"],
            "PurchaseState": 0,
            "PurchaseTime": 1700000000000,
            "PurchaseToken": "token-abc",
            "Signature": "sig",
            "IsAutoRenewing": false
        }"#;

        let purchase: Purchase = serde_json::from_str(json).unwrap();
        assert_eq!(purchase.purchase_token, "token-abc");
        assert_eq!(purchase.products, vec!["coin_100"]);
        assert_eq!(purchase.obfuscated_account_id(), Some("acc-42"));
        assert!(purchase.is_purchased());
        assert!(purchase.developer_payload.is_none());
        assert_eq!(
            purchase.purchase_time_utc().unwrap().timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn test_camel_case_keys_are_rejected() {
        let json = r#"{"orderId": "order-2", "products": ["sub_gold"], "purchaseToken": "token-legacy"}"#;
        assert!(serde_json::from_str::<Purchase>(json).is_err());
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let json = r#"{"OrderId": "order-3", "Products": []}"#;
        assert!(serde_json::from_str::<Purchase>(json).is_err());
    }

    #[test]
    fn test_identity_is_token() {
        let a = Purchase::new("token-1", vec!["coin_100".to_string()]);
        let mut b = Purchase::new("token-1", vec!["coin_500".to_string()]);
        b.order_id = "other".to_string();
        let c = Purchase::new("token-2", vec!["coin_100".to_string()]);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Purchase> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
