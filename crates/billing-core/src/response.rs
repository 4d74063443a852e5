//! # Response Parsing
//!
//! Pure parsers turning serialized bridge payloads into typed results.
//!
//! Two historical shapes exist for purchase-related payloads:
//!
//! ```text
//! Current: {"BillingResult": {"ResponseCode": 0, "DebugMessage": "..."}, "Purchases": [...]}
//! Legacy:  {"responseCode": 0, "purchases": [...]}
//! ```
//!
//! The shape is chosen once per session through [`PayloadShape`] and is never
//! inferred from a payload. Parse failures are returned as
//! [`BillingError::MalformedResponse`]; callers decide whether to drop them.

use crate::billing_result::BillingResult;
use crate::error::{BillingError, Result};
use crate::product::{ProductDetails, UnfetchedProduct};
use crate::purchase::{AccountIdentifiers, Purchase, PurchaseState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Payload encoding in force for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadShape {
    /// Structured `BillingResult` objects, PascalCase keys
    #[default]
    Current,
    /// Bare numeric response codes, camelCase keys (compatibility mode)
    Legacy,
}

impl PayloadShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadShape::Current => "current",
            PayloadShape::Legacy => "legacy",
        }
    }

    /// Encode a bare billing result (setup-finished and immediate results)
    pub fn encode_billing_result(&self, result: &BillingResult) -> String {
        match self {
            PayloadShape::Current => to_payload(result),
            PayloadShape::Legacy => result.response_code.to_string(),
        }
    }

    pub fn encode_purchases(&self, result: &PurchasesResult) -> String {
        match self {
            PayloadShape::Current => to_payload(result),
            PayloadShape::Legacy => to_payload(&LegacyPurchasesPayload {
                response_code: result.billing_result.response_code,
                purchases: result.purchases.iter().cloned().map(LegacyPurchase::from).collect(),
            }),
        }
    }

    pub fn encode_consume(&self, result: &ConsumeResult) -> String {
        match self {
            PayloadShape::Current => to_payload(result),
            PayloadShape::Legacy => to_payload(&LegacyConsumePayload {
                response_code: result.billing_result.response_code,
                purchase_token: result.purchase_token.clone(),
            }),
        }
    }

    /// Product details share one encoding across shapes
    pub fn encode_product_details(&self, result: &ProductDetailsResult) -> String {
        to_payload(result)
    }

    pub fn encode_referral_deeplink(&self, result: &ReferralDeeplinkResult) -> String {
        to_payload(result)
    }
}

impl std::str::FromStr for PayloadShape {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(PayloadShape::Current),
            "legacy" => Ok(PayloadShape::Legacy),
            other => Err(BillingError::Configuration(format!(
                "Unknown payload shape: {} (expected current or legacy)",
                other
            ))),
        }
    }
}

// Serialization of these types cannot fail; "{}" matches the bridge's own fallback.
fn to_payload<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

/// Tag naming which result a payload should parse into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    BillingSetup,
    BillingResult,
    PurchasesUpdated,
    PurchasesResponse,
    ProductDetails,
    Consume,
    ReferralDeeplink,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::BillingSetup => "billing-setup",
            PayloadKind::BillingResult => "billing-result",
            PayloadKind::PurchasesUpdated => "purchases-updated",
            PayloadKind::PurchasesResponse => "purchases-response",
            PayloadKind::ProductDetails => "product-details",
            PayloadKind::Consume => "consume",
            PayloadKind::ReferralDeeplink => "referral-deeplink",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchases delivered by purchases-updated, purchases-query, and the legacy synchronous query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PurchasesResult {
    pub billing_result: BillingResult,
    #[serde(default)]
    pub purchases: Vec<Purchase>,
}

impl PurchasesResult {
    pub fn new(billing_result: BillingResult, purchases: Vec<Purchase>) -> Self {
        Self {
            billing_result,
            purchases,
        }
    }

    /// Find a purchase by token
    pub fn find(&self, purchase_token: &str) -> Option<&Purchase> {
        self.purchases
            .iter()
            .find(|p| p.purchase_token == purchase_token)
    }
}

/// Outcome of a product-details query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProductDetailsPayload", into = "ProductDetailsPayload")]
pub struct ProductDetailsResult {
    pub billing_result: BillingResult,
    pub product_details: Vec<ProductDetails>,
    pub unfetched_products: Vec<UnfetchedProduct>,
}

impl ProductDetailsResult {
    /// Find resolved details by product id
    pub fn get(&self, product_id: &str) -> Option<&ProductDetails> {
        self.product_details
            .iter()
            .find(|p| p.product_id == product_id)
    }
}

/// Outcome of a consume request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConsumeResult {
    pub billing_result: BillingResult,
    #[serde(default)]
    pub purchase_token: String,
}

/// Referral links for the current user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReferralDeeplinkResult {
    pub billing_result: BillingResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_deeplink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_deeplink: Option<String>,
}

impl ReferralDeeplinkResult {
    /// Store link if present, else the fallback link
    pub fn deeplink(&self) -> Option<&str> {
        self.store_deeplink
            .as_deref()
            .or(self.fallback_deeplink.as_deref())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProductDetailsPayload {
    billing_result: BillingResult,
    #[serde(default)]
    product_details_result: ProductDetailsLists,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProductDetailsLists {
    #[serde(default)]
    product_details_list: Vec<ProductDetails>,
    #[serde(default)]
    unfetched_product_list: Vec<UnfetchedProduct>,
}

impl From<ProductDetailsPayload> for ProductDetailsResult {
    fn from(payload: ProductDetailsPayload) -> Self {
        Self {
            billing_result: payload.billing_result,
            product_details: payload.product_details_result.product_details_list,
            unfetched_products: payload.product_details_result.unfetched_product_list,
        }
    }
}

impl From<ProductDetailsResult> for ProductDetailsPayload {
    fn from(result: ProductDetailsResult) -> Self {
        Self {
            billing_result: result.billing_result,
            product_details_result: ProductDetailsLists {
                product_details_list: result.product_details,
                unfetched_product_list: result.unfetched_products,
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPurchasesPayload {
    response_code: i32,
    #[serde(default)]
    purchases: Vec<LegacyPurchase>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPurchase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account_identifiers: Option<LegacyAccountIdentifiers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    developer_payload: Option<String>,
    #[serde(default)]
    order_id: String,
    #[serde(default)]
    original_json: String,
    #[serde(default)]
    package_name: String,
    #[serde(default, deserialize_with = "crate::purchase::deserialize_product_set")]
    products: Vec<String>,
    #[serde(default)]
    purchase_state: PurchaseState,
    #[serde(default)]
    purchase_time: i64,
    purchase_token: String,
    #[serde(default)]
    signature: String,
    #[serde(default)]
    is_auto_renewing: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAccountIdentifiers {
    #[serde(default)]
    obfuscated_account_id: Option<String>,
}

impl From<Purchase> for LegacyPurchase {
    fn from(purchase: Purchase) -> Self {
        Self {
            account_identifiers: purchase.account_identifiers.map(|ids| LegacyAccountIdentifiers {
                obfuscated_account_id: ids.obfuscated_account_id,
            }),
            developer_payload: purchase.developer_payload,
            order_id: purchase.order_id,
            original_json: purchase.original_json,
            package_name: purchase.package_name,
            products: purchase.products,
            purchase_state: purchase.purchase_state,
            purchase_time: purchase.purchase_time,
            purchase_token: purchase.purchase_token,
            signature: purchase.signature,
            is_auto_renewing: purchase.is_auto_renewing,
        }
    }
}

impl From<LegacyPurchase> for Purchase {
    fn from(legacy: LegacyPurchase) -> Self {
        Self {
            account_identifiers: legacy.account_identifiers.map(|ids| AccountIdentifiers {
                obfuscated_account_id: ids.obfuscated_account_id,
            }),
            developer_payload: legacy.developer_payload,
            order_id: legacy.order_id,
            original_json: legacy.original_json,
            package_name: legacy.package_name,
            products: legacy.products,
            purchase_state: legacy.purchase_state,
            purchase_time: legacy.purchase_time,
            purchase_token: legacy.purchase_token,
            signature: legacy.signature,
            is_auto_renewing: legacy.is_auto_renewing,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyConsumePayload {
    response_code: i32,
    #[serde(default)]
    purchase_token: String,
}

/// Parser bound to one payload shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseParser {
    shape: PayloadShape,
}

impl ResponseParser {
    pub fn new(shape: PayloadShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> PayloadShape {
        self.shape
    }

    /// Immediate result of launch-flow and feature-support calls
    pub fn billing_result(&self, payload: &str) -> Result<BillingResult> {
        self.parse_billing_result(PayloadKind::BillingResult, payload)
    }

    pub fn setup_finished(&self, payload: &str) -> Result<BillingResult> {
        self.parse_billing_result(PayloadKind::BillingSetup, payload)
    }

    pub fn purchases(&self, kind: PayloadKind, payload: &str) -> Result<PurchasesResult> {
        match self.shape {
            PayloadShape::Current => json(kind, payload),
            PayloadShape::Legacy => {
                let legacy: LegacyPurchasesPayload = json(kind, payload)?;
                Ok(PurchasesResult {
                    billing_result: BillingResult::from_code(legacy.response_code),
                    purchases: legacy.purchases.into_iter().map(Purchase::from).collect(),
                })
            }
        }
    }

    pub fn product_details(&self, payload: &str) -> Result<ProductDetailsResult> {
        json(PayloadKind::ProductDetails, payload)
    }

    pub fn consume(&self, payload: &str) -> Result<ConsumeResult> {
        match self.shape {
            PayloadShape::Current => json(PayloadKind::Consume, payload),
            PayloadShape::Legacy => {
                let legacy: LegacyConsumePayload = json(PayloadKind::Consume, payload)?;
                Ok(ConsumeResult {
                    billing_result: BillingResult::from_code(legacy.response_code),
                    purchase_token: legacy.purchase_token,
                })
            }
        }
    }

    pub fn referral_deeplink(&self, payload: &str) -> Result<ReferralDeeplinkResult> {
        json(PayloadKind::ReferralDeeplink, payload)
    }

    fn parse_billing_result(&self, kind: PayloadKind, payload: &str) -> Result<BillingResult> {
        match self.shape {
            PayloadShape::Current => json(kind, payload),
            PayloadShape::Legacy => payload
                .trim()
                .parse::<i32>()
                .map(BillingResult::from_code)
                .map_err(|e| {
                    BillingError::malformed(kind, format!("expected a numeric response code: {}", e))
                }),
        }
    }
}

fn json<T: DeserializeOwned>(kind: PayloadKind, payload: &str) -> Result<T> {
    if payload.trim().is_empty() {
        return Err(BillingError::malformed(kind, "empty payload"));
    }
    serde_json::from_str(payload).map_err(|e| BillingError::malformed(kind, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing_result::ResponseCode;
    use crate::error::ErrorKind;
    use crate::product::{ProductType, UnfetchedStatus};

    const CURRENT_PURCHASES: &str = r#"{
        "BillingResult": {"ResponseCode": 0, "DebugMessage": "OK"},
        "Purchases": [{
            "OrderId": "order-1",
            "PackageName": "com.example.game",
            "Products": ["coin_100"],
            "PurchaseState": 0,
            "PurchaseTime": 1700000000000,
            "PurchaseToken": "token-abc",
            "Signature": "sig",
            "IsAutoRenewing": false
        }]
    }"#;

    const PRODUCT_DETAILS: &str = r#"{
        "BillingResult": {"ResponseCode": 0},
        "ProductDetailsResult": {
            "ProductDetailsList": [{
                "ProductId": "coin_100",
                "ProductType": "inapp",
                "Title": "100 Coins",
                "OneTimePurchaseOfferDetails": {"FormattedPrice": "€0.99", "PriceAmountMicros": 990000, "PriceCurrencyCode": "EUR"}
            }],
            "UnfetchedProductList": [
                {"ProductId": "coin_999", "ProductType": "inapp", "StatusCode": 3}
            ]
        }
    }"#;

    #[test]
    fn test_billing_result_round_trip() {
        let parser = ResponseParser::new(PayloadShape::Current);
        let original = BillingResult::new(ResponseCode::Ok, "OK");

        let payload = PayloadShape::Current.encode_billing_result(&original);
        let parsed = parser.billing_result(&payload).unwrap();

        assert_eq!(parsed, original);
    }

    #[test]
    fn test_legacy_billing_result() {
        let parser = ResponseParser::new(PayloadShape::Legacy);
        let parsed = parser.setup_finished("3").unwrap();
        assert_eq!(parsed.code(), ResponseCode::BillingUnavailable);

        let err = parser
            .setup_finished(r#"{"ResponseCode": 0}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_current_purchases() {
        let parser = ResponseParser::new(PayloadShape::Current);
        let result = parser
            .purchases(PayloadKind::PurchasesUpdated, CURRENT_PURCHASES)
            .unwrap();

        assert!(result.billing_result.is_ok());
        assert_eq!(result.billing_result.debug_message, "OK");
        assert_eq!(result.purchases.len(), 1);
        assert!(result.find("token-abc").is_some());
    }

    #[test]
    fn test_legacy_purchases() {
        let parser = ResponseParser::new(PayloadShape::Legacy);
        let payload = r#"{"responseCode": 1, "purchases": [{"purchaseToken": "t-1", "products": ["coin_100"]}]}"#;
        let result = parser
            .purchases(PayloadKind::PurchasesUpdated, payload)
            .unwrap();

        assert_eq!(result.billing_result.code(), ResponseCode::UserCanceled);
        assert_eq!(result.purchases[0].purchase_token, "t-1");
    }

    #[test]
    fn test_legacy_purchase_record_fields() {
        let parser = ResponseParser::new(PayloadShape::Legacy);
        let payload = r#"{"responseCode": 0, "purchases": [{
            "accountIdentifiers": {"obfuscatedAccountId": "acc-7"},
            "orderId": "order-2",
            "packageName": "com.example.game",
            "products": ["sub_gold", "sub_gold"],
            "purchaseState": 2,
            "purchaseTime": 1700000000000,
            "purchaseToken": "token-legacy",
            "isAutoRenewing": true
        }]}"#;
        let result = parser
            .purchases(PayloadKind::PurchasesResponse, payload)
            .unwrap();

        let purchase = &result.purchases[0];
        assert_eq!(purchase.order_id, "order-2");
        assert_eq!(purchase.products, vec!["sub_gold"]);
        assert_eq!(purchase.obfuscated_account_id(), Some("acc-7"));
        assert!(purchase.is_pending());
        assert!(purchase.is_auto_renewing);
    }

    #[test]
    fn test_purchase_record_keys_follow_shape() {
        let legacy = ResponseParser::new(PayloadShape::Legacy);
        let err = legacy
            .purchases(
                PayloadKind::PurchasesUpdated,
                r#"{"responseCode": 0, "purchases": [{"PurchaseToken": "t"}]}"#,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        let current = ResponseParser::new(PayloadShape::Current);
        let err = current
            .purchases(
                PayloadKind::PurchasesUpdated,
                r#"{"BillingResult": {"ResponseCode": 0}, "Purchases": [{"purchaseToken": "t"}]}"#,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_shape_is_not_inferred() {
        let legacy = ResponseParser::new(PayloadShape::Legacy);
        let err = legacy
            .purchases(PayloadKind::PurchasesResponse, CURRENT_PURCHASES)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        let current = ResponseParser::new(PayloadShape::Current);
        let err = current
            .purchases(PayloadKind::PurchasesResponse, r#"{"responseCode": 0, "purchases": []}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_product_details() {
        let parser = ResponseParser::default();
        let result = parser.product_details(PRODUCT_DETAILS).unwrap();

        assert_eq!(result.product_details.len(), 1);
        assert_eq!(result.get("coin_100").unwrap().product_type, ProductType::InApp);
        assert_eq!(
            result.unfetched_products[0].status(),
            UnfetchedStatus::ProductNotFound
        );
    }

    #[test]
    fn test_product_details_missing_lists() {
        let parser = ResponseParser::default();
        let result = parser
            .product_details(r#"{"BillingResult": {"ResponseCode": 6, "DebugMessage": "boom"}}"#)
            .unwrap();

        assert_eq!(result.billing_result.code(), ResponseCode::Error);
        assert!(result.product_details.is_empty());
        assert!(result.unfetched_products.is_empty());
    }

    #[test]
    fn test_consume_shapes() {
        let current = ResponseParser::new(PayloadShape::Current)
            .consume(r#"{"BillingResult": {"ResponseCode": 0}, "PurchaseToken": "token-abc"}"#)
            .unwrap();
        assert_eq!(current.purchase_token, "token-abc");

        let legacy = ResponseParser::new(PayloadShape::Legacy)
            .consume(r#"{"responseCode": 8, "purchaseToken": "token-abc"}"#)
            .unwrap();
        assert_eq!(legacy.billing_result.code(), ResponseCode::ItemNotOwned);
        assert_eq!(legacy.purchase_token, "token-abc");
    }

    #[test]
    fn test_referral_deeplink() {
        let parser = ResponseParser::default();
        let result = parser
            .referral_deeplink(
                r#"{"BillingResult": {"ResponseCode": 0}, "FallbackDeeplink": "https://example.com/r/abc"}"#,
            )
            .unwrap();
        assert_eq!(result.deeplink(), Some("https://example.com/r/abc"));
    }

    #[test]
    fn test_bridge_fallback_payloads_are_malformed() {
        let parser = ResponseParser::default();
        for payload in ["", "   ", "{}", "not json"] {
            let results = [
                (PayloadKind::BillingSetup, parser.setup_finished(payload).err()),
                (
                    PayloadKind::PurchasesUpdated,
                    parser.purchases(PayloadKind::PurchasesUpdated, payload).err(),
                ),
                (PayloadKind::ProductDetails, parser.product_details(payload).err()),
                (PayloadKind::Consume, parser.consume(payload).err()),
                (PayloadKind::ReferralDeeplink, parser.referral_deeplink(payload).err()),
            ];
            for (kind, err) in results {
                assert!(
                    matches!(err, Some(BillingError::MalformedResponse { kind: k, .. }) if k == kind),
                    "{} accepted {:?}",
                    kind,
                    payload
                );
            }
        }
    }

    #[test]
    fn test_encoders_match_parsers() {
        let purchases = PurchasesResult::new(
            BillingResult::new(ResponseCode::ItemAlreadyOwned, "owned"),
            vec![Purchase::new("token-1", vec!["coin_100".to_string()])],
        );

        for shape in [PayloadShape::Current, PayloadShape::Legacy] {
            let parser = ResponseParser::new(shape);
            let parsed = parser
                .purchases(PayloadKind::PurchasesResponse, &shape.encode_purchases(&purchases))
                .unwrap();
            assert_eq!(parsed.billing_result.code(), ResponseCode::ItemAlreadyOwned);
            assert_eq!(parsed.purchases, purchases.purchases);
        }

        let legacy = PayloadShape::Legacy.encode_purchases(&purchases);
        assert!(legacy.starts_with(r#"{"responseCode":7"#));
        assert!(legacy.contains(r#""purchaseToken":"token-1""#));
        assert!(!legacy.contains("PurchaseToken"));
    }

    #[test]
    fn test_payload_shape_from_str() {
        assert_eq!("Legacy".parse::<PayloadShape>().unwrap(), PayloadShape::Legacy);
        assert_eq!(" current ".parse::<PayloadShape>().unwrap(), PayloadShape::Current);
        assert!("v2".parse::<PayloadShape>().is_err());
    }
}
