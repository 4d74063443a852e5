//! # Product Types
//!
//! Product details as returned by a product-details query.
//! Prices are carried in micro-units, in up to three currency denominations
//! (store currency, APPC, and fiat).

use crate::error::{BillingError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Product type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    /// One-time purchase (consumable or not)
    #[serde(rename = "inapp")]
    InApp,
    /// Recurring subscription
    #[serde(rename = "subs")]
    Subs,
}

impl ProductType {
    /// Returns the wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::InApp => "inapp",
            ProductType::Subs => "subs",
        }
    }
}

impl FromStr for ProductType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "inapp" => Ok(ProductType::InApp),
            "subs" => Ok(ProductType::Subs),
            "" => Err(BillingError::InvalidArgument(
                "Product type must be provided.".to_string(),
            )),
            other => Err(BillingError::InvalidArgument(format!(
                "Unknown product type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a micro-unit amount to whole currency units
pub fn price_micros_to_units(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

/// A single price in one denomination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price<'a> {
    /// Amount in micro-units (1/1,000,000 of the currency unit)
    pub amount_micros: i64,
    /// ISO 4217 code, or "APPC"
    pub currency_code: &'a str,
    /// Backend-formatted display string
    pub formatted: &'a str,
}

impl Price<'_> {
    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        price_micros_to_units(self.amount_micros)
    }

    /// Format for display, preferring the backend's formatting
    pub fn display(&self) -> String {
        if self.formatted.is_empty() {
            format!("{:.2} {}", self.as_decimal(), self.currency_code)
        } else {
            self.formatted.to_string()
        }
    }
}

/// Pricing of a one-time purchase product
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OneTimePurchaseOfferDetails {
    pub formatted_price: String,
    pub price_amount_micros: i64,
    pub price_currency_code: String,
    pub appc_formatted_price: String,
    pub appc_price_amount_micros: i64,
    pub appc_price_currency_code: String,
    pub fiat_formatted_price: String,
    pub fiat_price_amount_micros: i64,
    pub fiat_price_currency_code: String,
}

impl OneTimePurchaseOfferDetails {
    pub fn price(&self) -> Price<'_> {
        Price {
            amount_micros: self.price_amount_micros,
            currency_code: &self.price_currency_code,
            formatted: &self.formatted_price,
        }
    }

    pub fn appc_price(&self) -> Price<'_> {
        Price {
            amount_micros: self.appc_price_amount_micros,
            currency_code: &self.appc_price_currency_code,
            formatted: &self.appc_formatted_price,
        }
    }

    pub fn fiat_price(&self) -> Price<'_> {
        Price {
            amount_micros: self.fiat_price_amount_micros,
            currency_code: &self.fiat_price_currency_code,
            formatted: &self.fiat_formatted_price,
        }
    }
}

/// One phase of a subscription offer (e.g. trial, intro, recurring)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PricingPhase {
    /// ISO 8601 period, e.g. "P1M"
    pub billing_period: String,
    pub formatted_price: String,
    pub price_amount_micros: i64,
    pub price_currency_code: String,
    pub appc_formatted_price: String,
    pub appc_price_amount_micros: i64,
    pub appc_price_currency_code: String,
    pub fiat_formatted_price: String,
    pub fiat_price_amount_micros: i64,
    pub fiat_price_currency_code: String,
}

impl PricingPhase {
    pub fn price(&self) -> Price<'_> {
        Price {
            amount_micros: self.price_amount_micros,
            currency_code: &self.price_currency_code,
            formatted: &self.formatted_price,
        }
    }

    pub fn appc_price(&self) -> Price<'_> {
        Price {
            amount_micros: self.appc_price_amount_micros,
            currency_code: &self.appc_price_currency_code,
            formatted: &self.appc_formatted_price,
        }
    }

    pub fn fiat_price(&self) -> Price<'_> {
        Price {
            amount_micros: self.fiat_price_amount_micros,
            currency_code: &self.fiat_price_currency_code,
            formatted: &self.fiat_formatted_price,
        }
    }

    /// A zero-priced phase is a free trial window
    pub fn is_free(&self) -> bool {
        self.price_amount_micros == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PricingPhases {
    pub pricing_phase_list: Vec<PricingPhase>,
}

/// Free trial window attached to a subscription offer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TrialDetails {
    pub period: String,
    pub period_end_date: String,
}

/// A subscription offer: ordered pricing phases plus an optional trial
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriptionOfferDetails {
    #[serde(default)]
    pub pricing_phases: PricingPhases,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_details: Option<TrialDetails>,
}

impl SubscriptionOfferDetails {
    /// Pricing phases in billing order
    pub fn phases(&self) -> &[PricingPhase] {
        &self.pricing_phases.pricing_phase_list
    }

    /// The phase billed after any intro/trial phases
    pub fn recurring_phase(&self) -> Option<&PricingPhase> {
        self.phases().last()
    }

    pub fn has_trial(&self) -> bool {
        self.trial_details.is_some()
    }
}

/// A product resolved by the billing backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductDetails {
    pub product_id: String,

    pub product_type: ProductType,

    pub title: String,

    /// Omitted by the bridge when the backend has none
    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_time_purchase_offer_details: Option<OneTimePurchaseOfferDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_offer_details: Option<Vec<SubscriptionOfferDetails>>,
}

impl ProductDetails {
    /// Create a one-time purchase product
    pub fn one_time(
        product_id: impl Into<String>,
        title: impl Into<String>,
        offer: OneTimePurchaseOfferDetails,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_type: ProductType::InApp,
            title: title.into(),
            description: String::new(),
            one_time_purchase_offer_details: Some(offer),
            subscription_offer_details: None,
        }
    }

    /// Create a subscription product
    pub fn subscription(
        product_id: impl Into<String>,
        title: impl Into<String>,
        offers: Vec<SubscriptionOfferDetails>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_type: ProductType::Subs,
            title: title.into(),
            description: String::new(),
            one_time_purchase_offer_details: None,
            subscription_offer_details: Some(offers),
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn is_subscription(&self) -> bool {
        self.product_type == ProductType::Subs
    }

    /// Subscription offers, empty for one-time products
    pub fn offers(&self) -> &[SubscriptionOfferDetails] {
        self.subscription_offer_details.as_deref().unwrap_or(&[])
    }
}

/// Status of a product the backend could not resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnfetchedStatus {
    Unknown,
    ProductNotFound,
    Other(i32),
}

impl UnfetchedStatus {
    pub const UNKNOWN: i32 = 0;
    pub const PRODUCT_NOT_FOUND: i32 = 3;

    pub fn from_code(code: i32) -> Self {
        match code {
            Self::UNKNOWN => UnfetchedStatus::Unknown,
            Self::PRODUCT_NOT_FOUND => UnfetchedStatus::ProductNotFound,
            other => UnfetchedStatus::Other(other),
        }
    }
}

/// A requested product the backend could not resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnfetchedProduct {
    pub product_id: String,
    pub product_type: ProductType,
    #[serde(default)]
    pub status_code: i32,
}

impl UnfetchedProduct {
    pub fn status(&self) -> UnfetchedStatus {
        UnfetchedStatus::from_code(self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin_offer() -> OneTimePurchaseOfferDetails {
        OneTimePurchaseOfferDetails {
            formatted_price: "€0.99".to_string(),
            price_amount_micros: 990_000,
            price_currency_code: "EUR".to_string(),
            appc_formatted_price: "9.5 APPC".to_string(),
            appc_price_amount_micros: 9_500_000,
            appc_price_currency_code: "APPC".to_string(),
            fiat_formatted_price: "€0.99".to_string(),
            fiat_price_amount_micros: 990_000,
            fiat_price_currency_code: "EUR".to_string(),
        }
    }

    #[test]
    fn test_product_type_parse() {
        assert_eq!("inapp".parse::<ProductType>().unwrap(), ProductType::InApp);
        assert_eq!("subs".parse::<ProductType>().unwrap(), ProductType::Subs);
        assert!("".parse::<ProductType>().is_err());
        assert!("INAPP".parse::<ProductType>().is_err());
        assert_eq!(ProductType::Subs.to_string(), "subs");
    }

    #[test]
    fn test_price_denominations() {
        let offer = coin_offer();
        assert_eq!(offer.price().as_decimal(), 0.99);
        assert_eq!(offer.appc_price().currency_code, "APPC");
        assert_eq!(offer.appc_price().as_decimal(), 9.5);
        assert_eq!(offer.fiat_price().display(), "€0.99");
    }

    #[test]
    fn test_price_display_fallback() {
        let price = Price {
            amount_micros: 4_990_000,
            currency_code: "USD",
            formatted: "",
        };
        assert_eq!(price.display(), "4.99 USD");
    }

    #[test]
    fn test_parse_one_time_product() {
        let json = r#"{
            "ProductId": "coin_100",
            "ProductType": "inapp",
            "Title": "100 Coins",
            "OneTimePurchaseOfferDetails": {
                "FormattedPrice": "€0.99",
                "PriceAmountMicros": 990000,
                "PriceCurrencyCode": "EUR"
            }
        }"#;

        let product: ProductDetails = serde_json::from_str(json).unwrap();
        assert_eq!(product.product_id, "coin_100");
        assert_eq!(product.product_type, ProductType::InApp);
        assert!(product.description.is_empty());
        assert!(!product.is_subscription());
        let offer = product.one_time_purchase_offer_details.unwrap();
        assert_eq!(offer.price_amount_micros, 990_000);
        assert_eq!(offer.appc_price_amount_micros, 0);
        assert!(product.subscription_offer_details.is_none());
    }

    #[test]
    fn test_parse_subscription_product() {
        let json = r#"{
            "ProductId": "sub_gold",
            "ProductType": "subs",
            "Title": "Gold",
            "Description": "Gold membership",
            "SubscriptionOfferDetails": [{
                "PricingPhases": {
                    "PricingPhaseList": [
                        {"BillingPeriod": "P1W", "FormattedPrice": "Free", "PriceAmountMicros": 0, "PriceCurrencyCode": "USD"},
                        {"BillingPeriod": "P1M", "FormattedPrice": "$4.99", "PriceAmountMicros": 4990000, "PriceCurrencyCode": "USD"}
                    ]
                },
                "TrialDetails": {"Period": "P1W", "PeriodEndDate": "2026-11-01"}
            }]
        }"#;

        let product: ProductDetails = serde_json::from_str(json).unwrap();
        assert!(product.is_subscription());
        let offer = &product.offers()[0];
        assert_eq!(offer.phases().len(), 2);
        assert!(offer.phases()[0].is_free());
        assert_eq!(offer.recurring_phase().unwrap().billing_period, "P1M");
        assert_eq!(offer.trial_details.as_ref().unwrap().period, "P1W");
    }

    #[test]
    fn test_unknown_product_type_rejected() {
        let json = r#"{"ProductId": "x", "ProductType": "bundle", "Title": "X"}"#;
        assert!(serde_json::from_str::<ProductDetails>(json).is_err());
    }

    #[test]
    fn test_unfetched_status() {
        let missing = UnfetchedProduct {
            product_id: "gone".to_string(),
            product_type: ProductType::InApp,
            status_code: 3,
        };
        assert_eq!(missing.status(), UnfetchedStatus::ProductNotFound);
        assert_eq!(UnfetchedStatus::from_code(0), UnfetchedStatus::Unknown);
        assert_eq!(UnfetchedStatus::from_code(5), UnfetchedStatus::Other(5));
    }

    #[test]
    fn test_product_builder() {
        let product = ProductDetails::one_time("coin_100", "100 Coins", coin_offer())
            .with_description("A pile of coins");

        assert_eq!(product.description, "A pile of coins");
        assert!(product.offers().is_empty());
    }
}
