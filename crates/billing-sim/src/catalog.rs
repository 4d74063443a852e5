//! # Product Catalog
//!
//! Products served by the loopback bridge, loaded from TOML.
//!
//! ```toml
//! [[products]]
//! id = "coin_100"
//! product_type = "inapp"
//! title = "100 Coins"
//! price_micros = 990000
//! currency = "EUR"
//! ```

use billing_core::{
    OneTimePurchaseOfferDetails, PricingPhase, PricingPhases, ProductDetails, ProductType,
    SubscriptionOfferDetails, TrialDetails,
};
use serde::{Deserialize, Serialize};

/// Formatted display string for a micro-unit amount
fn format_price(micros: i64, currency: &str) -> String {
    format!(
        "{:.2} {}",
        billing_core::price_micros_to_units(micros),
        currency
    )
}

/// A product as configured for the loopback bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub product_type: ProductType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Store-currency price in micro-units
    pub price_micros: i64,
    pub currency: String,
    /// APPC price in micro-units
    #[serde(default)]
    pub appc_price_micros: i64,
    /// ISO 8601 billing period, subscriptions only
    #[serde(default)]
    pub billing_period: Option<String>,
    /// ISO 8601 free trial period, subscriptions only
    #[serde(default)]
    pub trial_period: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CatalogProduct {
    /// Product details as the backend would report them
    pub fn to_details(&self) -> ProductDetails {
        let details = match self.product_type {
            ProductType::InApp => {
                ProductDetails::one_time(&self.id, &self.title, self.one_time_offer())
            }
            ProductType::Subs => {
                ProductDetails::subscription(&self.id, &self.title, vec![self.subscription_offer()])
            }
        };
        details.with_description(&self.description)
    }

    fn one_time_offer(&self) -> OneTimePurchaseOfferDetails {
        OneTimePurchaseOfferDetails {
            formatted_price: format_price(self.price_micros, &self.currency),
            price_amount_micros: self.price_micros,
            price_currency_code: self.currency.clone(),
            appc_formatted_price: format_price(self.appc_price_micros, "APPC"),
            appc_price_amount_micros: self.appc_price_micros,
            appc_price_currency_code: "APPC".to_string(),
            fiat_formatted_price: format_price(self.price_micros, &self.currency),
            fiat_price_amount_micros: self.price_micros,
            fiat_price_currency_code: self.currency.clone(),
        }
    }

    fn subscription_offer(&self) -> SubscriptionOfferDetails {
        let mut phases = Vec::new();

        if let Some(trial) = &self.trial_period {
            phases.push(PricingPhase {
                billing_period: trial.clone(),
                formatted_price: "Free".to_string(),
                price_currency_code: self.currency.clone(),
                appc_price_currency_code: "APPC".to_string(),
                fiat_price_currency_code: self.currency.clone(),
                ..Default::default()
            });
        }

        let offer = self.one_time_offer();
        phases.push(PricingPhase {
            billing_period: self.billing_period.clone().unwrap_or_else(|| "P1M".to_string()),
            formatted_price: offer.formatted_price,
            price_amount_micros: offer.price_amount_micros,
            price_currency_code: offer.price_currency_code,
            appc_formatted_price: offer.appc_formatted_price,
            appc_price_amount_micros: offer.appc_price_amount_micros,
            appc_price_currency_code: offer.appc_price_currency_code,
            fiat_formatted_price: offer.fiat_formatted_price,
            fiat_price_amount_micros: offer.fiat_price_amount_micros,
            fiat_price_currency_code: offer.fiat_price_currency_code,
        });

        SubscriptionOfferDetails {
            pricing_phases: PricingPhases {
                pricing_phase_list: phases,
            },
            trial_details: self.trial_period.as_ref().map(|period| TrialDetails {
                period: period.clone(),
                period_end_date: String::new(),
            }),
        }
    }
}

/// Collection of products
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: CatalogProduct) {
        self.products.push(product);
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&CatalogProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Find an active product by ID and type
    pub fn find_active(&self, id: &str, product_type: ProductType) -> Option<&CatalogProduct> {
        self.active_products()
            .find(|p| p.id == id && p.product_type == product_type)
    }

    /// Get all active products
    pub fn active_products(&self) -> impl Iterator<Item = &CatalogProduct> {
        self.products.iter().filter(|p| p.active)
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load from the first readable config path, or fall back to an empty catalog
    pub fn load_default() -> anyhow::Result<Self> {
        let config_paths = [
            "config/products.toml",
            "../config/products.toml",
            "../../config/products.toml",
        ];

        for path in config_paths {
            if let Ok(content) = std::fs::read_to_string(path) {
                let catalog = Self::from_toml(&content)
                    .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
                tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
                return Ok(catalog);
            }
        }

        tracing::warn!("No product catalog found, using empty catalog");
        Ok(Self::new())
    }
}
