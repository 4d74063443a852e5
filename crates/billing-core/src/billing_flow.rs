//! # Billing Flow Parameters
//!
//! Validated request to launch the purchase flow for exactly one product.
//! The product id and type are copied from resolved [`ProductDetails`], so a
//! flow can only be launched for a product the backend has already described.

use crate::error::{BillingError, Result};
use crate::product::{ProductDetails, ProductType};

/// Wraps the resolved details of the product being purchased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetailsParams {
    product_details: ProductDetails,
}

impl ProductDetailsParams {
    pub fn builder() -> ProductDetailsParamsBuilder {
        ProductDetailsParamsBuilder::default()
    }

    pub fn product_details(&self) -> &ProductDetails {
        &self.product_details
    }
}

#[derive(Debug, Default)]
pub struct ProductDetailsParamsBuilder {
    product_details: Option<ProductDetails>,
}

impl ProductDetailsParamsBuilder {
    pub fn product_details(mut self, details: ProductDetails) -> Self {
        self.product_details = Some(details);
        self
    }

    pub fn build(self) -> Result<ProductDetailsParams> {
        let product_details = self.product_details.ok_or_else(|| {
            BillingError::IncompleteState(
                "ProductDetails is required for constructing ProductDetailsParams.".to_string(),
            )
        })?;
        Ok(ProductDetailsParams { product_details })
    }
}

/// Request to launch the billing flow, flattened to what the bridge needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingFlowParams {
    sku: String,
    sku_type: ProductType,
    developer_payload: Option<String>,
    obfuscated_account_id: Option<String>,
    free_trial: bool,
}

impl BillingFlowParams {
    pub fn builder() -> BillingFlowParamsBuilder {
        BillingFlowParamsBuilder::default()
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn sku_type(&self) -> ProductType {
        self.sku_type
    }

    pub fn developer_payload(&self) -> Option<&str> {
        self.developer_payload.as_deref()
    }

    pub fn obfuscated_account_id(&self) -> Option<&str> {
        self.obfuscated_account_id.as_deref()
    }

    pub fn free_trial(&self) -> bool {
        self.free_trial
    }
}

#[derive(Debug, Default)]
pub struct BillingFlowParamsBuilder {
    product_details_params: Option<ProductDetailsParams>,
    developer_payload: Option<String>,
    obfuscated_account_id: Option<String>,
    free_trial: bool,
}

impl BillingFlowParamsBuilder {
    /// Set the product to purchase. Multi-item baskets are not supported:
    /// the list must hold exactly one entry.
    pub fn product_details_params_list(mut self, list: Vec<ProductDetailsParams>) -> Result<Self> {
        if list.is_empty() {
            return Err(BillingError::EmptyProductList);
        }
        if list.len() != 1 {
            return Err(BillingError::UnsupportedProductCount { count: list.len() });
        }

        self.product_details_params = list.into_iter().next();
        Ok(self)
    }

    #[deprecated(
        note = "DeveloperPayload should not be used to identify purchases. Use the purchase token, or obfuscated_account_id to identify the user."
    )]
    pub fn developer_payload(mut self, payload: impl Into<String>) -> Result<Self> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(BillingError::InvalidArgument(
                "Developer Payload must not be empty. Leave it unset if not necessary.".to_string(),
            ));
        }
        self.developer_payload = Some(payload);
        Ok(self)
    }

    pub fn obfuscated_account_id(mut self, account_id: impl Into<String>) -> Result<Self> {
        let account_id = account_id.into();
        if account_id.is_empty() {
            return Err(BillingError::InvalidArgument(
                "Obfuscated Account ID must not be empty. Leave it unset if not necessary."
                    .to_string(),
            ));
        }
        self.obfuscated_account_id = Some(account_id);
        Ok(self)
    }

    pub fn free_trial(mut self, free_trial: bool) -> Self {
        self.free_trial = free_trial;
        self
    }

    pub fn build(self) -> Result<BillingFlowParams> {
        let params = self.product_details_params.ok_or_else(|| {
            BillingError::IncompleteState(
                "ProductDetailsParams list must be provided and not empty.".to_string(),
            )
        })?;
        let details = params.product_details;

        Ok(BillingFlowParams {
            sku: details.product_id,
            sku_type: details.product_type,
            developer_payload: self.developer_payload,
            obfuscated_account_id: self.obfuscated_account_id,
            free_trial: self.free_trial,
        })
    }
}
