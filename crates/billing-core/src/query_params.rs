//! # Query Parameters
//!
//! Validated requests for product-details and purchases queries.
//! Each request is only constructible through its builder; setters validate
//! their argument immediately and `build()` checks completeness.

use crate::error::{BillingError, Result};
use crate::product::ProductType;
use std::collections::HashSet;

fn require_non_empty(value: String, message: &str) -> Result<String> {
    if value.is_empty() {
        return Err(BillingError::InvalidArgument(message.to_string()));
    }
    Ok(value)
}

/// A product to look up: id plus type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Product {
    product_id: String,
    product_type: ProductType,
}

impl Product {
    pub fn builder() -> ProductBuilder {
        ProductBuilder::default()
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn product_type(&self) -> ProductType {
        self.product_type
    }
}

#[derive(Debug, Default)]
pub struct ProductBuilder {
    product_id: Option<String>,
    product_type: Option<ProductType>,
}

impl ProductBuilder {
    pub fn product_id(mut self, product_id: impl Into<String>) -> Result<Self> {
        self.product_id = Some(require_non_empty(
            product_id.into(),
            "Product id must not be empty.",
        )?);
        Ok(self)
    }

    /// Set the type from its wire tag ("inapp" or "subs")
    pub fn product_type(mut self, product_type: &str) -> Result<Self> {
        self.product_type = Some(product_type.parse()?);
        Ok(self)
    }

    pub fn product_type_tag(mut self, product_type: ProductType) -> Self {
        self.product_type = Some(product_type);
        self
    }

    pub fn build(self) -> Result<Product> {
        let product_id = self
            .product_id
            .ok_or_else(|| BillingError::IncompleteState("Product id must be provided.".to_string()))?;
        let product_type = self.product_type.ok_or_else(|| {
            BillingError::IncompleteState("Product type must be provided.".to_string())
        })?;

        Ok(Product {
            product_id,
            product_type,
        })
    }
}

/// Request for the details of one or more products of a single type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryProductDetailsParams {
    product_list: Vec<Product>,
}

impl QueryProductDetailsParams {
    pub fn builder() -> QueryProductDetailsParamsBuilder {
        QueryProductDetailsParamsBuilder::default()
    }

    /// Products in the order they were supplied
    pub fn product_list(&self) -> &[Product] {
        &self.product_list
    }

    pub fn product_ids(&self) -> Vec<String> {
        self.product_list
            .iter()
            .map(|p| p.product_id.clone())
            .collect()
    }

    /// The type shared by every product in the list
    pub fn product_type(&self) -> ProductType {
        // Non-empty by construction
        self.product_list[0].product_type
    }
}

#[derive(Debug, Default)]
pub struct QueryProductDetailsParamsBuilder {
    product_list: Option<Vec<Product>>,
}

impl QueryProductDetailsParamsBuilder {
    /// Set the product list.
    ///
    /// Fails if the list is empty, mixes product types, or repeats a product id,
    /// checked in that order.
    pub fn product_list(mut self, product_list: Vec<Product>) -> Result<Self> {
        let first = product_list.first().ok_or(BillingError::EmptyProductList)?;

        let expected = first.product_type;
        if let Some(other) = product_list.iter().find(|p| p.product_type != expected) {
            return Err(BillingError::MixedProductTypes {
                expected: expected.to_string(),
                found: other.product_type.to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(product_list.len());
        for product in &product_list {
            if !seen.insert(product.product_id.as_str()) {
                return Err(BillingError::DuplicateProductId {
                    product_id: product.product_id.clone(),
                });
            }
        }

        self.product_list = Some(product_list);
        Ok(self)
    }

    pub fn build(self) -> Result<QueryProductDetailsParams> {
        match self.product_list {
            Some(product_list) if !product_list.is_empty() => {
                Ok(QueryProductDetailsParams { product_list })
            }
            _ => Err(BillingError::IncompleteState(
                "Product list must not be empty.".to_string(),
            )),
        }
    }
}

/// Request for the purchases owned for one product type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPurchasesParams {
    product_type: ProductType,
}

impl QueryPurchasesParams {
    pub fn builder() -> QueryPurchasesParamsBuilder {
        QueryPurchasesParamsBuilder::default()
    }

    pub fn product_type(&self) -> ProductType {
        self.product_type
    }
}

#[derive(Debug, Default)]
pub struct QueryPurchasesParamsBuilder {
    product_type: Option<ProductType>,
}

impl QueryPurchasesParamsBuilder {
    pub fn product_type(mut self, product_type: &str) -> Result<Self> {
        self.product_type = Some(product_type.parse()?);
        Ok(self)
    }

    pub fn build(self) -> Result<QueryPurchasesParams> {
        let product_type = self.product_type.ok_or_else(|| {
            BillingError::IncompleteState("Product type must be provided.".to_string())
        })?;
        Ok(QueryPurchasesParams { product_type })
    }
}
