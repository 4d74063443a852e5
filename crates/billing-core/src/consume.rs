//! Consume request: marks a one-time purchase as used so it can be bought again.

use crate::error::{BillingError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeParams {
    purchase_token: String,
}

impl ConsumeParams {
    pub fn builder() -> ConsumeParamsBuilder {
        ConsumeParamsBuilder::default()
    }

    pub fn purchase_token(&self) -> &str {
        &self.purchase_token
    }
}

#[derive(Debug, Default)]
pub struct ConsumeParamsBuilder {
    purchase_token: Option<String>,
}

impl ConsumeParamsBuilder {
    pub fn purchase_token(mut self, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(BillingError::InvalidArgument(
                "Purchase token must not be empty.".to_string(),
            ));
        }
        self.purchase_token = Some(token);
        Ok(self)
    }

    pub fn build(self) -> Result<ConsumeParams> {
        let purchase_token = self.purchase_token.ok_or_else(|| {
            BillingError::IncompleteState("Purchase token must be provided.".to_string())
        })?;
        Ok(ConsumeParams { purchase_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_consume_params() {
        let params = ConsumeParams::builder()
            .purchase_token("token-abc")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(params.purchase_token(), "token-abc");
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = ConsumeParams::builder().purchase_token("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_missing_token_rejected() {
        let err = ConsumeParams::builder().build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteState);
    }
}
