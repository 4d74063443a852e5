//! # Session Configuration
//!
//! Configuration for a billing session. Values come from explicit
//! construction, environment variables, or a TOML file.

use billing_core::{BillingError, PayloadShape, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Listener name reported to the bridge when none is configured
pub const DEFAULT_LISTENER_NAME: &str = "BillingSession";

/// Billing session configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Public key of the application, passed to the bridge at initialize
    pub public_key: String,

    /// Name the bridge uses to address callbacks
    #[serde(default = "default_listener_name")]
    pub listener_name: String,

    /// Payload encoding used by the bridge
    #[serde(default)]
    pub payload_shape: PayloadShape,
}

fn default_listener_name() -> String {
    DEFAULT_LISTENER_NAME.to_string()
}

impl SessionConfig {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            listener_name: default_listener_name(),
            payload_shape: PayloadShape::default(),
        }
    }

    /// Builder: set listener name
    pub fn with_listener_name(mut self, name: impl Into<String>) -> Self {
        self.listener_name = name.into();
        self
    }

    /// Builder: set payload shape
    pub fn with_payload_shape(mut self, shape: PayloadShape) -> Self {
        self.payload_shape = shape;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `BILLING_PUBLIC_KEY`
    ///
    /// Optional:
    /// - `BILLING_LISTENER_NAME` (default `BillingSession`)
    /// - `BILLING_PAYLOAD_SHAPE` (`current` or `legacy`, default `current`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from a variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let public_key = lookup("BILLING_PUBLIC_KEY")
            .ok_or_else(|| BillingError::Configuration("BILLING_PUBLIC_KEY not set".to_string()))?;

        let mut config = Self::new(public_key);

        if let Some(name) = lookup("BILLING_LISTENER_NAME") {
            config.listener_name = name;
        }

        if let Some(shape) = lookup("BILLING_PAYLOAD_SHAPE") {
            config.payload_shape = shape.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BillingError::Configuration(format!("Invalid session config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BillingError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.public_key.trim().is_empty() {
            return Err(BillingError::Configuration(
                "BILLING_PUBLIC_KEY must not be empty".to_string(),
            ));
        }
        if self.listener_name.trim().is_empty() {
            return Err(BillingError::Configuration(
                "Listener name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::from_vars(vars(&[("BILLING_PUBLIC_KEY", "pk-123")])).unwrap();
        assert_eq!(config.public_key, "pk-123");
        assert_eq!(config.listener_name, DEFAULT_LISTENER_NAME);
        assert_eq!(config.payload_shape, PayloadShape::Current);
    }

    #[test]
    fn test_overrides() {
        let config = SessionConfig::from_vars(vars(&[
            ("BILLING_PUBLIC_KEY", "pk-123"),
            ("BILLING_LISTENER_NAME", "StoreListener"),
            ("BILLING_PAYLOAD_SHAPE", "legacy"),
        ]))
        .unwrap();
        assert_eq!(config.listener_name, "StoreListener");
        assert_eq!(config.payload_shape, PayloadShape::Legacy);
    }

    #[test]
    fn test_missing_or_empty_key() {
        let err = SessionConfig::from_vars(vars(&[])).unwrap_err();
        assert!(matches!(err, BillingError::Configuration(_)));

        let err = SessionConfig::from_vars(vars(&[("BILLING_PUBLIC_KEY", " ")])).unwrap_err();
        assert!(matches!(err, BillingError::Configuration(_)));
    }

    #[test]
    fn test_bad_shape() {
        let err = SessionConfig::from_vars(vars(&[
            ("BILLING_PUBLIC_KEY", "pk-123"),
            ("BILLING_PAYLOAD_SHAPE", "v3"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("v3"));
    }

    #[test]
    fn test_from_toml() {
        let config = SessionConfig::from_toml(
            r#"
            public_key = "pk-123"
            payload_shape = "legacy"
            "#,
        )
        .unwrap();
        assert_eq!(config.payload_shape, PayloadShape::Legacy);
        assert_eq!(config.listener_name, DEFAULT_LISTENER_NAME);

        assert!(SessionConfig::from_toml("listener_name = \"x\"").is_err());
    }
}
