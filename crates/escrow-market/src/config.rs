//! Marketplace configuration.
//!
//! Loaded from JSON. Only `escrow_account` is required:
//!
//! ```json
//! {
//!     "escrow_account": "0xESCROW",
//!     "max_duration_secs": 2592000,
//!     "min_price": "1000",
//!     "allow_native_currency": false,
//!     "accepted_tokens": ["0xTOKEN"]
//! }
//! ```

use std::path::Path;

use escrow_core::{AccountId, Amount, Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a [`MarketConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The JSON is malformed.
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_min_price() -> Amount {
    Amount::from_base_units(1)
}

const fn default_true() -> bool {
    true
}

/// Listing rules for one marketplace instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Account that holds assets while they are listed.
    pub escrow_account: AccountId,
    /// Longest fulfillment window a seller may choose.
    #[serde(default)]
    pub max_duration_secs: Option<u64>,
    /// Lowest accepted price, in base units.
    #[serde(default = "default_min_price")]
    pub min_price: Amount,
    /// Whether orders may be priced in the native currency.
    #[serde(default = "default_true")]
    pub allow_native_currency: bool,
    /// Token contracts orders may be priced in. `None` accepts any token.
    #[serde(default)]
    pub accepted_tokens: Option<Vec<AccountId>>,
}

impl MarketConfig {
    /// Permissive defaults around the given escrow account.
    #[must_use]
    pub fn new(escrow_account: AccountId) -> Self {
        Self {
            escrow_account,
            max_duration_secs: None,
            min_price: default_min_price(),
            allow_native_currency: true,
            accepted_tokens: None,
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.escrow_account.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid(
                "escrow_account cannot be empty".to_string(),
            ));
        }

        if self.min_price.is_zero() {
            return Err(ConfigError::Invalid(
                "min_price must be greater than 0".to_string(),
            ));
        }

        if self.max_duration_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "max_duration_secs must be greater than 0".to_string(),
            ));
        }

        if !self.allow_native_currency
            && self.accepted_tokens.as_ref().is_some_and(Vec::is_empty)
        {
            return Err(ConfigError::Invalid(
                "no currency is accepted: enable native currency or list a token".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns true if orders may be priced in `currency`.
    #[must_use]
    pub fn accepts(&self, currency: &Currency) -> bool {
        match currency {
            Currency::Native => self.allow_native_currency,
            Currency::Token(contract) => self
                .accepted_tokens
                .as_ref()
                .is_none_or(|tokens| tokens.contains(contract)),
        }
    }
}
