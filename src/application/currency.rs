//! Currency conversion for balance display.
//!
//! Balances are stored in a single base currency. A [`CurrencyConverter`]
//! answers how many base units one unit of the requested currency is worth;
//! the balance service divides by that factor.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConversionError {
    /// The provider has no usable rate for the currency.
    #[error("No rate available for {0}")]
    Unavailable(String),

    /// The provider could not be reached or answered garbage.
    #[error("Rate provider request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Source of conversion factors from the base currency.
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    /// Base-currency units per one unit of `currency`.
    async fn rate(&self, currency: &str) -> Result<f64, ConversionError>;
}

/// A fixed table of factors. Used when no live provider is configured.
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<String, f64>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, currency: impl Into<String>, factor: f64) -> Self {
        self.rates.insert(currency.into().to_uppercase(), factor);
        self
    }
}

#[async_trait]
impl CurrencyConverter for FixedRates {
    async fn rate(&self, currency: &str) -> Result<f64, ConversionError> {
        self.rates
            .get(&currency.to_uppercase())
            .copied()
            .ok_or_else(|| ConversionError::Unavailable(currency.to_string()))
    }
}

/// Upper bound on a single rate lookup, connect included.
pub const DEFAULT_RATES_TIMEOUT: Duration = Duration::from_secs(10);

/// Live quotes from a currencylayer-compatible `live` endpoint.
pub struct CurrencyLayer {
    client: reqwest::Client,
    endpoint: String,
    access_key: String,
    base_currency: String,
    timeout: Duration,
}

/// Body of a `live` response. Quotes are keyed by `<source><target>`.
#[derive(Debug, Deserialize)]
pub struct LiveQuotes {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub quotes: HashMap<String, f64>,
}

impl LiveQuotes {
    /// Factor for `target` against `base`, truncated to two decimals.
    pub fn factor(&self, base: &str, target: &str) -> Result<f64, ConversionError> {
        if !self.success {
            return Err(ConversionError::Unavailable(target.to_string()));
        }

        let quote = |code: &str| {
            self.quotes
                .get(&format!("{}{}", self.source, code))
                .copied()
                .ok_or_else(|| ConversionError::Unavailable(code.to_string()))
        };

        let target_quote = quote(target)?;
        let base_quote = quote(base)?;
        let factor = ((base_quote / target_quote) * 100.0).trunc() / 100.0;

        if !factor.is_finite() || factor <= 0.0 {
            return Err(ConversionError::Unavailable(target.to_string()));
        }
        Ok(factor)
    }
}

impl CurrencyLayer {
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        base_currency: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            base_currency: base_currency.into().to_uppercase(),
            timeout: DEFAULT_RATES_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CurrencyConverter for CurrencyLayer {
    async fn rate(&self, currency: &str) -> Result<f64, ConversionError> {
        let quotes: LiveQuotes = self
            .client
            .get(&self.endpoint)
            .query(&[("access_key", self.access_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let factor = quotes.factor(&self.base_currency, &currency.to_uppercase())?;
        debug!(currency, factor, "fetched conversion factor");
        Ok(factor)
    }
}
