//! Fiat exchange rates from an Open Exchange Rates compatible API.
//!
//! The endpoint returns every rate quoted against a base currency in a single
//! `{"rates": {"EUR": 0.92, ...}}` document, so one request covers the whole
//! fiat basket.

use std::collections::HashMap;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use crate::rates::{AssetConfig, RateError, RateResult, RateSource};

pub const OPEN_EXCHANGE_RATES_BASE_URL: &str = "https://openexchangerates.org/api";

const SOURCE_NAME: &str = "open_exchange_rates";

/// Fiat rate source. Rates are units of each currency per one USD.
#[derive(Debug, Clone)]
pub struct OpenExchangeRatesSource {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl OpenExchangeRatesSource {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            client: Client::new(),
            base_url: OPEN_EXCHANGE_RATES_BASE_URL.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pulls `rates` out of the response body, checking every field's type.
    fn parse_rates(body: &Value) -> RateResult<HashMap<String, f64>> {
        let rates = body
            .get("rates")
            .ok_or_else(|| RateError::malformed(SOURCE_NAME, "response has no `rates` field"))?
            .as_object()
            .ok_or_else(|| RateError::malformed(SOURCE_NAME, "`rates` is not an object"))?;

        let mut parsed = HashMap::with_capacity(rates.len());
        for (code, value) in rates {
            let rate = value.as_f64().ok_or_else(|| {
                RateError::malformed(SOURCE_NAME, format!("rate for {code} is not a number"))
            })?;
            parsed.insert(code.to_uppercase(), rate);
        }
        Ok(parsed)
    }
}

#[async_trait::async_trait]
impl RateSource for OpenExchangeRatesSource {
    async fn fetch(&self, assets: &[AssetConfig]) -> RateResult<HashMap<String, f64>> {
        let url = format!("{}/latest.json", self.base_url);

        let mut request = self.client.get(&url).query(&[("base", "USD")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("app_id", key.expose_secret())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RateError::unavailable(SOURCE_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RateError::unavailable(
                SOURCE_NAME,
                format!("HTTP {status} - {body}"),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RateError::malformed(SOURCE_NAME, format!("invalid JSON: {e}")))?;

        let mut rates = Self::parse_rates(&body)?;
        // Only keep what the basket asks for.
        rates.retain(|code, _| assets.iter().any(|a| &a.code == code));

        debug!(
            source = SOURCE_NAME,
            requested = assets.len(),
            received = rates.len(),
            "fetched fiat rates"
        );
        Ok(rates)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "disclaimer": "Usage subject to terms",
        "timestamp": 1717200000,
        "base": "USD",
        "rates": {
            "EUR": 0.9215,
            "GBP": 0.7841,
            "JPY": 157
        }
    }"#;

    #[test]
    fn test_parse_rates() {
        let body: Value = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        let rates = OpenExchangeRatesSource::parse_rates(&body).unwrap();

        assert_eq!(rates.len(), 3);
        assert!((rates["EUR"] - 0.9215).abs() < 1e-9);
        assert_eq!(rates["JPY"], 157.0);
    }

    #[test]
    fn test_missing_rates_is_malformed() {
        let body: Value = serde_json::from_str(r#"{"base": "USD"}"#).unwrap();
        let err = OpenExchangeRatesSource::parse_rates(&body).unwrap_err();
        assert!(matches!(err, RateError::MalformedResponse { .. }));
    }

    #[test]
    fn test_non_numeric_rate_is_malformed() {
        let body: Value = serde_json::from_str(r#"{"rates": {"EUR": "0.92"}}"#).unwrap();
        let err = OpenExchangeRatesSource::parse_rates(&body).unwrap_err();
        assert!(matches!(err, RateError::MalformedResponse { .. }));
    }

    #[test]
    fn test_rates_not_object_is_malformed() {
        let body: Value = serde_json::from_str(r#"{"rates": [0.92]}"#).unwrap();
        assert!(OpenExchangeRatesSource::parse_rates(&body).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let source = OpenExchangeRatesSource::new(None).with_base_url("http://localhost:1234/");
        assert_eq!(source.base_url, "http://localhost:1234");
        assert_eq!(source.name(), "open_exchange_rates");
    }
}
