//! CoinGecko crypto prices.
//!
//! Uses the `/simple/price` endpoint, which quotes any number of coins in one
//! request. CoinGecko identifies coins by slug (`bitcoin`), so configured ticker
//! codes are mapped to slugs on the way out and back to codes on the way in.

use std::collections::HashMap;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::rates::{AssetConfig, RateError, RateResult, RateSource};

pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

const SOURCE_NAME: &str = "coingecko";
const QUOTE_CURRENCY: &str = "usd";

/// Crypto price source. Prices are USD per one unit of each coin.
#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
}

impl CoinGeckoSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: COINGECKO_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Maps a configured asset to its CoinGecko id.
    ///
    /// An explicit `provider_id` wins, then the built-in table, then the
    /// lower-cased code itself.
    fn coingecko_id(asset: &AssetConfig) -> String {
        if let Some(id) = &asset.provider_id {
            return id.clone();
        }

        let id = match asset.code.to_uppercase().as_str() {
            "BTC" => "bitcoin",
            "ETH" => "ethereum",
            "USDT" => "tether",
            "USDC" => "usd-coin",
            "BNB" => "binancecoin",
            "XRP" => "ripple",
            "ADA" => "cardano",
            "DOGE" => "dogecoin",
            "SOL" => "solana",
            "DOT" => "polkadot",
            "MATIC" | "POL" => "matic-network",
            "LTC" => "litecoin",
            "TRX" => "tron",
            "AVAX" => "avalanche-2",
            "DAI" => "dai",
            "LINK" => "chainlink",
            "ATOM" => "cosmos",
            "XLM" => "stellar",
            "BCH" => "bitcoin-cash",
            "XMR" => "monero",
            "TON" => "the-open-network",
            _ => return asset.code.to_lowercase(),
        };
        id.to_string()
    }

    /// Groups configured codes by CoinGecko id. Several codes may share an id
    /// (MATIC and POL both quote `matic-network`).
    fn ids_to_codes(assets: &[AssetConfig]) -> HashMap<String, Vec<String>> {
        let mut ids: HashMap<String, Vec<String>> = HashMap::new();
        for asset in assets {
            ids.entry(Self::coingecko_id(asset))
                .or_default()
                .push(asset.code.clone());
        }
        ids
    }

    /// Converts a `{id: {"usd": price}}` body into `code -> price`.
    ///
    /// Ids absent from the body are left out (partial data). An id that is
    /// present but lacks a numeric USD price is a malformed response.
    fn parse_prices(
        body: &Value,
        ids_to_codes: &HashMap<String, Vec<String>>,
    ) -> RateResult<HashMap<String, f64>> {
        let coins = body
            .as_object()
            .ok_or_else(|| RateError::malformed(SOURCE_NAME, "response is not an object"))?;

        let mut prices = HashMap::with_capacity(coins.len());
        for (id, quote) in coins {
            let Some(codes) = ids_to_codes.get(id) else {
                continue;
            };
            let price = quote
                .get(QUOTE_CURRENCY)
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    RateError::malformed(SOURCE_NAME, format!("no numeric usd price for {id}"))
                })?;
            for code in codes {
                prices.insert(code.clone(), price);
            }
        }

        Ok(prices)
    }
}

impl Default for CoinGeckoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RateSource for CoinGeckoSource {
    async fn fetch(&self, assets: &[AssetConfig]) -> RateResult<HashMap<String, f64>> {
        let ids_to_codes = Self::ids_to_codes(assets);

        if ids_to_codes.is_empty() {
            return Ok(HashMap::new());
        }

        let mut ids: Vec<&str> = ids_to_codes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        let ids = ids.join(",");

        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", QUOTE_CURRENCY)])
            .header("Accept", "application/json")
            .header("User-Agent", concat!("avgx/", env!("CARGO_PKG_VERSION")))
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

        let prices = Self::parse_prices(&body, &ids_to_codes)?;
        debug!(
            source = SOURCE_NAME,
            requested = assets.len(),
            received = prices.len(),
            "fetched crypto prices"
        );
        Ok(prices)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
