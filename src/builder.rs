use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::documents::{load_asset_list_or_empty, load_baseline_or_default};
use crate::index::IndexComposer;
use crate::rates::providers::{CoinGeckoSource, OpenExchangeRatesSource};
use crate::rates::{AssetClass, IndexPoint, OfflineSource, RateCache, RateSource};
use crate::service::AvgxService;

/// Builds an [`AvgxService`] from resolved configuration.
///
/// Loads the asset lists and baseline, wires the providers, and seeds the
/// index history from the baseline's last known value.
pub struct AvgxServiceBuilder {
    config: ResolvedConfig,
    fiat_source: Option<Arc<dyn RateSource>>,
    crypto_source: Option<Arc<dyn RateSource>>,
    offline_only: bool,
    clock: Arc<dyn Clock>,
}

impl AvgxServiceBuilder {
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config,
            fiat_source: None,
            crypto_source: None,
            offline_only: false,
            clock: Arc::new(SystemClock),
        }
    }

    /// Never contact upstream providers; serve baseline and default rates only.
    pub fn offline_only(mut self) -> Self {
        self.offline_only = true;
        self
    }

    /// Replace the configured fiat provider (useful for tests).
    pub fn with_fiat_source(mut self, source: Arc<dyn RateSource>) -> Self {
        self.fiat_source = Some(source);
        self
    }

    /// Replace the configured crypto provider (useful for tests).
    pub fn with_crypto_source(mut self, source: Arc<dyn RateSource>) -> Self {
        self.crypto_source = Some(source);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn api_key(&self) -> Option<SecretString> {
        let var = &self.config.sources.fiat.api_key_env;
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Some(SecretString::from(key)),
            _ => {
                warn!(env = %var, "fiat API key not set; requests will be unauthenticated");
                None
            }
        }
    }

    fn fiat_source(&mut self) -> Arc<dyn RateSource> {
        if self.offline_only {
            return Arc::new(OfflineSource);
        }
        if let Some(source) = self.fiat_source.take() {
            return source;
        }
        Arc::new(
            OpenExchangeRatesSource::new(self.api_key())
                .with_base_url(self.config.sources.fiat.base_url.clone()),
        )
    }

    fn crypto_source(&mut self) -> Arc<dyn RateSource> {
        if self.offline_only {
            return Arc::new(OfflineSource);
        }
        if let Some(source) = self.crypto_source.take() {
            return source;
        }
        Arc::new(CoinGeckoSource::new().with_base_url(self.config.sources.crypto.base_url.clone()))
    }

    pub fn build(mut self) -> AvgxService {
        let fiat_assets = load_asset_list_or_empty(&self.config.data.fiat_assets, AssetClass::Fiat);
        let crypto_assets =
            load_asset_list_or_empty(&self.config.data.crypto_assets, AssetClass::Crypto);
        let baseline = load_baseline_or_default(&self.config.data.baseline);

        let fiat_source = self.fiat_source();
        let crypto_source = self.crypto_source();
        let config = &self.config;

        let fiat = RateCache::new(
            AssetClass::Fiat,
            fiat_assets,
            baseline.rates_for(AssetClass::Fiat).clone(),
            fiat_source,
        )
        .with_reference_code(config.sources.fiat.reference_code.clone())
        .with_ttl(config.cache.ttl)
        .with_retry_policy(config.retry.clone())
        .with_clock(self.clock.clone());

        let crypto = RateCache::new(
            AssetClass::Crypto,
            crypto_assets,
            baseline.rates_for(AssetClass::Crypto).clone(),
            crypto_source,
        )
        .with_ttl(config.cache.ttl)
        .with_retry_policy(config.retry.clone())
        .with_clock(self.clock.clone());

        let composer = IndexComposer::new(config.index.fiat_share)
            .with_capacity(config.index.history_capacity);
        if let (Some(value), Some(as_of)) = (baseline.avgx_value, baseline.as_of) {
            composer.seed(IndexPoint {
                timestamp: as_of,
                value,
            });
        }

        info!(
            fiat_assets = fiat.assets().len(),
            crypto_assets = crypto.assets().len(),
            ttl_secs = config.cache.ttl.as_secs(),
            offline = self.offline_only,
            "avgx service ready"
        );

        AvgxService::new(fiat, crypto, composer)
    }
}
