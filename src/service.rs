use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::index::IndexComposer;
use crate::rates::{
    usd_value, weighted_average, AssetClass, IndexPoint, IndexValue, RateCache, RateError,
    RateResult, RateSnapshot, RatedAsset,
};

/// Pseudo-code for the index itself in conversions.
pub const AVGX_CODE: &str = "AVGX";

/// Freshness and provenance of one basket, for operational visibility.
#[derive(Debug, Clone, Serialize)]
pub struct BasketStatus {
    pub class: AssetClass,
    pub assets: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    pub stale: bool,
    pub used_baseline: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub fiat: BasketStatus,
    pub crypto: BasketStatus,
    pub history_points: usize,
}

/// Entry point for consumers of the engine (route layer, CLI).
///
/// Holds one cache per asset class and the index composer. Every read goes
/// through the caches, so fetch failures never reach the caller; only
/// averaging preconditions (empty basket, zero weight) surface as errors.
pub struct AvgxService {
    fiat: RateCache,
    crypto: RateCache,
    composer: IndexComposer,
}

impl AvgxService {
    pub fn new(fiat: RateCache, crypto: RateCache, composer: IndexComposer) -> Self {
        Self {
            fiat,
            crypto,
            composer,
        }
    }

    pub fn fiat_cache(&self) -> &RateCache {
        &self.fiat
    }

    pub fn crypto_cache(&self) -> &RateCache {
        &self.crypto
    }

    pub async fn fiat_rates_with_weights(&self) -> Vec<RatedAsset> {
        self.fiat.get().await.assets.clone()
    }

    pub async fn crypto_prices_with_weights(&self) -> Vec<RatedAsset> {
        self.crypto.get().await.assets.clone()
    }

    pub async fn weighted_fiat_average(&self) -> RateResult<f64> {
        weighted_average(&*self.fiat.get().await)
    }

    pub async fn weighted_crypto_average(&self) -> RateResult<f64> {
        weighted_average(&*self.crypto.get().await)
    }

    /// Fiat codes that fell through to static defaults on the latest refresh.
    pub fn missing_currencies(&self) -> Vec<String> {
        Self::missing(&self.fiat)
    }

    /// Crypto codes that fell through to static defaults on the latest refresh.
    pub fn missing_cryptos(&self) -> Vec<String> {
        Self::missing(&self.crypto)
    }

    fn missing(cache: &RateCache) -> Vec<String> {
        cache
            .peek()
            .map(|snapshot| snapshot.missing.clone())
            .unwrap_or_default()
    }

    /// Current AVGX value. The point is recorded in the history under the
    /// newer of the two snapshots' timestamps.
    pub async fn current_index(&self) -> RateResult<IndexValue> {
        let (fiat, crypto) = tokio::join!(self.fiat.get(), self.crypto.get());
        self.compose(&fiat, &crypto)
    }

    fn compose(&self, fiat: &RateSnapshot, crypto: &RateSnapshot) -> RateResult<IndexValue> {
        let fiat_average = weighted_average(fiat)?;
        let crypto_average = weighted_average(crypto)?;
        let as_of = fiat.fetched_at.max(crypto.fetched_at);
        let index = self.composer.compose(fiat_average, crypto_average, as_of);
        debug!(
            value = index.value,
            fiat_average,
            crypto_average,
            change_24h_pct = ?index.change_24h_pct,
            "index composed"
        );
        Ok(index)
    }

    /// Recorded index points, oldest first.
    pub fn history(&self) -> Vec<IndexPoint> {
        self.composer.history()
    }

    /// Converts `amount` of `from` into `to`.
    ///
    /// Codes may be `AVGX`, `USD`, or any configured fiat or crypto code.
    /// Conversions read the index without adding to its history.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> RateResult<f64> {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();

        let (fiat, crypto) = tokio::join!(self.fiat.get(), self.crypto.get());
        let index = if from == AVGX_CODE || to == AVGX_CODE {
            let as_of = fiat.fetched_at.max(crypto.fetched_at);
            let value = self
                .composer
                .preview(weighted_average(&*fiat)?, weighted_average(&*crypto)?, as_of)
                .value;
            Some(value)
        } else {
            None
        };

        let from_usd = Self::usd_per_unit(&from, &fiat, &crypto, index)?;
        let to_usd = Self::usd_per_unit(&to, &fiat, &crypto, index)?;
        Ok(amount * from_usd / to_usd)
    }

    fn usd_per_unit(
        code: &str,
        fiat: &RateSnapshot,
        crypto: &RateSnapshot,
        index: Option<f64>,
    ) -> RateResult<f64> {
        if code == AVGX_CODE {
            return index.ok_or_else(|| RateError::UnknownCode(code.to_string()));
        }
        if code == "USD" {
            return Ok(1.0);
        }
        for snapshot in [fiat, crypto] {
            if let Some(asset) = snapshot.get(code) {
                let convention = snapshot.class.convention();
                return Ok(usd_value(asset, convention, snapshot.is_reference(code)));
            }
        }
        Err(RateError::UnknownCode(code.to_string()))
    }

    /// Forces both baskets to refresh now.
    pub async fn refresh_all(&self) {
        tokio::join!(self.fiat.refresh(), self.crypto.refresh());
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            fiat: Self::basket_status(&self.fiat),
            crypto: Self::basket_status(&self.crypto),
            history_points: self.composer.history().len(),
        }
    }

    fn basket_status(cache: &RateCache) -> BasketStatus {
        let snapshot = cache.peek();
        BasketStatus {
            class: cache.class(),
            assets: cache.assets().len(),
            fetched_at: snapshot.as_ref().map(|s| s.fetched_at),
            stale: cache.is_stale(),
            used_baseline: snapshot
                .as_ref()
                .map(|s| s.used_baseline.clone())
                .unwrap_or_default(),
            missing: snapshot.map(|s| s.missing.clone()).unwrap_or_default(),
        }
    }
}
