use std::collections::HashMap;

use super::{AssetConfig, RateResult};

/// An upstream price API for one asset class.
///
/// Implementations issue a single request, normalize the body into
/// `code -> rate` keyed by configured codes, and never retry on their own.
/// Codes the provider does not quote are simply absent from the map.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self, assets: &[AssetConfig]) -> RateResult<HashMap<String, f64>>;

    fn name(&self) -> &str;
}

/// Source that never has data. Useful for running entirely off the baseline.
pub struct OfflineSource;

#[async_trait::async_trait]
impl RateSource for OfflineSource {
    async fn fetch(&self, _assets: &[AssetConfig]) -> RateResult<HashMap<String, f64>> {
        Err(super::RateError::unavailable(
            self.name(),
            "offline mode, no upstream configured",
        ))
    }

    fn name(&self) -> &str {
        "offline"
    }
}
