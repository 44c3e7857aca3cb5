use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::defaults::default_rate;
use super::{AssetClass, AssetConfig, RateOrigin, RateSnapshot, RatedAsset};

/// Basket identity handed to [`reconcile`].
#[derive(Debug, Clone)]
pub struct BasketSpec<'a> {
    pub class: AssetClass,
    /// Asset fixed at 1.0 (USD for fiat). Crypto has none.
    pub reference_code: Option<&'a str>,
    pub assets: &'a [AssetConfig],
}

fn usable(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Builds a complete snapshot for `basket`.
///
/// Each configured asset gets exactly one entry, resolved in order: reference
/// asset, live rate, baseline rate, static default. `fetched` is `None` when
/// the fetch failed, in which case no asset is treated as live except the
/// reference asset.
pub fn reconcile(
    basket: &BasketSpec<'_>,
    fetched: Option<&HashMap<String, f64>>,
    baseline: &HashMap<String, f64>,
    fetched_at: DateTime<Utc>,
) -> RateSnapshot {
    let mut assets = Vec::with_capacity(basket.assets.len());
    let mut used_baseline = Vec::new();
    let mut missing = Vec::new();

    for config in basket.assets {
        let code = config.code.as_str();

        let (rate, origin) = if basket.reference_code == Some(code) {
            (1.0, RateOrigin::Live)
        } else if let Some(rate) = fetched
            .and_then(|rates| rates.get(code))
            .copied()
            .filter(|r| usable(*r))
        {
            (rate, RateOrigin::Live)
        } else if let Some(rate) = baseline.get(code).copied().filter(|r| usable(*r)) {
            used_baseline.push(code.to_string());
            (rate, RateOrigin::Baseline)
        } else {
            missing.push(code.to_string());
            (default_rate(basket.class, code), RateOrigin::Default)
        };

        assets.push(RatedAsset {
            config: config.clone(),
            rate,
            origin,
        });
    }

    if !used_baseline.is_empty() {
        warn!(
            class = %basket.class,
            codes = ?used_baseline,
            "using baseline rates"
        );
    }
    if !missing.is_empty() {
        warn!(
            class = %basket.class,
            codes = ?missing,
            "no live or baseline rate, using static defaults"
        );
    }

    RateSnapshot {
        class: basket.class,
        reference_code: basket.reference_code.map(str::to_string),
        assets,
        fetched_at,
        used_baseline,
        missing,
    }
}
