//! Loading of the static asset-list and baseline documents.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::rates::{AssetClass, AssetConfig, Baseline, RateError, RateResult};

/// Reads a JSON array of [`AssetConfig`].
///
/// Codes are upper-cased. Duplicate codes, negative or non-finite weights and
/// an overflowing total weight make the whole document invalid.
pub fn load_asset_list(path: &Path) -> RateResult<Vec<AssetConfig>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RateError::ConfigMissing(format!("{}: {e}", path.display())))?;
    parse_asset_list(&content)
        .map_err(|e| RateError::ConfigMissing(format!("{}: {e}", path.display())))
}

/// Like [`load_asset_list`], but a missing or invalid document yields an
/// empty basket instead of an error.
pub fn load_asset_list_or_empty(path: &Path, class: AssetClass) -> Vec<AssetConfig> {
    match load_asset_list(path) {
        Ok(assets) => {
            info!(class = %class, count = assets.len(), path = %path.display(), "loaded asset list");
            assets
        }
        Err(e) => {
            warn!(class = %class, error = %e, "asset list unavailable, basket will be empty");
            Vec::new()
        }
    }
}

pub fn parse_asset_list(content: &str) -> Result<Vec<AssetConfig>, String> {
    let assets: Vec<AssetConfig> =
        serde_json::from_str(content).map_err(|e| format!("invalid asset list: {e}"))?;

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(assets.len());
    let mut total_weight = 0.0_f64;
    for mut asset in assets {
        asset.code = asset.code.trim().to_uppercase();
        if asset.code.is_empty() {
            return Err("asset with empty code".to_string());
        }
        if !asset.weight.is_finite() || asset.weight < 0.0 {
            return Err(format!("invalid weight {} for {}", asset.weight, asset.code));
        }
        if !seen.insert(asset.code.clone()) {
            return Err(format!("duplicate code {}", asset.code));
        }
        total_weight += asset.weight;
        normalized.push(asset);
    }
    if !total_weight.is_finite() {
        return Err("total weight is not a finite number".to_string());
    }
    Ok(normalized)
}

/// Reads the baseline document.
pub fn load_baseline(path: &Path) -> Result<Baseline> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read baseline: {}", path.display()))?;
    let baseline: Baseline = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse baseline: {}", path.display()))?;
    Ok(baseline.normalized())
}

/// Reads the baseline document, or an empty baseline if it cannot be loaded.
pub fn load_baseline_or_default(path: &Path) -> Baseline {
    match load_baseline(path) {
        Ok(baseline) => baseline,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "baseline unavailable, defaults only");
            Baseline::default()
        }
    }
}
