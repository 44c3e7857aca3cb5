use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Fiat,
    Crypto,
}

impl AssetClass {
    /// How rates of this class are quoted against USD.
    pub fn convention(self) -> RateConvention {
        match self {
            AssetClass::Fiat => RateConvention::UnitsPerUsd,
            AssetClass::Crypto => RateConvention::UsdPerUnit,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Fiat => "fiat",
            AssetClass::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateConvention {
    /// One USD buys `rate` units of the asset (fiat quotes).
    UnitsPerUsd,
    /// One unit of the asset costs `rate` USD (crypto quotes).
    UsdPerUnit,
}

/// Which fallback tier produced a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateOrigin {
    Live,
    Baseline,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub code: String,
    pub display_name: String,
    pub weight: f64,
    /// Identifier the upstream provider uses for this asset, when it differs from `code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl AssetConfig {
    pub fn new(code: impl Into<String>, display_name: impl Into<String>, weight: f64) -> Self {
        Self {
            code: code.into().to_uppercase(),
            display_name: display_name.into(),
            weight,
            provider_id: None,
        }
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedAsset {
    #[serde(flatten)]
    pub config: AssetConfig,
    pub rate: f64,
    pub origin: RateOrigin,
}

impl RatedAsset {
    pub fn code(&self) -> &str {
        &self.config.code
    }

    pub fn weight(&self) -> f64 {
        self.config.weight
    }
}

/// One fully reconciled basket. Never mutated after construction; the cache
/// swaps whole snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub class: AssetClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_code: Option<String>,
    pub assets: Vec<RatedAsset>,
    pub fetched_at: DateTime<Utc>,
    /// Codes whose rate came from the baseline document.
    pub used_baseline: Vec<String>,
    /// Codes that fell through to the static default table.
    pub missing: Vec<String>,
}

impl RateSnapshot {
    pub fn get(&self, code: &str) -> Option<&RatedAsset> {
        let code = code.to_uppercase();
        self.assets.iter().find(|a| a.config.code == code)
    }

    pub fn is_reference(&self, code: &str) -> bool {
        self.reference_code.as_deref() == Some(code)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Trusted last-known-good rates, used only when the live source cannot
/// supply a code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fiat: HashMap<String, f64>,
    #[serde(default)]
    pub crypto: HashMap<String, f64>,
    /// Last known AVGX value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avgx_value: Option<f64>,
}

impl Baseline {
    pub fn rates_for(&self, class: AssetClass) -> &HashMap<String, f64> {
        match class {
            AssetClass::Fiat => &self.fiat,
            AssetClass::Crypto => &self.crypto,
        }
    }

    /// Upper-cases all codes so lookups match normalized asset codes.
    pub fn normalized(self) -> Self {
        let upper = |m: HashMap<String, f64>| {
            m.into_iter()
                .map(|(k, v)| (k.to_uppercase(), v))
                .collect::<HashMap<_, _>>()
        };
        Self {
            as_of: self.as_of,
            fiat: upper(self.fiat),
            crypto: upper(self.crypto),
            avgx_value: self.avgx_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexValue {
    pub value: f64,
    /// Percent change against the value recorded roughly 24h earlier. `None`
    /// when no such value exists, which is distinct from "no change".
    pub change_24h_pct: Option<f64>,
    pub fiat_average: f64,
    pub crypto_average: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}
