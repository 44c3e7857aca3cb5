use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};
use crate::index::{DEFAULT_FIAT_SHARE, DEFAULT_HISTORY_CAPACITY};
use crate::rates::providers::coingecko::COINGECKO_API_BASE;
use crate::rates::providers::open_exchange_rates::OPEN_EXCHANGE_RATES_BASE_URL;
use crate::rates::{RetryPolicy, DEFAULT_TTL};

/// Environment variable holding the fiat provider's API key, unless overridden.
pub const DEFAULT_API_KEY_ENV: &str = "AVGX_FX_API_KEY";

fn default_ttl() -> Duration {
    DEFAULT_TTL
}

/// Cache settings shared by both baskets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How old a snapshot can be before the next read refreshes it.
    #[serde(
        default = "default_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

/// Index composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Weight of the fiat basket in the blended index, in `[0, 1]`.
    pub fiat_share: f64,

    /// Number of index points kept for history queries.
    pub history_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            fiat_share: DEFAULT_FIAT_SHARE,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FiatSourceConfig {
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    /// Fiat asset fixed at 1.0.
    pub reference_code: String,
}

impl Default for FiatSourceConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_EXCHANGE_RATES_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            reference_code: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoSourceConfig {
    pub base_url: String,
}

impl Default for CryptoSourceConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub fiat: FiatSourceConfig,
    pub crypto: CryptoSourceConfig,
}

/// Locations of the static documents. Relative paths resolve against the
/// config file's directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub fiat_assets: PathBuf,
    pub crypto_assets: PathBuf,
    pub baseline: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            fiat_assets: PathBuf::from("data/fiat_assets.json"),
            crypto_assets: PathBuf::from("data/crypto_assets.json"),
            baseline: PathBuf::from("data/baseline.json"),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub index: IndexConfig,
    pub sources: SourcesConfig,
    pub data: DataConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.index.fiat_share) {
            anyhow::bail!(
                "index.fiat_share must be between 0 and 1, got {}",
                self.index.fiat_share
            );
        }
        if self.cache.ttl.is_zero() {
            anyhow::bail!("cache.ttl must be greater than zero");
        }
        if self.retry.attempt_timeout.is_zero() {
            anyhow::bail!("retry.attempt_timeout must be greater than zero");
        }
        if self.sources.fiat.reference_code.trim().is_empty() {
            anyhow::bail!("sources.fiat.reference_code must not be empty");
        }
        Ok(())
    }

    fn resolve_path(config_dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            config_dir.join(path)
        }
    }

    /// Resolve document paths against `config_dir`.
    pub fn resolve(self, config_dir: &Path) -> ResolvedConfig {
        let data = DataConfig {
            fiat_assets: Self::resolve_path(config_dir, &self.data.fiat_assets),
            crypto_assets: Self::resolve_path(config_dir, &self.data.crypto_assets),
            baseline: Self::resolve_path(config_dir, &self.data.baseline),
        };
        ResolvedConfig {
            cache: self.cache,
            retry: self.retry,
            index: self.index,
            sources: self.sources,
            data,
        }
    }
}

/// Loaded configuration with document paths made absolute.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub index: IndexConfig,
    pub sources: SourcesConfig,
    pub data: DataConfig,
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        Ok(Config::load(&config_path)?.resolve(config_dir))
    }

    /// Load config, using defaults resolved against the intended config
    /// directory if the file doesn't exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Config::default().resolve(config_dir))
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./avgx.toml` if it exists in current directory
/// 2. `<platform config dir>/avgx/avgx.toml`
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("avgx.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("avgx").join("avgx.toml");
    }

    local_config
}
