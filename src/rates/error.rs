//! Rate engine error types.

use thiserror::Error;

use super::AssetClass;

/// Errors produced by the rate engine.
///
/// Fetch failures (`SourceUnavailable`, `MalformedResponse`) are absorbed at the
/// cache's refresh boundary and turned into baseline/default reconciliation.
/// Averaging failures propagate to callers since they indicate a configuration
/// defect.
#[derive(Debug, Error)]
pub enum RateError {
    /// Network failure, timeout, or non-2xx response from a provider.
    #[error("Rate source unavailable: {source_name} - {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    /// 2xx response whose body does not have the expected shape.
    #[error("Malformed response from {source_name}: {message}")]
    MalformedResponse {
        source_name: String,
        message: String,
    },

    #[error("Cannot average an empty {0} basket")]
    EmptyBasket(AssetClass),

    #[error("Total weight of the {0} basket is zero")]
    ZeroWeight(AssetClass),

    /// A weight that is negative, NaN or infinite.
    #[error("Invalid weight {weight} for {code} in the {class} basket")]
    InvalidWeight {
        class: AssetClass,
        code: String,
        weight: f64,
    },

    /// The weighted sum or total weight overflowed.
    #[error("Average of the {0} basket is not a finite number")]
    NonFiniteAverage(AssetClass),

    /// An asset list document could not be loaded.
    #[error("Asset configuration missing: {0}")]
    ConfigMissing(String),

    /// Conversion requested for a code that is not in any basket.
    #[error("Unknown currency code: {0}")]
    UnknownCode(String),
}

impl RateError {
    pub fn unavailable(source_name: &str, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn malformed(source_name: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for rate engine operations.
pub type RateResult<T> = Result<T, RateError>;
