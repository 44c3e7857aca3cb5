mod average;
mod cache;
pub mod defaults;
mod error;
mod models;
pub mod providers;
mod reconcile;
mod retry;
mod source;

pub use average::{usd_value, weighted_average};
pub use cache::{RateCache, DEFAULT_TTL};
pub use error::{RateError, RateResult};
pub use models::{
    AssetClass, AssetConfig, Baseline, IndexPoint, IndexValue, RateConvention, RateOrigin,
    RateSnapshot, RatedAsset,
};
pub use reconcile::{reconcile, BasketSpec};
pub use retry::{with_retry, RetryPolicy};
pub use source::{OfflineSource, RateSource};
