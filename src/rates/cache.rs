//! Per-class snapshot cache with TTL and single-flight refresh.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};

use super::reconcile::{reconcile, BasketSpec};
use super::retry::{with_retry, RetryPolicy};
use super::{AssetClass, AssetConfig, RateOrigin, RateSnapshot, RateSource};

/// Default time a snapshot stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Owns the current [`RateSnapshot`] for one asset class.
///
/// Readers get an `Arc` to an immutable snapshot; a refresh builds a new
/// snapshot and swaps the pointer. At most one refresh runs at a time: callers
/// that find the snapshot stale queue on the refresh gate and, once through,
/// re-check freshness before fetching, so a burst of callers produces one fetch.
pub struct RateCache {
    class: AssetClass,
    reference_code: Option<String>,
    assets: Vec<AssetConfig>,
    baseline: HashMap<String, f64>,
    source: Arc<dyn RateSource>,
    retry: RetryPolicy,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Arc<RateSnapshot>>>,
    refresh_gate: Mutex<()>,
}

impl RateCache {
    pub fn new(
        class: AssetClass,
        assets: Vec<AssetConfig>,
        baseline: HashMap<String, f64>,
        source: Arc<dyn RateSource>,
    ) -> Self {
        Self {
            class,
            reference_code: None,
            assets,
            baseline,
            source,
            retry: RetryPolicy::default(),
            ttl: DEFAULT_TTL,
            clock: Arc::new(SystemClock),
            current: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Fixes `code` at 1.0 in every snapshot.
    pub fn with_reference_code(mut self, code: impl Into<String>) -> Self {
        self.reference_code = Some(code.into().to_uppercase());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn class(&self) -> AssetClass {
        self.class
    }

    pub fn assets(&self) -> &[AssetConfig] {
        &self.assets
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot, refreshing first if it is missing or older than the TTL.
    pub async fn get(&self) -> Arc<RateSnapshot> {
        if let Some(snapshot) = self.fresh_snapshot() {
            debug!(class = %self.class, "rate cache hit");
            return snapshot;
        }

        let _guard = self.refresh_gate.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(snapshot) = self.fresh_snapshot() {
            debug!(class = %self.class, "rate cache refreshed by concurrent caller");
            return snapshot;
        }
        self.refresh_locked().await
    }

    /// Refreshes regardless of age.
    pub async fn refresh(&self) -> Arc<RateSnapshot> {
        let _guard = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Current snapshot without any I/O.
    pub fn peek(&self) -> Option<Arc<RateSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_stale(&self) -> bool {
        self.fresh_snapshot().is_none()
    }

    /// Age of the current snapshot, if any.
    pub fn age(&self) -> Option<Duration> {
        self.peek().map(|s| {
            (self.clock.now() - s.fetched_at)
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }

    fn fresh_snapshot(&self) -> Option<Arc<RateSnapshot>> {
        let snapshot = self.peek()?;
        let age = (self.clock.now() - snapshot.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        (age < self.ttl).then_some(snapshot)
    }

    /// Fetch (with retry), reconcile, swap. Caller must hold `refresh_gate`.
    async fn refresh_locked(&self) -> Arc<RateSnapshot> {
        let fetched = match with_retry(&self.retry, self.source.name(), || {
            self.source.fetch(&self.assets)
        })
        .await
        {
            Ok(rates) => Some(rates),
            Err(e) => {
                warn!(
                    class = %self.class,
                    source = self.source.name(),
                    error = %e,
                    "rate fetch failed, reconciling from baseline"
                );
                None
            }
        };

        let mut fetched_at = self.clock.now();
        if let Some(previous) = self.peek() {
            fetched_at = fetched_at.max(previous.fetched_at);
        }

        let basket = BasketSpec {
            class: self.class,
            reference_code: self.reference_code.as_deref(),
            assets: &self.assets,
        };
        let snapshot = Arc::new(reconcile(&basket, fetched.as_ref(), &self.baseline, fetched_at));

        let live = snapshot
            .assets
            .iter()
            .filter(|a| a.origin == RateOrigin::Live)
            .count();
        info!(
            class = %self.class,
            assets = snapshot.len(),
            live,
            baseline = snapshot.used_baseline.len(),
            default = snapshot.missing.len(),
            "rates refreshed"
        );

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        snapshot
    }
}
