//! Combines the fiat and crypto basket averages into the AVGX value and keeps a
//! short rolling history of it.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::rates::{IndexPoint, IndexValue};

/// Share of the fiat basket in the blended index; the crypto basket gets the rest.
pub const DEFAULT_FIAT_SHARE: f64 = 0.5;

/// Points kept in memory (one per refresh, so a day at the default 60s TTL).
pub const DEFAULT_HISTORY_CAPACITY: usize = 1440;

/// `fiat_share · fiat + (1 − fiat_share) · crypto`.
pub fn blend(fiat_average: f64, crypto_average: f64, fiat_share: f64) -> f64 {
    fiat_share * fiat_average + (1.0 - fiat_share) * crypto_average
}

/// Percent change from `prior` to `value`, or `None` when there is no usable prior.
pub fn percent_change(value: f64, prior: Option<f64>) -> Option<f64> {
    let prior = prior.filter(|p| p.is_finite() && *p > 0.0)?;
    Some((value - prior) / prior * 100.0)
}

/// Builds an [`IndexValue`] with the default fiat share.
pub fn compose_index(
    fiat_average: f64,
    crypto_average: f64,
    prior: Option<f64>,
    timestamp: DateTime<Utc>,
) -> IndexValue {
    compose_with_share(fiat_average, crypto_average, DEFAULT_FIAT_SHARE, prior, timestamp)
}

fn compose_with_share(
    fiat_average: f64,
    crypto_average: f64,
    fiat_share: f64,
    prior: Option<f64>,
    timestamp: DateTime<Utc>,
) -> IndexValue {
    let value = blend(fiat_average, crypto_average, fiat_share);
    IndexValue {
        value,
        change_24h_pct: percent_change(value, prior),
        fiat_average,
        crypto_average,
        timestamp,
    }
}

pub struct IndexComposer {
    fiat_share: f64,
    capacity: usize,
    history: Mutex<VecDeque<IndexPoint>>,
}

impl IndexComposer {
    /// `fiat_share` is clamped into `[0, 1]`; a non-finite share falls back to
    /// [`DEFAULT_FIAT_SHARE`].
    pub fn new(fiat_share: f64) -> Self {
        let fiat_share = if fiat_share.is_finite() {
            fiat_share.clamp(0.0, 1.0)
        } else {
            DEFAULT_FIAT_SHARE
        };
        Self {
            fiat_share,
            capacity: DEFAULT_HISTORY_CAPACITY,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn fiat_share(&self) -> f64 {
        self.fiat_share
    }

    /// Adds a known historical value, e.g. the baseline's last index value.
    pub fn seed(&self, point: IndexPoint) {
        self.record(point);
    }

    /// Composes the index as of `as_of` and records it.
    ///
    /// Composing twice for the same `as_of` replaces the earlier point, so
    /// repeated reads of an unchanged cache do not grow the history.
    pub fn compose(&self, fiat_average: f64, crypto_average: f64, as_of: DateTime<Utc>) -> IndexValue {
        let index = self.preview(fiat_average, crypto_average, as_of);
        self.record(IndexPoint {
            timestamp: as_of,
            value: index.value,
        });
        index
    }

    /// Same value as [`compose`](Self::compose), leaving the history untouched.
    pub fn preview(&self, fiat_average: f64, crypto_average: f64, as_of: DateTime<Utc>) -> IndexValue {
        let prior = self.value_before(as_of - Duration::hours(24));
        compose_with_share(fiat_average, crypto_average, self.fiat_share, prior, as_of)
    }

    /// Newest recorded value at or before `cutoff`.
    pub fn value_before(&self, cutoff: DateTime<Utc>) -> Option<f64> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history
            .iter()
            .rev()
            .find(|p| p.timestamp <= cutoff)
            .map(|p| p.value)
    }

    /// Recorded points, oldest first.
    pub fn history(&self) -> Vec<IndexPoint> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.iter().copied().collect()
    }

    fn record(&self, point: IndexPoint) {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());

        match history.back() {
            Some(last) if last.timestamp == point.timestamp => {
                history.pop_back();
            }
            // Keep the series ordered; late points are dropped.
            Some(last) if last.timestamp > point.timestamp => {
                debug!(timestamp = %point.timestamp, "ignoring out-of-order index point");
                return;
            }
            _ => {}
        }

        history.push_back(point);
        while history.len() > self.capacity {
            history.pop_front();
        }
    }
}

impl Default for IndexComposer {
    fn default() -> Self {
        Self::new(DEFAULT_FIAT_SHARE)
    }
}
