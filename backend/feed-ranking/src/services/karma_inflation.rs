//! Karma Inflation Normalizer
//!
//! What a given karma score "means" drifts over the site's history. The
//! inflation series holds one multiplier per fixed-width time bucket; scaling a
//! post's score by the multiplier for its bucket makes posts from different
//! eras comparable for the `topAdjusted` sort.
//!
//! The series is process-wide, read on every request and replaced wholesale by
//! a periodic job (see `jobs::inflation_refresh`).

use crate::error::{FeedRankingError, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::info;

/// Wire form of the series, as produced by the offline batch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KarmaInflationRecord {
    pub start: DateTime<Utc>,
    pub interval_ms: i64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KarmaInflationRecord", into = "KarmaInflationRecord")]
pub struct KarmaInflationSeries {
    start: DateTime<Utc>,
    interval: Duration,
    values: Vec<f64>,
}

impl KarmaInflationSeries {
    pub fn new(start: DateTime<Utc>, interval: Duration, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(FeedRankingError::configuration(
                "karma inflation series must have at least one value",
            ));
        }
        if interval.num_milliseconds() <= 0 {
            return Err(FeedRankingError::configuration(
                "karma inflation interval must be positive",
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FeedRankingError::configuration(
                "karma inflation values must be finite",
            ));
        }
        Ok(Self {
            start,
            interval,
            values,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Bucket index for `t`, clamped to the ends of the series.
    pub fn bucket(&self, t: DateTime<Utc>) -> usize {
        let elapsed_ms = (t - self.start).num_milliseconds();
        let idx = elapsed_ms.div_euclid(self.interval.num_milliseconds());
        idx.clamp(0, self.values.len() as i64 - 1) as usize
    }

    pub fn multiplier(&self, t: DateTime<Utc>) -> f64 {
        self.values[self.bucket(t)]
    }

    /// Normalize `score` for a post dated `t`.
    pub fn adjust(&self, score: f64, t: DateTime<Utc>) -> f64 {
        score * self.multiplier(t)
    }
}

impl Default for KarmaInflationSeries {
    /// A single bucket of 1: adjusting is a no-op.
    fn default() -> Self {
        Self {
            start: Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            interval: Duration::days(1),
            values: vec![1.0],
        }
    }
}

impl TryFrom<KarmaInflationRecord> for KarmaInflationSeries {
    type Error = FeedRankingError;

    fn try_from(record: KarmaInflationRecord) -> Result<Self> {
        KarmaInflationSeries::new(
            record.start,
            Duration::milliseconds(record.interval_ms),
            record.values,
        )
    }
}

impl From<KarmaInflationSeries> for KarmaInflationRecord {
    fn from(series: KarmaInflationSeries) -> Self {
        Self {
            start: series.start,
            interval_ms: series.interval.num_milliseconds(),
            values: series.values,
        }
    }
}

/// Shared, swappable handle to the current series.
///
/// Readers take an `Arc` snapshot and never see a half-written series; the
/// lock is only held long enough to clone or replace the pointer.
#[derive(Debug, Clone, Default)]
pub struct KarmaInflationHandle {
    current: Arc<RwLock<Arc<KarmaInflationSeries>>>,
}

impl KarmaInflationHandle {
    pub fn new(series: KarmaInflationSeries) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(series))),
        }
    }

    pub fn snapshot(&self) -> Arc<KarmaInflationSeries> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            // A panicking writer cannot leave a torn pointer behind
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, series: KarmaInflationSeries) {
        let buckets = series.values.len();
        let next = Arc::new(series);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        info!(buckets, "Karma inflation series replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn series() -> KarmaInflationSeries {
        KarmaInflationSeries::new(at_ms(0), Duration::milliseconds(1000), vec![1.0, 2.0, 4.0]).unwrap()
    }

    #[test]
    fn test_adjust_clamps_to_series_ends() {
        let s = series();
        assert_eq!(s.adjust(10.0, at_ms(-500)), 10.0);
        assert_eq!(s.adjust(10.0, at_ms(1500)), 20.0);
        assert_eq!(s.adjust(10.0, at_ms(10_000)), 40.0);
    }

    #[test]
    fn test_bucket_edges() {
        let s = series();
        assert_eq!(s.bucket(at_ms(0)), 0);
        assert_eq!(s.bucket(at_ms(999)), 0);
        assert_eq!(s.bucket(at_ms(1000)), 1);
        assert_eq!(s.bucket(at_ms(-1)), 0);
    }

    #[test]
    fn test_default_series_is_noop() {
        let s = KarmaInflationSeries::default();
        for t in [at_ms(-10_000_000), at_ms(0), Utc::now()] {
            assert_eq!(s.adjust(37.0, t), 37.0);
        }
    }

    #[test]
    fn test_rejects_invalid_series() {
        assert!(KarmaInflationSeries::new(at_ms(0), Duration::milliseconds(1000), vec![]).is_err());
        assert!(KarmaInflationSeries::new(at_ms(0), Duration::zero(), vec![1.0]).is_err());
        assert!(
            KarmaInflationSeries::new(at_ms(0), Duration::milliseconds(10), vec![f64::NAN]).is_err()
        );
    }

    #[test]
    fn test_record_deserialization_validates() {
        let ok: KarmaInflationSeries = serde_json::from_str(
            r#"{"start":"1970-01-01T00:00:00Z","intervalMs":1000,"values":[1,2,4]}"#,
        )
        .unwrap();
        assert_eq!(ok, series());

        let empty = serde_json::from_str::<KarmaInflationSeries>(
            r#"{"start":"1970-01-01T00:00:00Z","intervalMs":1000,"values":[]}"#,
        );
        assert!(empty.is_err());
    }

    #[test]
    fn test_handle_swap_keeps_old_snapshots() {
        let handle = KarmaInflationHandle::default();
        let before = handle.snapshot();
        handle.replace(series());
        let after = handle.snapshot();

        assert_eq!(before.values(), &[1.0]);
        assert_eq!(after.values(), &[1.0, 2.0, 4.0]);
    }
}
