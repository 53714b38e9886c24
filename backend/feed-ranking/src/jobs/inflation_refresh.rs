//! Karma Inflation Refresh Job
//!
//! Periodically reloads the karma inflation series and swaps it into the
//! shared handle. Requests compiled before a swap keep the snapshot they took.
//!
//! A failed load (missing file, malformed JSON, empty values, non-positive
//! interval) is logged and the previous series stays in place.

use crate::config::InflationConfig;
use crate::error::Result;
use crate::services::karma_inflation::{
    KarmaInflationHandle, KarmaInflationRecord, KarmaInflationSeries,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

#[async_trait]
pub trait KarmaInflationSource: Send + Sync {
    async fn load(&self) -> Result<KarmaInflationSeries>;

    fn describe(&self) -> String;
}

/// Reads `{start, intervalMs, values}` JSON from disk.
#[derive(Debug, Clone)]
pub struct FileInflationSource {
    path: PathBuf,
}

impl FileInflationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KarmaInflationSource for FileInflationSource {
    async fn load(&self) -> Result<KarmaInflationSeries> {
        let raw = tokio::fs::read(&self.path).await?;
        let record: KarmaInflationRecord = serde_json::from_slice(&raw)?;
        KarmaInflationSeries::try_from(record)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Load from `source` and swap into `handle`. On error the handle is untouched.
pub async fn refresh_inflation_series(
    handle: &KarmaInflationHandle,
    source: &dyn KarmaInflationSource,
) -> Result<()> {
    let series = source.load().await?;
    tracing::debug!(
        source = %source.describe(),
        buckets = series.values().len(),
        "Loaded karma inflation series"
    );
    handle.replace(series);
    Ok(())
}

/// Start the refresh loop. The first tick fires immediately.
pub fn spawn_inflation_refresher(
    handle: KarmaInflationHandle,
    source: Arc<dyn KarmaInflationSource>,
    config: &InflationConfig,
) -> JoinHandle<()> {
    let period = config.refresh_interval.max(Duration::from_millis(1));

    tracing::info!(
        interval_secs = period.as_secs(),
        source = %source.describe(),
        "Starting karma inflation refresher"
    );

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let cycle_start = Instant::now();

            if let Err(e) = refresh_inflation_series(&handle, source.as_ref()).await {
                tracing::warn!(
                    error = %e,
                    source = %source.describe(),
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "Karma inflation refresh failed, keeping previous series"
                );
            }
        }
    })
}
