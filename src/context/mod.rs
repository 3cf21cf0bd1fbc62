//! Shared application metrics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{classifier::Status, models::Reading};

/// A struct to hold application metrics.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// The time the application started.
    pub start_time: tokio::time::Instant,
    /// Number of feed polls that produced a reading.
    pub readings_ingested: u64,
    /// Number of feed polls that failed.
    pub poll_failures: u64,
    /// The most recent reading, for the alert check and status endpoint.
    pub latest_reading: Option<Reading>,
    /// When the feed last answered successfully. The staleness indicator:
    /// a failed poll keeps the previous value.
    pub last_feed_update: Option<DateTime<Utc>>,
    /// Live status of the latest reading.
    pub last_status: Option<Status>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            start_time: tokio::time::Instant::now(),
            readings_ingested: 0,
            poll_failures: 0,
            latest_reading: None,
            last_feed_update: None,
            last_status: None,
        }
    }
}

/// Shared application metrics handle.
#[derive(Clone, Default)]
pub struct AppMetrics {
    /// Shared metrics.
    pub metrics: Arc<RwLock<Metrics>>,
}

impl AppMetrics {
    /// Records a successful feed poll.
    pub async fn record_poll(&self, latest: Option<Reading>, status: Option<Status>) {
        let mut metrics = self.metrics.write().await;
        metrics.last_feed_update = Some(Utc::now());
        if let Some(reading) = latest {
            metrics.readings_ingested += 1;
            metrics.latest_reading = Some(reading);
        }
        if status.is_some() {
            metrics.last_status = status;
        }
    }

    /// Records a failed feed poll; the last-known reading stays in place.
    pub async fn record_poll_failure(&self) {
        self.metrics.write().await.poll_failures += 1;
    }

    /// The most recent reading, if any poll has succeeded yet.
    pub async fn latest_reading(&self) -> Option<Reading> {
        self.metrics.read().await.latest_reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ReadingBuilder;

    #[tokio::test]
    async fn test_record_poll_tracks_latest_reading() {
        let metrics = AppMetrics::default();
        let reading = ReadingBuilder::new().tds(130.0).build();

        metrics.record_poll(Some(reading), Some(Status::Normal)).await;

        assert_eq!(metrics.latest_reading().await.unwrap().tds, 130.0);
        let inner = metrics.metrics.read().await;
        assert_eq!(inner.readings_ingested, 1);
        assert!(inner.last_feed_update.is_some());
    }

    #[tokio::test]
    async fn test_poll_failure_keeps_last_known_reading() {
        let metrics = AppMetrics::default();
        metrics.record_poll(Some(ReadingBuilder::new().build()), Some(Status::Normal)).await;

        metrics.record_poll_failure().await;

        assert!(metrics.latest_reading().await.is_some());
        assert_eq!(metrics.metrics.read().await.poll_failures, 1);
    }
}
