//! Client for a ThingSpeak-style channel feed.
//!
//! The feed exposes `GET /channels/{id}/feeds.json?results=N` returning an
//! entry list whose `field1`/`field2`/`field3` columns carry voltage, TDS
//! and temperature as decimal strings.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use url::Url;

use super::{FeedError, TelemetrySource};
use crate::{
    config::FeedConfig,
    models::{Reading, TelemetrySnapshot},
};

/// The raw feed response envelope.
#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    feeds: Vec<FeedEntry>,
}

/// One raw feed entry. Field values arrive as decimal strings and may be
/// null when the sensor skipped a field.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    created_at: Option<DateTime<Utc>>,
    field1: Option<String>,
    field2: Option<String>,
    field3: Option<String>,
}

impl FeedEntry {
    /// Normalizes the entry into a [`Reading`].
    ///
    /// A missing field reads as `0`; an entry with an unparseable field, a
    /// negative TDS or no timestamp is dropped, matching the feed's
    /// occasional garbage rows.
    fn normalize(&self) -> Option<Reading> {
        let timestamp = self.created_at?;
        let tds = parse_field(self.field2.as_deref())?;
        if tds < 0.0 {
            return None;
        }
        Some(Reading {
            voltage: parse_field(self.field1.as_deref())?,
            tds,
            temperature: parse_field(self.field3.as_deref())?,
            timestamp,
        })
    }
}

/// Parses a feed field: absent or empty means `0`, malformed means the
/// whole entry is skipped.
fn parse_field(raw: Option<&str>) -> Option<f64> {
    match raw {
        None => Some(0.0),
        Some(s) if s.trim().is_empty() => Some(0.0),
        Some(s) => s.trim().parse().ok(),
    }
}

/// A [`TelemetrySource`] polling the cloud channel feed over HTTP.
pub struct ChannelFeedClient {
    feeds_url: Url,
    read_api_key: Option<String>,
    results: u32,
    client: Arc<ClientWithMiddleware>,
}

impl ChannelFeedClient {
    /// Creates a new feed client for the configured channel.
    pub fn new(config: &FeedConfig, client: Arc<ClientWithMiddleware>) -> Result<Self, url::ParseError> {
        let feeds_url =
            config.base_url.join(&format!("channels/{}/feeds.json", config.channel_id))?;
        Ok(Self {
            feeds_url,
            read_api_key: config.read_api_key.clone(),
            results: config.results,
            client,
        })
    }
}

#[async_trait]
impl TelemetrySource for ChannelFeedClient {
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot, FeedError> {
        let mut url = self.feeds_url.clone();
        url.query_pairs_mut().append_pair("results", &self.results.to_string());
        if let Some(key) = &self.read_api_key {
            url.query_pairs_mut().append_pair("api_key", key);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }

        let body: FeedResponse = response.json().await?;
        let history: Vec<Reading> =
            body.feeds.iter().filter_map(FeedEntry::normalize).collect();

        tracing::debug!(
            entries = body.feeds.len(),
            readings = history.len(),
            "Fetched feed snapshot."
        );

        Ok(TelemetrySnapshot { latest: history.last().copied(), history })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_response(json: &str) -> TelemetrySnapshot {
        let body: FeedResponse = serde_json::from_str(json).unwrap();
        let history: Vec<Reading> = body.feeds.iter().filter_map(FeedEntry::normalize).collect();
        TelemetrySnapshot { latest: history.last().copied(), history }
    }

    #[test]
    fn test_normalizes_feed_entries_in_order() {
        let snapshot = parse_response(
            r#"{
                "feeds": [
                    {"created_at": "2026-08-01T10:00:00Z", "field1": "3.30", "field2": "120.5", "field3": "26.1"},
                    {"created_at": "2026-08-01T10:00:15Z", "field1": "3.29", "field2": "121.0", "field3": "26.2"}
                ]
            }"#,
        );

        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.history[0].tds, 120.5);
        assert_eq!(snapshot.history[1].voltage, 3.29);
        assert_eq!(snapshot.latest.unwrap().tds, 121.0);
    }

    #[test]
    fn test_missing_fields_read_as_zero() {
        let snapshot = parse_response(
            r#"{"feeds": [{"created_at": "2026-08-01T10:00:00Z", "field2": "95.0"}]}"#,
        );

        let reading = snapshot.latest.unwrap();
        assert_eq!(reading.voltage, 0.0);
        assert_eq!(reading.tds, 95.0);
        assert_eq!(reading.temperature, 0.0);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let snapshot = parse_response(
            r#"{
                "feeds": [
                    {"created_at": "2026-08-01T10:00:00Z", "field1": "3.3", "field2": "garbage", "field3": "26.0"},
                    {"created_at": "2026-08-01T10:00:15Z", "field1": "3.3", "field2": "130.0", "field3": "26.0"}
                ]
            }"#,
        );

        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.latest.unwrap().tds, 130.0);
    }

    #[test]
    fn test_negative_tds_entries_are_dropped() {
        let snapshot = parse_response(
            r#"{"feeds": [{"created_at": "2026-08-01T10:00:00Z", "field1": "3.3", "field2": "-4.0", "field3": "26.0"}]}"#,
        );

        assert!(snapshot.history.is_empty());
    }

    #[test]
    fn test_empty_feed_yields_empty_snapshot() {
        let snapshot = parse_response(r#"{"feeds": []}"#);
        assert!(snapshot.latest.is_none());
        assert!(snapshot.history.is_empty());
    }
}
