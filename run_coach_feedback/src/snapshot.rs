use run_coach_lib::{position_fix::PositionFix, tracker::Milestone};
use serde::Serialize;

use crate::{FeedbackError, RemoteConfig, SNAPSHOT_PATH};

/// One performance snapshot row, persisted when a milestone fires.
#[derive(Debug, Serialize)]
pub struct PerformanceSnapshot {
    pub session_id: String,
    pub snapshot_at_distance_meters: u32,
    pub snapshot_at_duration_seconds: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_meters: f64,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_pace_min_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_speed_ms: Option<f64>,
}

impl PerformanceSnapshot {
    pub fn at_milestone(
        session_id: &str,
        milestone: &Milestone,
        elapsed_seconds: i64,
        pace: Option<f64>,
        fix: &PositionFix,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            snapshot_at_distance_meters: milestone.meters,
            snapshot_at_duration_seconds: elapsed_seconds,
            latitude: fix.latitude(),
            longitude: fix.longitude(),
            elevation_meters: fix.altitude,
            source: "native_gps",
            current_pace_min_km: pace,
            current_speed_ms: fix.speed_ms(),
        }
    }
}

/// Client for the remote snapshot-persistence endpoint. Fire-and-forget:
/// callers log failures and move on, nothing is retried.
#[derive(Clone)]
pub struct SnapshotClient {
    client: reqwest::Client,
}

impl SnapshotClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn save(&self, config: &RemoteConfig, snapshot: &PerformanceSnapshot) -> Result<(), FeedbackError> {
        if snapshot.session_id.is_empty() {
            return Err(FeedbackError::Configuration("No session id for snapshot".to_string()));
        }

        if config.base_url.is_empty() || config.api_key.is_empty() || config.user_token.is_empty() {
            return Err(FeedbackError::Configuration("Snapshot endpoint not configured".to_string()));
        }

        let url = format!("{}{}", config.base_url, SNAPSHOT_PATH);

        let response = self.client
            .post(&url)
            .header("apikey", &config.api_key)
            .header("Prefer", "return=representation")
            .bearer_auth(&config.user_token)
            .json(snapshot)
            .send()
            .await
            .map_err(|err| FeedbackError::Snapshot(format!("Snapshot request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(FeedbackError::Snapshot(format!("Snapshot endpoint returned {}", response.status())));
        }

        tracing::debug!("Snapshot saved at {} m", snapshot.snapshot_at_distance_meters);
        Ok(())
    }
}

#[cfg(test)]
use chrono::Utc;
#[cfg(test)]
use geo_types::Point;

#[test]
fn snapshot_wire_format_skips_unavailable_fields() {
    let fix = PositionFix::new(Point::new(9.1, 55.2), 5.0, 31.5, -1.0, 180.0, Utc::now());
    let milestone = Milestone { index: 1, meters: 500 };

    let snapshot = PerformanceSnapshot::at_milestone("abc-123", &milestone, 150, None, &fix);
    let json = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(json["session_id"], "abc-123");
    assert_eq!(json["snapshot_at_distance_meters"], 500);
    assert_eq!(json["snapshot_at_duration_seconds"], 150);
    assert_eq!(json["latitude"], 55.2);
    assert_eq!(json["longitude"], 9.1);
    assert_eq!(json["elevation_meters"], 31.5);
    assert_eq!(json["source"], "native_gps");
    assert!(json.get("current_pace_min_km").is_none());
    assert!(json.get("current_speed_ms").is_none());
}

#[test]
fn snapshot_includes_pace_and_speed_when_available() {
    let fix = PositionFix::new(Point::new(9.1, 55.2), 5.0, 31.5, 2.8, 180.0, Utc::now());
    let milestone = Milestone { index: 2, meters: 1000 };

    let snapshot = PerformanceSnapshot::at_milestone("abc-123", &milestone, 300, Some(5.0), &fix);
    let json = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(json["current_pace_min_km"], 5.0);
    assert_eq!(json["current_speed_ms"], 2.8);
}

#[tokio::test]
async fn unconfigured_snapshot_is_abandoned() {
    let client = SnapshotClient::new(reqwest::Client::new());
    let config = RemoteConfig {
        base_url: String::new(),
        api_key: String::new(),
        user_token: String::new(),
        voice: "alloy".to_string(),
        speed: 1.0,
    };

    let fix = PositionFix::new(Point::new(9.1, 55.2), 5.0, 31.5, 2.8, 180.0, Utc::now());
    let snapshot = PerformanceSnapshot::at_milestone("abc-123", &Milestone { index: 1, meters: 500 }, 150, None, &fix);

    let result = client.save(&config, &snapshot).await;
    assert!(matches!(result, Err(FeedbackError::Configuration(_))));
}
