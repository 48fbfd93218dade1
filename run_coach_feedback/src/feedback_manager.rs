use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use run_coach_lib::{pace::pace_min_per_km, position_fix::PositionFix, tracker::Milestone};

use crate::{
    FeedbackError,
    audio::{self, AudioSink, PLAYBACK_WAIT},
    messages,
    snapshot::{PerformanceSnapshot, SnapshotClient},
    tts::SpeechClient,
};

/// Remote endpoint configuration shared by the speech and snapshot clients.
/// Empty fields mean the dependent call is abandoned with a log line.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub user_token: String,
    pub voice: String,
    pub speed: f64,
}

impl RemoteConfig {
    pub fn new(base_url: String, api_key: String, user_token: String) -> Self {
        Self {
            base_url,
            api_key,
            user_token,
            voice: "alloy".to_string(),
            speed: 1.0,
        }
    }
}

/// The milestone side-effect pipeline: voice message, speech synthesis,
/// playback and snapshot persistence. Clone-shareable; meant to be driven
/// from spawned tasks so a slow remote call never blocks fix processing.
#[derive(Clone)]
pub struct FeedbackManager {
    config: Arc<RemoteConfig>,
    speech: SpeechClient,
    snapshots: SnapshotClient,
    sink: Arc<dyn AudioSink>,
}

impl FeedbackManager {
    pub fn new(config: RemoteConfig, sink: Arc<dyn AudioSink>) -> Result<Self, FeedbackError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| FeedbackError::Configuration(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            config: Arc::new(config),
            speech: SpeechClient::new(client.clone()),
            snapshots: SnapshotClient::new(client),
            sink,
        })
    }

    /// Side work for one fired milestone. Every failure degrades to a log
    /// line; the caller never sees an error and the tracker keeps counting.
    pub async fn milestone_feedback(
        &self,
        milestone: Milestone,
        started_at: DateTime<Utc>,
        fix: PositionFix,
        session_id: &str,
    ) {
        let elapsed_seconds = fix.timestamp.signed_duration_since(started_at).num_seconds();
        let pace = pace_min_per_km(milestone.meters as f64, elapsed_seconds as f64);

        let message = messages::coaching_message(milestone.meters, elapsed_seconds, pace);
        tracing::info!("{} m milestone reached, speaking: {}", milestone.meters, message);

        match self.speech.synthesize(&self.config, &message).await {
            // Fire-and-forget: milestone audio is not waited on
            Ok(audio) => drop(self.sink.start(audio)),
            Err(err) => tracing::error!("Speech synthesis failed: {:?}", err),
        }

        let snapshot = PerformanceSnapshot::at_milestone(session_id, &milestone, elapsed_seconds, pace, &fix);
        if let Err(err) = self.snapshots.save(&self.config, &snapshot).await {
            tracing::error!("Failed to save performance snapshot: {:?}", err);
        }
    }

    /// The explicit session-complete flow: speaks the workout summary and
    /// waits for playback, bounded by the 30 s cap.
    pub async fn completion_feedback(&self, meters: f64, elapsed_seconds: i64) {
        let pace = pace_min_per_km(meters, elapsed_seconds as f64);
        let message = messages::completion_message(meters as u32, elapsed_seconds, pace);
        tracing::info!("Workout complete, speaking: {}", message);

        match self.speech.synthesize(&self.config, &message).await {
            Ok(bytes) => audio::play_and_wait(self.sink.as_ref(), bytes, PLAYBACK_WAIT).await,
            Err(err) => tracing::error!("Completion audio failed: {:?}", err),
        }
    }
}

#[cfg(test)]
use crate::audio::NullSink;

#[tokio::test]
async fn milestone_feedback_survives_missing_configuration() {
    let manager = FeedbackManager::new(
        RemoteConfig::new(String::new(), String::new(), String::new()),
        Arc::new(NullSink),
    )
    .unwrap();

    let fix = PositionFix::new(geo_types::Point::new(9.0, 55.0), 5.0, 20.0, 2.5, 0.0, Utc::now());
    let milestone = Milestone { index: 1, meters: 500 };

    // Must not panic or error, only log
    manager.milestone_feedback(milestone, Utc::now(), fix, "abc-123").await;
}

#[tokio::test]
async fn completion_feedback_survives_missing_configuration() {
    let manager = FeedbackManager::new(
        RemoteConfig::new(String::new(), String::new(), String::new()),
        Arc::new(NullSink),
    )
    .unwrap();

    manager.completion_feedback(1234.0, 600).await;
}
