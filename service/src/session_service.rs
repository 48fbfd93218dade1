use chrono::Utc;
use run_coach_feedback::FeedbackManager;
use run_coach_lib::{
    position_fix::PositionFix,
    tracker::{DistanceTracker, TrackerConfig},
};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

/// Update published to all observers for every accepted fix.
#[derive(Debug, Clone, Serialize)]
pub struct TrackUpdate {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub distance: f64,
    pub total_distance: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub tracking: bool,
    pub distance: f64,
    pub milestone_index: u32,
}

/// Drives the distance tracker from the incoming fix stream and dispatches
/// milestone side work. Fix handling is serialized by the tracker mutex;
/// feedback runs in spawned tasks so it never blocks ingestion.
pub struct SessionService {
    tracker: Mutex<DistanceTracker>,
    feedback: FeedbackManager,
    session_id: String,
    feedback_enabled: bool,
    // Channel used to send track updates to all connected observers.
    pub tx: broadcast::Sender<TrackUpdate>,
}

impl SessionService {
    pub fn new(
        config: TrackerConfig,
        feedback: FeedbackManager,
        session_id: String,
        feedback_enabled: bool,
        tx: broadcast::Sender<TrackUpdate>,
    ) -> Self {
        Self {
            tracker: Mutex::new(DistanceTracker::new(config)),
            feedback,
            session_id,
            feedback_enabled,
            tx,
        }
    }

    /// Idempotent: starting while already tracking reports the current state.
    pub async fn start(&self) -> bool {
        let fresh = self.tracker.lock().await.start(Utc::now());
        if fresh {
            tracing::info!("Tracking started");
        } else {
            tracing::info!("Already tracking");
        }
        fresh
    }

    pub async fn handle_fix(&self, fix: PositionFix) {
        let mut tracker = self.tracker.lock().await;
        let result = tracker.ingest(&fix);
        if !result.accepted {
            return;
        }

        let total_distance = tracker.distance();
        let started_at = tracker.started_at();
        drop(tracker);

        tracing::debug!("+{:.1} m -> total {:.1} m (accuracy {:.1} m)", result.distance_delta, total_distance, fix.accuracy);

        let _ = self.tx.send(TrackUpdate {
            latitude: fix.latitude(),
            longitude: fix.longitude(),
            accuracy: fix.accuracy,
            altitude: fix.altitude,
            speed: fix.speed,
            heading: fix.heading,
            distance: result.distance_delta,
            total_distance,
            timestamp: fix.timestamp.timestamp_millis(),
        });

        if let (Some(milestone), Some(started_at)) = (result.milestone, started_at) {
            if self.feedback_enabled {
                let feedback = self.feedback.clone();
                let session_id = self.session_id.clone();
                tokio::spawn(async move {
                    feedback.milestone_feedback(milestone, started_at, fix, &session_id).await;
                });
            }
        }
    }

    pub async fn stop(&self) -> f64 {
        let final_distance = self.tracker.lock().await.stop();
        tracing::info!("Tracking stopped, final distance {:.1} m", final_distance);
        final_distance
    }

    pub async fn reset(&self) {
        self.tracker.lock().await.reset();
        tracing::info!("Distance reset");
    }

    pub async fn status(&self) -> SessionStatus {
        let tracker = self.tracker.lock().await;
        SessionStatus {
            tracking: tracker.is_tracking(),
            distance: tracker.distance(),
            milestone_index: tracker.milestone_index(),
        }
    }

    /// Session-complete flow: speaks the workout summary, bounded by the
    /// playback wait cap. Usable after `stop` since the tracker retains the
    /// final distance and start time.
    pub async fn complete(&self) {
        let (distance, started_at) = {
            let tracker = self.tracker.lock().await;
            (tracker.distance(), tracker.started_at())
        };

        let Some(started_at) = started_at else {
            tracing::error!("Session start time not available for completion audio");
            return;
        };

        let elapsed_seconds = Utc::now().signed_duration_since(started_at).num_seconds();
        self.feedback.completion_feedback(distance, elapsed_seconds).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};
    use geo_types::Point;
    use run_coach_feedback::{RemoteConfig, audio::NullSink};

    use super::*;

    fn service() -> SessionService {
        let feedback = FeedbackManager::new(
            RemoteConfig::new(String::new(), String::new(), String::new()),
            Arc::new(NullSink),
        )
        .unwrap();
        let (tx, _rx) = broadcast::channel(100);
        SessionService::new(TrackerConfig::default(), feedback, "abc-123".to_string(), true, tx)
    }

    fn fix(lat: f64, seconds: i64) -> PositionFix {
        let timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap() + Duration::seconds(seconds);
        PositionFix::new(Point::new(9.0, lat), 5.0, 20.0, 2.5, 0.0, timestamp)
    }

    fn north(lat: f64, meters: f64) -> f64 {
        lat + (meters / 6_372_800.0).to_degrees()
    }

    #[tokio::test]
    async fn accepted_fixes_are_broadcast() {
        let service = service();
        let mut rx = service.tx.subscribe();

        assert!(service.start().await);
        service.handle_fix(fix(55.0, 0)).await;
        service.handle_fix(fix(north(55.0, 10.0), 3)).await;

        let bootstrap = rx.recv().await.unwrap();
        assert_eq!(bootstrap.total_distance, 0.0);

        let update = rx.recv().await.unwrap();
        assert!((update.distance - 10.0).abs() < 0.1);
        assert!((update.total_distance - 10.0).abs() < 0.1);
    }

    #[tokio::test]
    async fn rejected_fixes_are_not_broadcast() {
        let service = service();
        let mut rx = service.tx.subscribe();

        service.start().await;
        service.handle_fix(fix(55.0, 0)).await;

        let mut inaccurate = fix(north(55.0, 10.0), 3);
        inaccurate.accuracy = 25.0;
        service.handle_fix(inaccurate).await;

        rx.recv().await.unwrap(); // bootstrap
        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn stop_reports_final_distance_and_start_is_idempotent() {
        let service = service();

        service.start().await;
        assert!(!service.start().await);

        service.handle_fix(fix(55.0, 0)).await;
        service.handle_fix(fix(north(55.0, 10.0), 3)).await;

        let final_distance = service.stop().await;
        assert!((final_distance - 10.0).abs() < 0.1);

        let status = service.status().await;
        assert!(!status.tracking);
        assert!((status.distance - 10.0).abs() < 0.1);

        service.reset().await;
        assert_eq!(service.status().await.distance, 0.0);
    }
}
