use chrono::{DateTime, Duration, Utc};

use crate::{position_fix::PositionFix, util::haversine_distance};

/// Filtering and milestone parameters for a tracking run.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Fixes with a larger horizontal accuracy radius are discarded outright.
    pub accuracy_ceiling: f64,
    /// Stricter accuracy gate a fix must also pass before its delta is counted.
    pub delta_accuracy_ceiling: f64,
    /// Displacements below this are GPS dither, not movement.
    pub min_step: f64,
    /// Displacements at or above this are implausible single-step jumps.
    pub max_step: f64,
    /// Distance between voice feedback milestones.
    pub milestone_interval: f64,
    /// Minimum wall-clock gap between two milestone signals.
    pub feedback_gap_ms: i64,
    pub reference_policy: ReferencePolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            accuracy_ceiling: 20.0,
            delta_accuracy_ceiling: 15.0,
            min_step: 3.0,
            max_step: 100.0,
            milestone_interval: 500.0,
            feedback_gap_ms: 2000,
            reference_policy: ReferencePolicy::EveryValidFix,
        }
    }
}

/// Whether a fix whose delta was rejected still moves the reference point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Any fix that passed the coarse accuracy ceiling becomes the new
    /// reference, even when its delta was dropped as a jump or as dither.
    EveryValidFix,
    /// The reference only advances when the delta was counted.
    AcceptedOnly,
}

/// A crossed distance threshold that should trigger voice feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub index: u32,
    pub meters: u32,
}

/// Outcome of feeding one fix to the tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ingest {
    pub accepted: bool,
    pub distance_delta: f64,
    pub milestone: Option<Milestone>,
}

/// Mutable state of one tracking run. Created by `DistanceTracker::start`,
/// destroyed by `stop`.
struct TrackingSession {
    started_at: DateTime<Utc>,
    last_accepted: Option<PositionFix>,
    accumulated_distance: f64,
    last_milestone_index: u32,
    last_feedback_at: Option<DateTime<Utc>>,
}

impl TrackingSession {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            last_accepted: None,
            accumulated_distance: 0.0,
            last_milestone_index: 0,
            last_feedback_at: None,
        }
    }

    fn check_milestone(&mut self, config: &TrackerConfig, now: DateTime<Utc>) -> Option<Milestone> {
        if now < self.started_at {
            return None;
        }

        let current_index = (self.accumulated_distance / config.milestone_interval) as u32;
        if current_index <= self.last_milestone_index {
            return None;
        }

        if let Some(last) = self.last_feedback_at {
            if now.signed_duration_since(last) < Duration::milliseconds(config.feedback_gap_ms) {
                // Not queued: the crossing fires on a later ingest at the
                // then-current index once the gap has elapsed, so indexes
                // crossed inside the throttle window collapse into one signal.
                return None;
            }
        }

        self.last_milestone_index = current_index;
        self.last_feedback_at = Some(now);

        Some(Milestone {
            index: current_index,
            meters: (current_index as f64 * config.milestone_interval) as u32,
        })
    }
}

/// Consumes raw position fixes and produces a filtered, monotonically
/// increasing accumulated distance plus throttled milestone events.
/// Expects fixes from a single serialized stream; it has no locking of its own.
pub struct DistanceTracker {
    config: TrackerConfig,
    session: Option<TrackingSession>,
    final_distance: f64,
    last_started_at: Option<DateTime<Utc>>,
}

impl DistanceTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            session: None,
            final_distance: 0.0,
            last_started_at: None,
        }
    }

    /// Begins a new session. Returns false without touching any state when a
    /// session is already active.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.session.is_some() {
            return false;
        }

        self.final_distance = 0.0;
        self.last_started_at = None;
        self.session = Some(TrackingSession::new(now));
        true
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// Accumulated distance of the active session, or the final distance of
    /// the last stopped one.
    pub fn distance(&self) -> f64 {
        match &self.session {
            Some(session) => session.accumulated_distance,
            None => self.final_distance,
        }
    }

    pub fn milestone_index(&self) -> u32 {
        self.session.as_ref().map(|session| session.last_milestone_index).unwrap_or(0)
    }

    /// Start time of the active session, retained after `stop` so the
    /// session-complete flow can still compute elapsed time.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match &self.session {
            Some(session) => Some(session.started_at),
            None => self.last_started_at,
        }
    }

    /// Runs one fix through the filter chain. The fix's own capture time
    /// drives the milestone throttle. Fixes arriving while no session is
    /// active, and malformed fixes, are dropped without error.
    pub fn ingest(&mut self, fix: &PositionFix) -> Ingest {
        let Some(session) = self.session.as_mut() else {
            return Ingest::default();
        };

        if !fix.is_well_formed() {
            return Ingest::default();
        }

        if fix.accuracy <= 0.0 || fix.accuracy > self.config.accuracy_ceiling {
            return Ingest::default();
        }

        let Some(reference) = session.last_accepted.as_ref() else {
            // First-fix bootstrap: becomes the reference with zero delta.
            session.last_accepted = Some(fix.clone());
            return Ingest { accepted: true, distance_delta: 0.0, milestone: None };
        };

        let d = haversine_distance(reference.position, fix.position);

        let counted = d < self.config.max_step
            && d >= self.config.min_step
            && fix.accuracy <= self.config.delta_accuracy_ceiling;

        let mut result = Ingest::default();
        if counted {
            session.accumulated_distance += d;
            result.accepted = true;
            result.distance_delta = d;
            result.milestone = session.check_milestone(&self.config, fix.timestamp);
        }

        match self.config.reference_policy {
            ReferencePolicy::EveryValidFix => session.last_accepted = Some(fix.clone()),
            ReferencePolicy::AcceptedOnly if counted => session.last_accepted = Some(fix.clone()),
            ReferencePolicy::AcceptedOnly => {}
        }

        result
    }

    /// Ends the session. The final distance and start time stay readable
    /// until the next `start` or `reset`.
    pub fn stop(&mut self) -> f64 {
        if let Some(session) = self.session.take() {
            self.final_distance = session.accumulated_distance;
            self.last_started_at = Some(session.started_at);
        }

        self.final_distance
    }

    /// Clears the distance and milestone state without changing whether
    /// tracking is active. An active session keeps its start time.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.accumulated_distance = 0.0;
            session.last_accepted = None;
            session.last_milestone_index = 0;
            session.last_feedback_at = None;
        }

        self.final_distance = 0.0;
        self.last_started_at = None;
    }
}

#[cfg(test)]
use chrono::TimeZone;
#[cfg(test)]
use geo_types::Point;

#[cfg(test)]
fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

#[cfg(test)]
fn fix_at(lat: f64, accuracy: f64, timestamp: DateTime<Utc>) -> PositionFix {
    PositionFix::new(Point::new(9.0, lat), accuracy, 20.0, 2.5, 0.0, timestamp)
}

/// Latitude offset that moves a point `meters` due north.
#[cfg(test)]
fn north(lat: f64, meters: f64) -> f64 {
    lat + (meters / 6_372_800.0).to_degrees()
}

#[cfg(test)]
fn started_tracker() -> DistanceTracker {
    let mut tracker = DistanceTracker::new(TrackerConfig::default());
    tracker.start(t0());
    tracker
}

#[test]
fn start_is_idempotent() {
    let mut tracker = started_tracker();
    tracker.ingest(&fix_at(55.0, 5.0, t0()));
    tracker.ingest(&fix_at(north(55.0, 10.0), 5.0, t0() + Duration::seconds(3)));
    let before = tracker.distance();
    assert!(before > 0.0);

    assert!(!tracker.start(t0() + Duration::seconds(60)));
    assert_eq!(tracker.distance(), before);
}

#[test]
fn first_fix_bootstraps_with_zero_delta() {
    let mut tracker = started_tracker();
    let result = tracker.ingest(&fix_at(55.0, 5.0, t0()));

    assert!(result.accepted);
    assert_eq!(result.distance_delta, 0.0);
    assert_eq!(result.milestone, None);
    assert_eq!(tracker.distance(), 0.0);
}

#[test]
fn inaccurate_fix_never_counts() {
    let mut tracker = started_tracker();
    tracker.ingest(&fix_at(55.0, 5.0, t0()));

    let result = tracker.ingest(&fix_at(north(55.0, 50.0), 25.0, t0() + Duration::seconds(3)));
    assert!(!result.accepted);
    assert_eq!(tracker.distance(), 0.0);

    let result = tracker.ingest(&fix_at(north(55.0, 50.0), 0.0, t0() + Duration::seconds(6)));
    assert!(!result.accepted);
    assert_eq!(tracker.distance(), 0.0);
}

#[test]
fn delta_requires_stricter_accuracy() {
    let mut tracker = started_tracker();
    tracker.ingest(&fix_at(55.0, 5.0, t0()));

    // Passes the 20 m ceiling but not the 15 m delta gate
    let result = tracker.ingest(&fix_at(north(55.0, 50.0), 18.0, t0() + Duration::seconds(3)));
    assert!(!result.accepted);
    assert_eq!(tracker.distance(), 0.0);
}

#[test]
fn gps_jump_is_rejected() {
    let mut tracker = started_tracker();
    tracker.ingest(&fix_at(55.0, 5.0, t0()));

    let result = tracker.ingest(&fix_at(north(55.0, 150.0), 5.0, t0() + Duration::seconds(3)));
    assert!(!result.accepted);
    assert_eq!(tracker.distance(), 0.0);
}

#[test]
fn dither_below_min_step_is_rejected() {
    let mut tracker = started_tracker();
    tracker.ingest(&fix_at(55.0, 5.0, t0()));

    let result = tracker.ingest(&fix_at(north(55.0, 2.0), 5.0, t0() + Duration::seconds(3)));
    assert!(!result.accepted);
    assert_eq!(tracker.distance(), 0.0);
}

#[test]
fn rejected_fix_still_moves_reference_by_default() {
    let mut tracker = started_tracker();
    tracker.ingest(&fix_at(55.0, 5.0, t0()));

    // Jump of 150 m is rejected but becomes the new reference,
    // so a further 10 m from there is a plain accepted step.
    tracker.ingest(&fix_at(north(55.0, 150.0), 5.0, t0() + Duration::seconds(3)));
    let result = tracker.ingest(&fix_at(north(55.0, 160.0), 5.0, t0() + Duration::seconds(6)));

    assert!(result.accepted);
    assert!((result.distance_delta - 10.0).abs() < 0.1);
}

#[test]
fn accepted_only_policy_keeps_reference_on_rejection() {
    let config = TrackerConfig { reference_policy: ReferencePolicy::AcceptedOnly, ..Default::default() };
    let mut tracker = DistanceTracker::new(config);
    tracker.start(t0());
    tracker.ingest(&fix_at(55.0, 5.0, t0()));

    // Dither does not move the reference, so two 2 m nudges never add up.
    tracker.ingest(&fix_at(north(55.0, 2.0), 5.0, t0() + Duration::seconds(3)));
    let result = tracker.ingest(&fix_at(north(55.0, 4.0), 5.0, t0() + Duration::seconds(6)));

    assert!(result.accepted);
    assert!((result.distance_delta - 4.0).abs() < 0.1);
}

#[test]
fn distance_is_non_decreasing() {
    let mut tracker = started_tracker();
    let mut lat = 55.0;
    let mut previous = 0.0;

    let steps = [0.0, 10.0, 2.0, 150.0, 10.0, 80.0, 1.0, 99.0, 10.0];
    for (i, step) in steps.iter().enumerate() {
        lat = north(lat, *step);
        let accuracy = if i % 3 == 0 { 25.0 } else { 5.0 };
        tracker.ingest(&fix_at(lat, accuracy, t0() + Duration::seconds(3 * i as i64)));

        assert!(tracker.distance() >= previous);
        previous = tracker.distance();
    }
}

#[test]
fn malformed_fix_is_dropped() {
    let mut tracker = started_tracker();
    tracker.ingest(&fix_at(55.0, 5.0, t0()));

    let result = tracker.ingest(&fix_at(f64::NAN, 5.0, t0() + Duration::seconds(3)));
    assert!(!result.accepted);
    assert_eq!(tracker.distance(), 0.0);
}

#[test]
fn ingest_without_session_is_ignored() {
    let mut tracker = DistanceTracker::new(TrackerConfig::default());
    let result = tracker.ingest(&fix_at(55.0, 5.0, t0()));

    assert!(!result.accepted);
    assert!(!tracker.is_tracking());
}

#[test]
fn milestone_fires_once_at_five_hundred() {
    let mut tracker = started_tracker();
    let mut lat = 55.0;
    tracker.ingest(&fix_at(lat, 5.0, t0()));

    // 10 m steps, 3 s apart, past the 500 m mark
    let mut milestones = Vec::new();
    for i in 1..=51 {
        lat = north(lat, 10.0);
        let result = tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(3 * i)));
        if let Some(milestone) = result.milestone {
            milestones.push(milestone);
        }
    }

    assert_eq!(milestones.len(), 1);
    assert_eq!(milestones[0].meters, 500);
    assert_eq!(milestones[0].index, 1);
}

#[test]
fn milestone_indexes_strictly_increase() {
    let mut tracker = started_tracker();
    let mut lat = 55.0;
    tracker.ingest(&fix_at(lat, 5.0, t0()));

    let mut fired = Vec::new();
    for i in 1..=160 {
        lat = north(lat, 10.0);
        let result = tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(3 * i)));
        if let Some(milestone) = result.milestone {
            fired.push(milestone.index);
        }
    }

    assert_eq!(fired, vec![1, 2, 3]);
}

#[test]
fn throttle_allows_one_signal_per_window() {
    // 90 m steps 300 ms apart cross a milestone roughly every 1.7 s,
    // faster than the 2 s gap allows signaling.
    let mut tracker = started_tracker();
    let mut lat = 55.0;
    tracker.ingest(&fix_at(lat, 5.0, t0()));

    let mut fired = Vec::new();
    for i in 1..=20 {
        lat = north(lat, 90.0);
        let result = tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::milliseconds(300 * i)));
        if let Some(milestone) = result.milestone {
            fired.push((milestone.index, 300 * i));
        }
    }

    assert!(!fired.is_empty());
    for pair in fired.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= 2000, "signals {} ms apart", pair[1].1 - pair[0].1);
    }
    // Deferred crossings never repeat an index
    for pair in fired.windows(2) {
        assert!(pair[1].0 > pair[0].0);
    }
}

#[test]
fn throttled_crossing_collapses_to_latest_index() {
    // Tight session bound so single steps may cross a whole interval.
    let config = TrackerConfig { max_step: 1000.0, ..Default::default() };
    let mut tracker = DistanceTracker::new(config);
    tracker.start(t0());

    let mut lat = 55.0;
    tracker.ingest(&fix_at(lat, 5.0, t0()));

    // 450 m step stays below the first interval: no signal yet.
    lat = north(lat, 450.0);
    let first = tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(3)));
    assert_eq!(first.milestone, None);

    // A single 600 m step crosses both 500 m and 1000 m: exactly one
    // signal, for the 1000 m index.
    lat = north(lat, 600.0);
    let second = tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(6)));
    let milestone = second.milestone.unwrap();
    assert_eq!(milestone.index, 2);
    assert_eq!(milestone.meters, 1000);

    // The skipped 500 m index never fires later.
    lat = north(lat, 600.0);
    let third = tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(9)));
    assert_eq!(third.milestone.map(|m| m.meters), Some(1500));
}

#[test]
fn two_eligible_crossings_inside_gap_fire_once() {
    let config = TrackerConfig { max_step: 1000.0, ..Default::default() };
    let mut tracker = DistanceTracker::new(config);
    tracker.start(t0());

    let mut lat = 55.0;
    tracker.ingest(&fix_at(lat, 5.0, t0()));

    lat = north(lat, 600.0);
    let first = tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(3)));
    assert_eq!(first.milestone.map(|m| m.meters), Some(500));

    // Second crossing only one second later: suppressed by the 2 s gap.
    lat = north(lat, 600.0);
    let second = tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(4)));
    assert!(second.accepted);
    assert_eq!(second.milestone, None);

    // Once the gap has elapsed it fires at the current index.
    lat = north(lat, 600.0);
    let third = tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(6)));
    assert_eq!(third.milestone.map(|m| m.meters), Some(1500));
}

#[test]
fn stop_returns_final_distance_and_keeps_it_readable() {
    let mut tracker = started_tracker();
    let mut lat = 55.0;
    tracker.ingest(&fix_at(lat, 5.0, t0()));
    for i in 1..=5 {
        lat = north(lat, 10.0);
        tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(3 * i)));
    }

    let final_distance = tracker.stop();
    assert!((final_distance - 50.0).abs() < 0.5);
    assert!(!tracker.is_tracking());
    assert_eq!(tracker.distance(), final_distance);
    assert_eq!(tracker.started_at(), Some(t0()));

    // Fixes after stop are dropped
    let result = tracker.ingest(&fix_at(north(lat, 10.0), 5.0, t0() + Duration::seconds(60)));
    assert!(!result.accepted);
    assert_eq!(tracker.distance(), final_distance);
}

#[test]
fn reset_zeroes_distance_but_keeps_tracking_active() {
    let mut tracker = started_tracker();
    let mut lat = 55.0;
    tracker.ingest(&fix_at(lat, 5.0, t0()));
    lat = north(lat, 10.0);
    tracker.ingest(&fix_at(lat, 5.0, t0() + Duration::seconds(3)));
    assert!(tracker.distance() > 0.0);

    tracker.reset();
    assert!(tracker.is_tracking());
    assert_eq!(tracker.distance(), 0.0);
    assert_eq!(tracker.milestone_index(), 0);

    // The next fix bootstraps a fresh reference
    let result = tracker.ingest(&fix_at(north(lat, 50.0), 5.0, t0() + Duration::seconds(6)));
    assert!(result.accepted);
    assert_eq!(result.distance_delta, 0.0);
}

#[test]
fn no_milestone_before_session_start() {
    let config = TrackerConfig { max_step: 1000.0, ..Default::default() };
    let mut tracker = DistanceTracker::new(config);
    tracker.start(t0());

    let mut lat = 55.0;
    tracker.ingest(&fix_at(lat, 5.0, t0()));

    // A stale fix stamped before the session began must not signal.
    lat = north(lat, 600.0);
    let result = tracker.ingest(&fix_at(lat, 5.0, t0() - Duration::seconds(10)));
    assert_eq!(result.milestone, None);
}
