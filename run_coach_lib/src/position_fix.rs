use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// One raw GPS sample as delivered by the location source.
/// `position` is lon/lat (x/y), accuracy is the horizontal radius in meters,
/// speed is ground speed in m/s with negative meaning unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionFix {
    pub position: Point,
    pub accuracy: f64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn new(position: Point, accuracy: f64, altitude: f64, speed: f64, heading: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            accuracy,
            altitude,
            speed,
            heading,
            timestamp,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    pub fn longitude(&self) -> f64 {
        self.position.x()
    }

    pub fn speed_ms(&self) -> Option<f64> {
        (self.speed >= 0.0).then_some(self.speed)
    }

    /// A fix with non-finite coordinates or accuracy cannot be trusted at all.
    pub fn is_well_formed(&self) -> bool {
        self.position.x().is_finite() && self.position.y().is_finite() && self.accuracy.is_finite()
    }
}

#[test]
fn rejects_non_finite_fields() {
    let timestamp = Utc::now();
    let good = PositionFix::new(Point::new(9.0, 55.0), 5.0, 20.0, 2.5, 90.0, timestamp);
    assert!(good.is_well_formed());

    let bad_lat = PositionFix::new(Point::new(9.0, f64::NAN), 5.0, 20.0, 2.5, 90.0, timestamp);
    assert!(!bad_lat.is_well_formed());

    let bad_accuracy = PositionFix::new(Point::new(9.0, 55.0), f64::INFINITY, 20.0, 2.5, 90.0, timestamp);
    assert!(!bad_accuracy.is_well_formed());
}

#[test]
fn speed_is_unavailable_when_negative() {
    let fix = PositionFix::new(Point::new(9.0, 55.0), 5.0, 20.0, -1.0, 90.0, Utc::now());
    assert_eq!(fix.speed_ms(), None);
}
