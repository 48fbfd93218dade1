/// Average pace in minutes per kilometer.
///
/// Only defined for positive distance and elapsed time, and capped at
/// 100 min/km to guard against divide-by-near-zero distortion right after
/// a session starts. Outside those bounds the pace is simply unavailable.
pub fn pace_min_per_km(meters: f64, elapsed_seconds: f64) -> Option<f64> {
    if meters <= 0.0 || elapsed_seconds <= 0.0 {
        return None;
    }

    let pace = (elapsed_seconds / 60.0) / (meters / 1000.0);

    if pace > 0.0 && pace < 100.0 {
        Some(pace)
    } else {
        None
    }
}

#[test]
fn five_minutes_per_km() {
    assert_eq!(pace_min_per_km(1000.0, 300.0), Some(5.0));
}

#[test]
fn unavailable_without_distance_or_time() {
    assert_eq!(pace_min_per_km(0.0, 300.0), None);
    assert_eq!(pace_min_per_km(1000.0, 0.0), None);
    assert_eq!(pace_min_per_km(-5.0, 300.0), None);
}

#[test]
fn unavailable_above_sanity_ceiling() {
    // 3 meters in 20 minutes is not a pace worth speaking out loud
    assert_eq!(pace_min_per_km(3.0, 1200.0), None);
}
