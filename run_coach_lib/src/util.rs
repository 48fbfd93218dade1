use geo_types::Point;

pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    const R: f64 = 6_372_800.0; // Radius of the earth in meters

    let d_lat = (p2.y() - p1.y()).to_radians();
    let d_lon = (p2.x() - p1.x()).to_radians();
    let lat1 = p1.y().to_radians();
    let lat2 = p2.y().to_radians();

    let a = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::asin(f64::sqrt(a));

    R * c
}

#[test]
fn known_distance() {
    // Aarhus to Copenhagen, roughly 157 km
    let aarhus = Point::new(10.203921, 56.162939);
    let copenhagen = Point::new(12.568337, 55.676098);

    let d = haversine_distance(aarhus, copenhagen);
    assert!((d - 157_000.0).abs() < 2_000.0, "got {d}");
}

#[test]
fn zero_for_same_point() {
    let p = Point::new(9.0, 55.0);
    assert_eq!(haversine_distance(p, p), 0.0);
}
