//! Great-circle distance between WGS-84 points.

use crate::nodes::coordinate::Coordinate;

/// Earth radius used by the store's `distance()` on geographic points.
pub const EARTH_RADIUS_METERS: f64 = 6_378_140.0;

/// Haversine distance in metres.
pub fn point_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}
