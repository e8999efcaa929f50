use geo::{HaversineDistance, Point};

use crate::models::Coordinate;

/// Earth radius in meters (for distance calculations)
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Calculate distance between two coordinates in meters using the Haversine
/// formula.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let p1 = Point::new(a.longitude, a.latitude);
    let p2 = Point::new(b.longitude, b.latitude);

    p1.haversine_distance(&p2)
}

/// Project a coordinate `distance_meters` along `bearing_degrees`
/// (clockwise from north) on a spherical earth.
pub fn offset(origin: &Coordinate, bearing_degrees: f64, distance_meters: f64) -> Coordinate {
    let bearing = bearing_degrees.to_radians();
    let lat = origin.latitude.to_radians();
    let lng = origin.longitude.to_radians();
    let angular_distance = distance_meters / EARTH_RADIUS_METERS;

    let new_lat = (lat.sin() * angular_distance.cos()
        + lat.cos() * angular_distance.sin() * bearing.cos())
    .asin();

    let new_lng = lng
        + (bearing.sin() * angular_distance.sin() * lat.cos())
            .atan2(angular_distance.cos() - lat.sin() * new_lat.sin());

    Coordinate::new(new_lat.to_degrees(), new_lng.to_degrees())
}
