use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::libraries::{geodesy, polyline};
use crate::models::Coordinate;

const NEARBY_BEARINGS: [f64; 5] = [45.0, 135.0, 225.0, 315.0, 0.0];
const NEARBY_DISTANCES: [f64; 5] = [400.0, 800.0, 1200.0, 1600.0, 2000.0];
const NEARBY_PREFIXES: [&str; 5] =
    ["Northside", "Riverside", "Old Town", "Market Square", "Hillcrest"];
const NEARBY_STREETS: [&str; 5] =
    ["Maple Ave", "River Blvd", "Cobble Lane", "Market Plaza", "Summit Road"];

/// Landmarks the directory geocodes exactly, for demo queries around the
/// default Los Angeles area.
const LANDMARKS: [(&str, f64, f64); 6] = [
    ("griffith observatory", 34.1184, -118.3004),
    ("santa monica pier", 34.0083, -118.4987),
    ("hollywood sign", 34.1341, -118.3215),
    ("union station", 34.0562, -118.2365),
    ("getty center", 34.0780, -118.4741),
    ("dodger stadium", 34.0739, -118.2400),
];

/// Average mock driving speed, for duration estimates.
const DRIVING_SPEED_KMH: f64 = 40.0;

/// One search result from the directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: f64,
    pub address: String,
}

/// Geocoding result. `well_known` is false when the coordinate was
/// synthesized rather than looked up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodedPlace {
    pub coordinate: Coordinate,
    pub well_known: bool,
}

/// A synthesized driving route between two coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRoute {
    /// Encoded polyline of the route path.
    pub polyline: String,
    pub distance_meters: f64,
    pub duration_minutes: u32,
}

impl MockRoute {
    pub fn distance_text(&self) -> String {
        if self.distance_meters < 1000.0 {
            format!("{:.0} m", self.distance_meters)
        } else {
            format!("{:.1} km", self.distance_meters / 1000.0)
        }
    }

    pub fn duration_text(&self) -> String {
        if self.duration_minutes < 60 {
            format!("{} mins", self.duration_minutes)
        } else {
            format!("{} hr {} mins", self.duration_minutes / 60, self.duration_minutes % 60)
        }
    }
}

/// Deterministic stand-in for a real places API.
///
/// Every answer is a pure function of the inputs, so repeated queries give
/// identical results and tests stay stable without network access.
#[derive(Debug, Default)]
pub struct PlaceDirectory;

impl PlaceDirectory {
    pub fn new() -> Self {
        Self
    }

    /// Five plausible places for `query`, spread around `center` within
    /// walking-to-short-drive range.
    pub fn nearby(&self, query: &str, center: &Coordinate) -> Vec<Place> {
        let title = title_case(query);
        debug!(%center, query, "mock nearby search");

        (0..NEARBY_BEARINGS.len())
            .map(|i| {
                let position =
                    geodesy::offset(center, NEARBY_BEARINGS[i], NEARBY_DISTANCES[i]);
                Place {
                    name: format!("{} {}", NEARBY_PREFIXES[i], title),
                    latitude: position.latitude,
                    longitude: position.longitude,
                    rating: 3.9 + 0.2 * i as f64,
                    address: format!("{} {}", 120 + 180 * i, NEARBY_STREETS[i]),
                }
            })
            .collect()
    }

    /// Resolve a place name to a coordinate.
    ///
    /// Known landmarks resolve exactly; anything else lands on a stable
    /// pseudo-random spot 2-8 km from `center` so routes to made-up places
    /// still draw something sensible.
    pub fn geocode(&self, name: &str, center: &Coordinate) -> GeocodedPlace {
        let normalized = name.trim().to_lowercase();

        for (key, lat, lng) in LANDMARKS {
            if normalized.contains(key) {
                return GeocodedPlace {
                    coordinate: Coordinate::new(lat, lng),
                    well_known: true,
                };
            }
        }

        let hash = stable_hash(&normalized);
        let bearing = (hash % 360) as f64;
        let distance = 2000.0 + (hash / 360 % 6000) as f64;
        GeocodedPlace {
            coordinate: geodesy::offset(center, bearing, distance),
            well_known: false,
        }
    }

    /// A driving route between two points: interpolated path with a gentle
    /// sway so it reads as streets rather than a ruler line, plus distance
    /// and a duration estimate at city driving speed.
    pub fn driving_route(&self, origin: &Coordinate, destination: &Coordinate) -> MockRoute {
        let distance_meters = geodesy::distance_meters(origin, destination);

        let steps = 16;
        let d_lat = destination.latitude - origin.latitude;
        let d_lng = destination.longitude - origin.longitude;
        let sway = 0.06 * (d_lat.abs() + d_lng.abs()) / 2.0;

        let mut path = Vec::with_capacity(steps + 1);
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let bow = (t * std::f64::consts::PI).sin() * sway;
            path.push(Coordinate::new(
                origin.latitude + d_lat * t - d_lng.signum() * bow,
                origin.longitude + d_lng * t + d_lat.signum() * bow,
            ));
        }

        let duration_minutes =
            ((distance_meters / 1000.0 / DRIVING_SPEED_KMH * 60.0).ceil() as u32).max(1);

        MockRoute {
            polyline: polyline::encode(&path),
            distance_meters,
            duration_minutes,
        }
    }
}

pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn stable_hash(text: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
