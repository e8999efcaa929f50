use serde::{Deserialize, Serialize};

/// A latitude/longitude pair.
///
/// Serializes with the short wire names (`lat`/`lng`) used by the `/chat`
/// request `location` field and by route path nodes. A `Coordinate` is a
/// value: a new one replaces an old one, nothing mutates in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Validate that coordinates are within valid GPS ranges
    pub fn is_valid(&self) -> bool {
        self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lat: {:.4}, Lng: {:.4}", self.latitude, self.longitude)
    }
}

/// How the current coordinate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    /// Live fix from the device location provider.
    LiveFix,
    /// The configured default, after the provider failed.
    Default,
    /// The configured default, because no provider is available.
    Unsupported,
}

/// Outcome of a location resolution: always a usable coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    pub source: LocationSource,
}

impl ResolvedLocation {
    /// True when the coordinate came from a live device fix.
    pub fn is_live(&self) -> bool {
        self.source == LocationSource::LiveFix
    }
}
