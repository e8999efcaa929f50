use serde::Deserialize;

use crate::models::Coordinate;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    // Chat endpoint the client talks to
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    // Fallback location when no live fix can be obtained (Los Angeles)
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,

    #[serde(default = "default_longitude")]
    pub default_longitude: f64,

    // First location attempt: high accuracy, short patience
    #[serde(default = "default_location_timeout_secs")]
    pub location_timeout_secs: u64,

    // Retry attempt: low accuracy, longer patience
    #[serde(default = "default_location_retry_timeout_secs")]
    pub location_retry_timeout_secs: u64,

    // Maximum age of a cached location fix
    #[serde(default = "default_location_max_age_secs")]
    pub location_max_age_secs: u64,

    // Zoom ceiling applied after fitting the map to a response
    #[serde(default = "default_max_fit_zoom")]
    pub max_fit_zoom: u8,

    // Overall budget for one chat round trip
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // Pin the client to a fixed position instead of looking one up
    #[serde(default)]
    pub fixed_latitude: Option<f64>,

    #[serde(default)]
    pub fixed_longitude: Option<f64>,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env::<Config>()
    }

    pub fn default_coordinate(&self) -> Coordinate {
        Coordinate::new(self.default_latitude, self.default_longitude)
    }

    /// Fixed position override, when both halves are set.
    pub fn fixed_coordinate(&self) -> Option<Coordinate> {
        match (self.fixed_latitude, self.fixed_longitude) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            backend_url: default_backend_url(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            location_timeout_secs: default_location_timeout_secs(),
            location_retry_timeout_secs: default_location_retry_timeout_secs(),
            location_max_age_secs: default_location_max_age_secs(),
            max_fit_zoom: default_max_fit_zoom(),
            request_timeout_secs: default_request_timeout_secs(),
            fixed_latitude: None,
            fixed_longitude: None,
        }
    }
}

fn default_port() -> u16 {
    8000
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8000/chat".to_string()
}

fn default_latitude() -> f64 {
    34.0522
}

fn default_longitude() -> f64 {
    -118.2437
}

fn default_location_timeout_secs() -> u64 {
    15
}

fn default_location_retry_timeout_secs() -> u64 {
    30
}

fn default_location_max_age_secs() -> u64 {
    30
}

fn default_max_fit_zoom() -> u8 {
    15
}

fn default_request_timeout_secs() -> u64 {
    60
}
