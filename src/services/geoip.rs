use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::Coordinate;
use crate::services::locator::{LocationProvider, PositionError, PositionOptions};

const IP_API_ENDPOINT: &str = "http://ip-api.com/json";

/// Coarse location from the machine's public IP, via ip-api.com.
///
/// City-level accuracy at best, but good enough to seed the map when no
/// real positioning hardware is around. Successful lookups are cached and
/// served back while younger than `options.max_age`.
pub struct IpApiProvider {
    client: reqwest::Client,
    endpoint: String,
    cache: Mutex<Option<CachedFix>>,
}

struct CachedFix {
    at: Instant,
    coordinate: Coordinate,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl IpApiProvider {
    pub fn new() -> Self {
        Self::with_endpoint(IP_API_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            cache: Mutex::new(None),
        }
    }

    fn cached(&self, options: &PositionOptions) -> Option<Coordinate> {
        let cache = self.cache.lock().ok()?;
        let fix = cache.as_ref()?;
        if fix.at.elapsed() <= options.max_age {
            Some(fix.coordinate)
        } else {
            None
        }
    }

    fn store(&self, coordinate: Coordinate) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(CachedFix { at: Instant::now(), coordinate });
        }
    }
}

impl Default for IpApiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for IpApiProvider {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinate, PositionError> {
        if let Some(coordinate) = self.cached(options) {
            debug!(%coordinate, "serving cached IP location");
            return Ok(coordinate);
        }

        let response = self
            .client
            .get(&self.endpoint)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!("IP location request failed: {}", e);
                if e.is_timeout() {
                    PositionError::Timeout
                } else {
                    PositionError::Unavailable
                }
            })?;

        let body: IpApiResponse = response.json().await.map_err(|e| {
            warn!("IP location response was not valid JSON: {}", e);
            PositionError::Unavailable
        })?;

        if body.status != "success" {
            warn!(
                "IP location lookup rejected: {}",
                body.message.as_deref().unwrap_or("no reason given")
            );
            return Err(PositionError::Unavailable);
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => {
                let coordinate = Coordinate::new(lat, lon);
                debug!(%coordinate, "IP location resolved");
                self.store(coordinate);
                Ok(coordinate)
            }
            _ => {
                warn!("IP location response missing coordinates");
                Err(PositionError::Unavailable)
            }
        }
    }
}
