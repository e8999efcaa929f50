use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::{Coordinate, LocationSource, ResolvedLocation};
use crate::session::{NoticeLevel, Notifier};

/// Options for one device location query, mirroring the knobs of the
/// browser geolocation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Accept a cached fix no older than this.
    pub max_age: Duration,
}

/// Typed failure from a location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("location request timed out")]
    Timeout,

    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable")]
    Unavailable,
}

/// A source of device coordinates: GPS, an IP lookup, a fixed override.
///
/// Providers should honor `options.timeout` themselves where they can; the
/// resolver enforces it regardless, so a stuck provider still resolves to
/// the fallback within bounds.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinate, PositionError>;
}

/// Provider pinned to a fixed coordinate (`FIXED_LATITUDE`/`FIXED_LONGITUDE`).
pub struct FixedProvider {
    coordinate: Coordinate,
}

impl FixedProvider {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationProvider for FixedProvider {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinate, PositionError> {
        Ok(self.coordinate)
    }
}

/// Timeouts and fallback for location resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Used whenever no live fix can be obtained.
    pub default_location: Coordinate,
    /// First attempt: high accuracy, short patience.
    pub first_timeout: Duration,
    /// Retry attempt: low accuracy, longer patience.
    pub retry_timeout: Duration,
    /// Maximum age of a cached fix.
    pub max_age: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_location: Coordinate::new(34.0522, -118.2437),
            first_timeout: Duration::from_secs(15),
            retry_timeout: Duration::from_secs(30),
            max_age: Duration::from_secs(30),
        }
    }
}

/// Resolves the device location once, with one degraded-accuracy retry on
/// timeout and a configured fallback for everything else.
///
/// `resolve` always completes with a usable coordinate, within
/// `first_timeout + retry_timeout` at the worst.
pub struct LocationResolver {
    provider: Option<Box<dyn LocationProvider>>,
    config: ResolverConfig,
}

impl LocationResolver {
    /// Create a resolver with default timeouts. `None` means the device has
    /// no location capability at all.
    pub fn new(provider: Option<Box<dyn LocationProvider>>) -> Self {
        Self::with_config(provider, ResolverConfig::default())
    }

    pub fn with_config(provider: Option<Box<dyn LocationProvider>>, config: ResolverConfig) -> Self {
        Self { provider, config }
    }

    /// Acquire the device location, or the configured default.
    ///
    /// Drives the status line through the acquisition states and emits
    /// exactly one final notice describing the outcome (a transient retry
    /// warning may precede it).
    pub async fn resolve(&self, notifier: &mut dyn Notifier) -> ResolvedLocation {
        let Some(provider) = self.provider.as_deref() else {
            let coordinate = self.config.default_location;
            notifier.status("Geo not supported");
            notifier.notice(
                NoticeLevel::Warning,
                &format!("Location not supported on this device. Using default location ({coordinate})."),
            );
            return ResolvedLocation { coordinate, source: LocationSource::Unsupported };
        };

        notifier.status("Acquiring...");

        let first = PositionOptions {
            high_accuracy: true,
            timeout: self.config.first_timeout,
            max_age: self.config.max_age,
        };
        match self.attempt(provider, &first).await {
            Ok(coordinate) => return self.live_fix(coordinate, notifier),
            Err(PositionError::Timeout) => {
                warn!("location request timed out, retrying with lower accuracy");
                notifier.notice(
                    NoticeLevel::Warning,
                    "Location request timed out. Retrying with lower accuracy...",
                );
            }
            Err(error) => return self.fall_back(error, notifier),
        }

        let retry = PositionOptions {
            high_accuracy: false,
            timeout: self.config.retry_timeout,
            max_age: self.config.max_age,
        };
        match self.attempt(provider, &retry).await {
            Ok(coordinate) => self.live_fix(coordinate, notifier),
            Err(error) => self.fall_back(error, notifier),
        }
    }

    async fn attempt(
        &self,
        provider: &dyn LocationProvider,
        options: &PositionOptions,
    ) -> Result<Coordinate, PositionError> {
        let position = tokio::time::timeout(options.timeout, provider.current_position(options))
            .await
            .map_err(|_| PositionError::Timeout)??;

        if !position.is_valid() {
            debug!(lat = position.latitude, lng = position.longitude, "provider returned out-of-range coordinate");
            return Err(PositionError::Unavailable);
        }
        Ok(position)
    }

    fn live_fix(&self, coordinate: Coordinate, notifier: &mut dyn Notifier) -> ResolvedLocation {
        debug!(%coordinate, "live location fix");
        notifier.status(&coordinate.to_string());
        notifier.notice(NoticeLevel::Info, &format!("Location acquired: {coordinate}."));
        ResolvedLocation { coordinate, source: LocationSource::LiveFix }
    }

    fn fall_back(&self, error: PositionError, notifier: &mut dyn Notifier) -> ResolvedLocation {
        warn!(%error, "location resolution failed, using default");
        let coordinate = self.config.default_location;
        let cause = match error {
            PositionError::Timeout => "Location request timed out.",
            PositionError::PermissionDenied => "Location permission denied.",
            PositionError::Unavailable => "Could not get location.",
        };
        notifier.status(&format!("Fallback: {coordinate}"));
        notifier.notice(
            NoticeLevel::Error,
            &format!("{cause} Using default location ({coordinate})."),
        );
        ResolvedLocation { coordinate, source: LocationSource::Default }
    }
}
