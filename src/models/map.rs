use serde::{Deserialize, Serialize};

use super::location::Coordinate;

/// Default CSS color for routes without an explicit color (violet).
pub const DEFAULT_ROUTE_COLOR: &str = "#7C3AED";

/// Marker pin color, matching the classic `{color}-dot` icon set.
///
/// The wire carries lowercase color names; anything outside the known
/// palette folds to `Red`, the default marker color. `Blue` is reserved for
/// the user/origin marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MarkerColor {
    Red,
    Blue,
    Purple,
    Green,
    Yellow,
    Orange,
}

impl MarkerColor {
    /// Wire name of the color (lowercase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
        }
    }
}

impl Default for MarkerColor {
    fn default() -> Self {
        Self::Red
    }
}

impl From<String> for MarkerColor {
    fn from(value: String) -> Self {
        match value.as_str() {
            "blue" => Self::Blue,
            "purple" => Self::Purple,
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "orange" => Self::Orange,
            // "red" and any unknown name fold to the default.
            _ => Self::Red,
        }
    }
}

impl From<MarkerColor> for String {
    fn from(value: MarkerColor) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single marker from a backend map payload.
///
/// Points spell out `latitude`/`longitude` on the wire, unlike `location`
/// and route path nodes which use `lat`/`lng`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<MarkerColor>,
}

impl MapPoint {
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self { latitude, longitude, name: name.into(), color: None }
    }

    /// The point's position as a `Coordinate`.
    pub fn position(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Effective marker color, defaulting to red.
    pub fn color_or_default(&self) -> MarkerColor {
        self.color.unwrap_or_default()
    }
}

/// An ordered path to draw as a connected line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePath {
    pub path: Vec<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl RoutePath {
    pub fn new(path: Vec<Coordinate>) -> Self {
        Self { path, color: None }
    }

    /// Effective CSS color, defaulting to the fixed violet.
    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_ROUTE_COLOR)
    }
}

/// Declarative map contents from one backend response.
///
/// A payload fully replaces whatever the previous render displayed; markers
/// and routes never accumulate across turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPayload {
    #[serde(default)]
    pub points: Vec<MapPoint>,
    #[serde(default)]
    pub routes: Vec<RoutePath>,
}

impl MapPayload {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.routes.is_empty()
    }

    /// True when any point in the batch is explicitly tagged blue, i.e. the
    /// backend already placed an origin marker of its own.
    pub fn has_custom_origin(&self) -> bool {
        self.points
            .iter()
            .any(|p| p.color == Some(MarkerColor::Blue))
    }
}
