use tracing::debug;

use crate::models::{Coordinate, MapPayload, MarkerColor, ResolvedLocation};

/// Zoom applied when centering on the user at startup.
pub const STARTUP_ZOOM: u8 = 14;

/// Ceiling applied after fitting bounds, so one marker or a tight cluster
/// never fills the screen with a single block.
pub const MAX_FIT_ZOOM: u8 = 15;

const MAX_SURFACE_ZOOM: u8 = 19;
const MIN_SPAN_DEGREES: f64 = 1e-9;

/// Handle to one marker or polyline placed on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub u64);

/// Stroke settings for a rendered route.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineStyle {
    pub color: String,
    pub opacity: f64,
    pub weight: u32,
    pub geodesic: bool,
}

impl PolylineStyle {
    /// The house route style: translucent, medium weight, geodesic.
    pub fn route(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            opacity: 0.8,
            weight: 5,
            geodesic: true,
        }
    }
}

impl Default for PolylineStyle {
    fn default() -> Self {
        Self::route(crate::models::DEFAULT_ROUTE_COLOR)
    }
}

/// A rectangle grown point by point, in the manner of map SDK bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatLngBounds {
    extent: Option<(Coordinate, Coordinate)>,
}

impl LatLngBounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, coordinate: Coordinate) {
        self.extent = Some(match self.extent {
            None => (coordinate, coordinate),
            Some((sw, ne)) => (
                Coordinate::new(sw.latitude.min(coordinate.latitude), sw.longitude.min(coordinate.longitude)),
                Coordinate::new(ne.latitude.max(coordinate.latitude), ne.longitude.max(coordinate.longitude)),
            ),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.extent.is_none()
    }

    pub fn southwest(&self) -> Option<Coordinate> {
        self.extent.map(|(sw, _)| sw)
    }

    pub fn northeast(&self) -> Option<Coordinate> {
        self.extent.map(|(_, ne)| ne)
    }

    pub fn center(&self) -> Option<Coordinate> {
        self.extent.map(|(sw, ne)| {
            Coordinate::new(
                (sw.latitude + ne.latitude) / 2.0,
                (sw.longitude + ne.longitude) / 2.0,
            )
        })
    }

    pub fn lat_span(&self) -> f64 {
        self.extent.map_or(0.0, |(sw, ne)| ne.latitude - sw.latitude)
    }

    pub fn lng_span(&self) -> f64 {
        self.extent.map_or(0.0, |(sw, ne)| ne.longitude - sw.longitude)
    }
}

/// Zoom level at which `bounds` fills a nominal square viewport.
///
/// Degenerate bounds (a single point) land on the surface maximum; callers
/// are expected to clamp afterwards.
pub fn fit_zoom(bounds: &LatLngBounds) -> u8 {
    let span = bounds.lat_span().max(bounds.lng_span());
    if span < MIN_SPAN_DEGREES {
        return MAX_SURFACE_ZOOM;
    }
    let zoom = (360.0 / span).log2().floor();
    zoom.clamp(0.0, MAX_SURFACE_ZOOM as f64) as u8
}

/// The drawing backend the renderer manipulates. Implementations are
/// expected to apply every call synchronously: after `fit_bounds` returns,
/// `zoom` already reports the fitted level.
pub trait MapSurface {
    fn add_marker(&mut self, position: Coordinate, label: &str, color: MarkerColor) -> SurfaceId;
    fn remove_marker(&mut self, id: SurfaceId);
    fn add_polyline(&mut self, path: &[Coordinate], style: &PolylineStyle) -> SurfaceId;
    fn remove_polyline(&mut self, id: SurfaceId);
    fn set_center(&mut self, center: Coordinate);
    fn set_zoom(&mut self, zoom: u8);
    fn zoom(&self) -> u8;
    fn fit_bounds(&mut self, bounds: &LatLngBounds);
}

/// Owns the marker/route scene on a surface.
///
/// Every `render` replaces the whole scene with the given payload, so the
/// map always shows exactly one response. Rendering the same payload twice
/// leaves an identical scene behind.
pub struct MapRenderer {
    surface: Box<dyn MapSurface>,
    markers: Vec<SurfaceId>,
    polylines: Vec<SurfaceId>,
    max_fit_zoom: u8,
}

impl MapRenderer {
    pub fn new(surface: Box<dyn MapSurface>) -> Self {
        Self::with_max_fit_zoom(surface, MAX_FIT_ZOOM)
    }

    pub fn with_max_fit_zoom(surface: Box<dyn MapSurface>, max_fit_zoom: u8) -> Self {
        Self {
            surface,
            markers: Vec::new(),
            polylines: Vec::new(),
            max_fit_zoom,
        }
    }

    /// Remove everything this renderer has placed on the surface.
    pub fn clear(&mut self) {
        for id in self.markers.drain(..) {
            self.surface.remove_marker(id);
        }
        for id in self.polylines.drain(..) {
            self.surface.remove_polyline(id);
        }
    }

    /// Center on the resolved startup location and drop a marker for it.
    ///
    /// The marker joins the tracked scene, so the first chat response
    /// replaces it along with everything else.
    pub fn show_user_location(&mut self, location: &ResolvedLocation) {
        let (label, color) = if location.is_live() {
            ("Current Location", MarkerColor::Blue)
        } else {
            ("Fallback Location", MarkerColor::Purple)
        };
        self.surface.set_center(location.coordinate);
        self.surface.set_zoom(STARTUP_ZOOM);
        let id = self.surface.add_marker(location.coordinate, label, color);
        self.markers.push(id);
    }

    /// Replace the scene with `payload`.
    ///
    /// When the payload carries points but no custom origin of its own, a
    /// blue "You" marker for `user_location` is placed first. An empty
    /// payload just clears the map and leaves the viewport alone.
    pub fn render(&mut self, payload: &MapPayload, user_location: Option<Coordinate>) {
        self.clear();

        let mut bounds = LatLngBounds::new();

        if !payload.points.is_empty() && !payload.has_custom_origin() {
            if let Some(user) = user_location {
                let id = self.surface.add_marker(user, "You", MarkerColor::Blue);
                self.markers.push(id);
                bounds.extend(user);
            }
        }

        for point in &payload.points {
            let id = self
                .surface
                .add_marker(point.position(), &point.name, point.color_or_default());
            self.markers.push(id);
            bounds.extend(point.position());
        }

        for route in &payload.routes {
            if route.path.is_empty() {
                continue;
            }
            let style = PolylineStyle::route(route.color_or_default());
            let id = self.surface.add_polyline(&route.path, &style);
            self.polylines.push(id);
            for coordinate in &route.path {
                bounds.extend(*coordinate);
            }
        }

        if !bounds.is_empty() {
            self.surface.fit_bounds(&bounds);
            if self.surface.zoom() > self.max_fit_zoom {
                self.surface.set_zoom(self.max_fit_zoom);
            }
        }

        debug!(
            markers = self.markers.len(),
            polylines = self.polylines.len(),
            "map scene rendered"
        );
    }
}
