//! Terminal front-end: the assistant session wired to stdin/stdout, with a
//! text rendering of the map scene.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::time::Duration;

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::models::{ChatTurn, Coordinate, MarkerColor, Role};
use crate::services::chat::ChatClient;
use crate::services::geoip::IpApiProvider;
use crate::services::locator::{FixedProvider, LocationProvider, LocationResolver, ResolverConfig};
use crate::services::map_renderer::{
    fit_zoom, LatLngBounds, MapRenderer, MapSurface, PolylineStyle, SurfaceId,
};
use crate::session::{AssistantSession, Notifier, NoticeLevel, TranscriptView};

/// Flatten the assistant's markdown into plain terminal text.
///
/// Emphasis and heading syntax are dropped, list items keep a bullet
/// marker, continuation lines inside an item stay indented. Raw HTML in
/// the reply is discarded.
pub fn render_markdown_plain(text: &str) -> String {
    let mut out = String::new();
    let mut in_item = false;

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Paragraph | Tag::Heading { .. }) if !in_item => {
                if !out.is_empty() {
                    out.push('\n');
                }
            }
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_)) if !in_item => {
                out.push('\n');
            }
            Event::Start(Tag::Item) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("• ");
                in_item = true;
            }
            Event::End(TagEnd::Item) => {
                in_item = false;
                out.push('\n');
            }
            Event::Text(chunk) | Event::Code(chunk) => out.push_str(&chunk),
            Event::SoftBreak | Event::HardBreak => {
                out.push('\n');
                if in_item {
                    out.push_str("  ");
                }
            }
            _ => {}
        }
    }

    out.trim_end().to_string()
}

/// Prints each turn as it lands.
pub struct TerminalTranscript;

impl TranscriptView for TerminalTranscript {
    fn append(&mut self, turn: &ChatTurn) {
        let who = match turn.role {
            Role::User => "you",
            Role::Assistant => "genie",
        };
        println!();
        for line in render_markdown_plain(&turn.text).lines() {
            println!("{who:>6} | {line}");
        }
        if turn.image.is_some() {
            println!("{who:>6} | (image attached)");
        }
    }

    fn scroll_to_latest(&mut self) {
        // The terminal scrolls on its own.
    }
}

pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn status(&mut self, text: &str) {
        println!("[location] {text}");
    }

    fn notice(&mut self, level: NoticeLevel, message: &str) {
        let tag = match level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warn",
            NoticeLevel::Error => "error",
        };
        println!("[{tag}] {message}");
    }
}

/// Text stand-in for a map widget: every scene change is printed, and the
/// zoom bookkeeping behaves like the real thing so fitting works.
#[derive(Default)]
pub struct TerminalMap {
    next_id: u64,
    markers: BTreeMap<SurfaceId, String>,
    polylines: BTreeMap<SurfaceId, usize>,
    zoom: u8,
}

impl TerminalMap {
    fn next(&mut self) -> SurfaceId {
        self.next_id += 1;
        SurfaceId(self.next_id)
    }
}

impl MapSurface for TerminalMap {
    fn add_marker(&mut self, position: Coordinate, label: &str, color: MarkerColor) -> SurfaceId {
        println!("[map] 📍 {label} ({color}) at {position}");
        let id = self.next();
        self.markers.insert(id, label.to_string());
        id
    }

    fn remove_marker(&mut self, id: SurfaceId) {
        self.markers.remove(&id);
    }

    fn add_polyline(&mut self, path: &[Coordinate], style: &PolylineStyle) -> SurfaceId {
        println!("[map] route with {} points ({})", path.len(), style.color);
        let id = self.next();
        self.polylines.insert(id, path.len());
        id
    }

    fn remove_polyline(&mut self, id: SurfaceId) {
        self.polylines.remove(&id);
    }

    fn set_center(&mut self, center: Coordinate) {
        println!("[map] centered on {center}");
    }

    fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
        println!("[map] zoom {zoom}");
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        self.zoom = fit_zoom(bounds);
        if let (Some(sw), Some(ne)) = (bounds.southwest(), bounds.northeast()) {
            println!("[map] fitted to [{sw}] .. [{ne}] (zoom {})", self.zoom);
        }
    }
}

/// Interactive chat loop against the configured backend.
pub async fn run_chat(config: Config) -> anyhow::Result<()> {
    let client = ChatClient::with_timeout(
        &config.backend_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    let provider: Box<dyn LocationProvider> = match config.fixed_coordinate() {
        Some(coordinate) => Box::new(FixedProvider::new(coordinate)),
        None => Box::new(IpApiProvider::new()),
    };
    let resolver = LocationResolver::with_config(
        Some(provider),
        ResolverConfig {
            default_location: config.default_coordinate(),
            first_timeout: Duration::from_secs(config.location_timeout_secs),
            retry_timeout: Duration::from_secs(config.location_retry_timeout_secs),
            max_age: Duration::from_secs(config.location_max_age_secs),
        },
    );
    let renderer =
        MapRenderer::with_max_fit_zoom(Box::new(TerminalMap::default()), config.max_fit_zoom);

    let mut session = AssistantSession::new(
        resolver,
        renderer,
        Box::new(client),
        Box::new(TerminalTranscript),
        Box::new(TerminalNotifier),
    );

    println!("CompassGenie - chatting with {}", config.backend_url);
    println!("Commands: /attach <path>, /clear-image, /quit");
    session.start().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        if line == "/quit" || line == "/exit" {
            break;
        } else if line == "/clear-image" {
            session.clear_image();
            println!("[info] image cleared");
        } else if let Some(path) = line.strip_prefix("/attach ") {
            let path = path.trim();
            match tokio::fs::read(path).await {
                Ok(bytes) => session.attach_image(bytes),
                Err(error) => println!("[error] could not read {path}: {error}"),
            }
        } else if line.is_empty() && !session.has_pending_image() {
            continue;
        } else {
            session.submit(line).await;
        }
    }

    println!("Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_flattening() {
        let text = "### Route from A to B\n* 🚗 **Distance:** 12.4 km\n  _Main St_\n";
        let plain = render_markdown_plain(text);

        assert_eq!(plain, "Route from A to B\n• 🚗 Distance: 12.4 km\n  Main St");
    }

    #[test]
    fn test_markdown_plain_text_passthrough() {
        assert_eq!(render_markdown_plain("just words"), "just words");
    }

    #[test]
    fn test_markdown_keeps_snake_case_identifiers() {
        // Intraword underscores are not emphasis.
        let text = "The map_data field pairs with route_path nodes";
        assert_eq!(render_markdown_plain(text), text);
    }

    #[test]
    fn test_markdown_bullet_list() {
        let text = "Here are the results for **'coffee'**:\n\
                    * **Cafe One** (4.5⭐)\n  _1 Main St_\n\
                    * **Cafe Two** (4.1⭐)\n  _2 Oak Ave_\n";
        let plain = render_markdown_plain(text);

        assert_eq!(
            plain,
            "Here are the results for 'coffee':\n\
             • Cafe One (4.5⭐)\n  1 Main St\n\
             • Cafe Two (4.1⭐)\n  2 Oak Ave"
        );
    }

    #[test]
    fn test_terminal_map_tracks_ids() {
        let mut map = TerminalMap::default();
        let marker = map.add_marker(Coordinate::new(1.0, 2.0), "A", MarkerColor::Red);
        let line = map.add_polyline(
            &[Coordinate::new(1.0, 2.0), Coordinate::new(1.1, 2.1)],
            &PolylineStyle::default(),
        );
        assert_eq!(map.markers.len(), 1);
        assert_eq!(map.polylines.len(), 1);

        map.remove_marker(marker);
        map.remove_polyline(line);
        assert!(map.markers.is_empty());
        assert!(map.polylines.is_empty());

        let mut bounds = LatLngBounds::new();
        bounds.extend(Coordinate::new(34.0, -118.3));
        bounds.extend(Coordinate::new(34.2, -118.1));
        map.fit_bounds(&bounds);
        assert_eq!(map.zoom(), fit_zoom(&bounds));
    }
}
