use regex::Regex;
use tracing::{debug, warn};

use crate::libraries::polyline;
use crate::models::{
    ChatRequest, ChatResponse, Coordinate, MapPayload, MapPoint, MarkerColor, RoutePath,
};
use crate::services::places::{title_case, PlaceDirectory};

/// The assistant behind the dev backend.
///
/// No language model here: a route/nearby intent split over the mock place
/// directory, with answers formatted the way the production assistant
/// writes them. Deterministic, so the client can be exercised offline.
pub struct GenieService {
    directory: PlaceDirectory,
    default_location: Coordinate,
}

#[derive(Debug, PartialEq, Eq)]
struct RouteIntent {
    origin: Option<String>,
    destination: String,
}

impl GenieService {
    pub fn new(default_location: Coordinate) -> Self {
        Self {
            directory: PlaceDirectory::new(),
            default_location,
        }
    }

    /// Answer one chat request. Requests without a resolved location are
    /// answered around the configured default.
    pub fn answer(&self, request: &ChatRequest) -> ChatResponse {
        let center = request.location.unwrap_or(self.default_location);
        let query = request.query.trim();
        debug!(query, %center, has_image = request.image.is_some(), "answering chat request");

        if query.is_empty() {
            return ChatResponse {
                response_text: "I can see your image. Tell me what to look for and I'll put it on the map.".to_string(),
                map_data: None,
            };
        }

        if is_small_talk(query) {
            return ChatResponse {
                response_text: "Hi! Ask me for places nearby (\"coffee near me\") or directions (\"route to Union Station\").".to_string(),
                map_data: None,
            };
        }

        match route_intent(query) {
            Some(intent) => self.route_answer(&intent, &center),
            None => self.nearby_answer(query, &center),
        }
    }

    fn nearby_answer(&self, raw_query: &str, center: &Coordinate) -> ChatResponse {
        let term = search_term(raw_query);
        let places = self.directory.nearby(&term, center);

        let mut text = format!("Here are the results for **'{term}'**:\n");
        let mut points = Vec::with_capacity(places.len());
        for place in &places {
            text.push_str(&format!(
                "* **{}** ({:.1}⭐)\n  _{}_\n",
                place.name, place.rating, place.address
            ));
            points.push(MapPoint {
                latitude: place.latitude,
                longitude: place.longitude,
                name: place.name.clone(),
                color: None,
            });
        }

        ChatResponse {
            response_text: text,
            map_data: Some(MapPayload { points, routes: Vec::new() }),
        }
    }

    fn route_answer(&self, intent: &RouteIntent, center: &Coordinate) -> ChatResponse {
        let destination_name = title_case(&intent.destination);
        let destination = self.directory.geocode(&intent.destination, center);

        let (origin, origin_name, origin_known) = match &intent.origin {
            Some(name) => {
                let geocoded = self.directory.geocode(name, center);
                (geocoded.coordinate, title_case(name), geocoded.well_known)
            }
            None => (*center, "Your Location".to_string(), true),
        };

        let route = self.directory.driving_route(&origin, &destination.coordinate);
        let path = match polyline::decode(&route.polyline) {
            Ok(path) => path,
            Err(error) => {
                warn!(%error, "mock route polyline failed to decode");
                vec![origin, destination.coordinate]
            }
        };

        let mut text = format!(
            "### Route from {origin_name} to {destination_name}\n* 🚗 **Distance:** {}\n* ⏱️ **Time:** {}\n\n**Note:**\n* Drive safely!\n",
            route.distance_text(),
            route.duration_text(),
        );
        if !origin_known {
            text.push_str(&format!(
                "* I couldn't find \"{origin_name}\" exactly, so I picked a nearby spot.\n"
            ));
        }
        if !destination.well_known {
            text.push_str(&format!(
                "* \"{destination_name}\" isn't in my directory, so the destination is approximate.\n"
            ));
        }

        let mut points = Vec::new();
        if intent.origin.is_some() {
            // A custom origin gets the blue pin the client would otherwise
            // synthesize for the user's own position.
            points.push(MapPoint {
                latitude: origin.latitude,
                longitude: origin.longitude,
                name: origin_name,
                color: Some(MarkerColor::Blue),
            });
        }
        points.push(MapPoint {
            latitude: destination.coordinate.latitude,
            longitude: destination.coordinate.longitude,
            name: destination_name,
            color: None,
        });

        ChatResponse {
            response_text: text,
            map_data: Some(MapPayload {
                points,
                routes: vec![RoutePath { path, color: None }],
            }),
        }
    }
}

fn is_small_talk(query: &str) -> bool {
    let re = Regex::new(
        r"(?i)^(?:hi|hello|hey|yo|thanks|thank you|good\s+(?:morning|afternoon|evening))[\s!.?]*$",
    )
    .unwrap();
    re.is_match(query)
}

/// Pull a route request out of the query, with an optional origin override
/// ("from X to Y").
fn route_intent(query: &str) -> Option<RouteIntent> {
    let re = Regex::new(
        r"(?i)\b(?:directions?|route|navigate|navigation|drive|take me|get)\s+(?:me\s+)?(?:from\s+(?P<origin>.+?)\s+)?to\s+(?P<dest>.+)$",
    )
    .unwrap();

    let caps = re.captures(query)?;
    let destination = caps
        .name("dest")?
        .as_str()
        .trim()
        .trim_end_matches(['?', '.', '!'])
        .trim()
        .to_string();
    if destination.is_empty() {
        return None;
    }
    let origin = caps
        .name("origin")
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    Some(RouteIntent { origin, destination })
}

/// Strip search filler ("find ... near me") down to the term itself.
fn search_term(query: &str) -> String {
    let lead = Regex::new(r"(?i)^(?:find|show me|show|search for|where (?:is|are)|looking for|any)\s+").unwrap();
    let tail = Regex::new(r"(?i)\s+(?:near me|nearby|around here|close by)[\s!.?]*$").unwrap();

    let stripped = lead.replace(query, "");
    let stripped = tail.replace(&stripped, "");
    let term = stripped.trim().trim_end_matches(['?', '.', '!']).trim();
    if term.is_empty() {
        query.trim().to_string()
    } else {
        term.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center() -> Coordinate {
        Coordinate::new(34.0522, -118.2437)
    }

    fn request(query: &str) -> ChatRequest {
        ChatRequest {
            query: query.to_string(),
            location: Some(center()),
            image: None,
        }
    }

    #[test]
    fn test_route_intent_variants() {
        let plain = route_intent("directions to Union Station").unwrap();
        assert_eq!(plain.destination, "Union Station");
        assert_eq!(plain.origin, None);

        let with_origin = route_intent("route from Union Station to Dodger Stadium").unwrap();
        assert_eq!(with_origin.origin.as_deref(), Some("Union Station"));
        assert_eq!(with_origin.destination, "Dodger Stadium");

        let casual = route_intent("take me to the beach").unwrap();
        assert_eq!(casual.destination, "the beach");

        let question = route_intent("how do I get to Santa Monica Pier?").unwrap();
        assert_eq!(question.destination, "Santa Monica Pier");

        assert_eq!(route_intent("coffee near me"), None);
        assert_eq!(route_intent("best tacos in town"), None);
    }

    #[test]
    fn test_search_term_cleanup() {
        assert_eq!(search_term("find coffee shops near me"), "coffee shops");
        assert_eq!(search_term("where is the best taco truck"), "the best taco truck");
        assert_eq!(search_term("tacos"), "tacos");
        assert_eq!(search_term("pizza nearby!"), "pizza");
    }

    #[test]
    fn test_nearby_answer_lists_five_places() {
        let genie = GenieService::new(center());
        let response = genie.answer(&request("find coffee near me"));

        assert!(response.response_text.starts_with("Here are the results for **'coffee'**:"));
        assert!(response.response_text.contains("⭐"));
        let payload = response.map_data.unwrap();
        assert_eq!(payload.points.len(), 5);
        assert!(payload.routes.is_empty());
        assert!(payload.points.iter().all(|p| p.color.is_none()));
    }

    #[test]
    fn test_route_answer_without_origin() {
        let genie = GenieService::new(center());
        let response = genie.answer(&request("directions to Griffith Observatory"));

        assert!(response
            .response_text
            .contains("### Route from Your Location to Griffith Observatory"));
        assert!(response.response_text.contains("**Distance:**"));

        let payload = response.map_data.unwrap();
        // Destination only; the client synthesizes the origin marker.
        assert_eq!(payload.points.len(), 1);
        assert_eq!(payload.points[0].name, "Griffith Observatory");
        assert!(payload.points[0].color.is_none());
        assert!(!payload.has_custom_origin());

        assert_eq!(payload.routes.len(), 1);
        let path = &payload.routes[0].path;
        assert!(path.len() > 2);
        assert!((path[0].latitude - center().latitude).abs() < 1e-4);
        assert!((path.last().unwrap().latitude - 34.1184).abs() < 1e-4);
    }

    #[test]
    fn test_route_answer_with_origin_override() {
        let genie = GenieService::new(center());
        let response = genie.answer(&request("route from Union Station to Dodger Stadium"));

        let payload = response.map_data.unwrap();
        assert_eq!(payload.points.len(), 2);
        assert_eq!(payload.points[0].name, "Union Station");
        assert_eq!(payload.points[0].color, Some(MarkerColor::Blue));
        assert!(payload.has_custom_origin());

        // Both ends are known landmarks, no approximation notes.
        assert!(!response.response_text.contains("approximate"));
        assert!(!response.response_text.contains("picked a nearby spot"));
    }

    #[test]
    fn test_unknown_destination_is_flagged() {
        let genie = GenieService::new(center());
        let response = genie.answer(&request("directions to Aunt Mabel's Pie Stand"));

        assert!(response.response_text.contains("approximate"));
        assert!(response.map_data.is_some());
    }

    #[test]
    fn test_small_talk_has_no_map() {
        let genie = GenieService::new(center());
        let response = genie.answer(&request("Hi!"));

        assert!(response.map_data.is_none());
        assert!(!response.response_text.is_empty());
    }

    #[test]
    fn test_image_only_request() {
        let genie = GenieService::new(center());
        let response = genie.answer(&ChatRequest {
            query: String::new(),
            location: Some(center()),
            image: Some("aGVsbG8=".to_string()),
        });

        assert!(response.map_data.is_none());
        assert!(response.response_text.contains("image"));
    }

    #[test]
    fn test_missing_location_uses_default() {
        let genie = GenieService::new(center());
        let response = genie.answer(&ChatRequest {
            query: "coffee".to_string(),
            location: None,
            image: None,
        });

        let payload = response.map_data.unwrap();
        let first = &payload.points[0];
        let distance = crate::libraries::geodesy::distance_meters(
            &center(),
            &Coordinate::new(first.latitude, first.longitude),
        );
        assert!(distance < 2500.0);
    }
}
