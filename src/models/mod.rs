pub mod chat;
pub mod location;
pub mod map;

// Re-export commonly used types
pub use chat::{ChatRequest, ChatResponse, ChatTurn, ErrorBody, Role};
pub use location::{Coordinate, LocationSource, ResolvedLocation};
pub use map::{MapPayload, MapPoint, MarkerColor, RoutePath, DEFAULT_ROUTE_COLOR};
