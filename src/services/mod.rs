pub mod chat;
pub mod genie;
pub mod geoip;
pub mod locator;
pub mod map_renderer;
pub mod places;
