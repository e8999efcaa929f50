//! CompassGenie: a map-and-chat assistant client with a mock dev backend.
//!
//! The client side lives in [`session`]: it resolves the user's location
//! (with retry and fallback), keeps the map scene in sync with assistant
//! replies, and talks JSON to a chat backend. The server side ([`server`],
//! [`services::genie`]) is a deterministic stand-in for the production
//! backend, good enough to develop and test the client offline.

pub mod config;
pub mod handlers;
pub mod libraries;
pub mod models;
pub mod server;
pub mod services;
pub mod session;
pub mod terminal;
