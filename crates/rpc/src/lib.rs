//! HTTP surface for trip scoring, hotspot prediction and zone lookup.

pub mod server;

pub use server::{build_router, start_server, AppState};
