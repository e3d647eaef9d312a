//! HTTP façade and process wiring for the tvmon sidecar.

pub mod api;
pub mod app;
pub mod config;
pub mod host;
pub mod logging;
pub mod middleware;
pub mod state;
