//! Scriptbot API: HTTP transport for bot administration and the two
//! interpreter entry points.

pub mod background;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod telemetry;
