//! Route modules.

pub mod bots;
pub mod health;
pub mod participants;

use axum::Router;

use crate::state::AppState;

/// Assembles every route under its public prefix.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/bots", bots::router().merge(participants::router()))
}
