//! HTTP route definitions.

mod commits;
mod health;
mod models;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/v0", models::routes().merge(commits::routes()))
}
