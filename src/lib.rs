//! Vowza: event-planning site with a sequential intake questionnaire.

pub mod config;
pub mod error;
pub mod intake;
pub mod leads;
pub mod site;
pub mod store;
pub mod verification;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::intake::{IntakeRouteState, IntakeSessions, intake_routes};
use crate::site::{SiteState, site_routes};

/// Assemble the full HTTP app: pages, health and the intake API.
pub fn app(sessions: Arc<IntakeSessions>, turnstile_site_key: Option<String>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    site_routes(SiteState {
        sessions: Arc::clone(&sessions),
        turnstile_site_key,
    })
    .merge(intake_routes(IntakeRouteState { sessions }))
    .layer(cors)
}
