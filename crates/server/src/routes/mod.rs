//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (store round trip)
//!
//! # Accounts
//! POST /accounts                    - Register a coach or reuse their account
//! POST /accounts/onboarding-link    - Hosted onboarding link
//! GET  /accounts/status             - Refresh and report account flags
//! GET  /accounts/dashboard-link     - Express dashboard link
//! GET  /accounts/lookup             - Registration status by email
//!
//! # Webhooks
//! POST /webhooks/remote-account     - Stripe Connect events
//! ```

pub mod accounts;
pub mod health;
pub mod webhooks;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::state::AppState;

/// Create the API routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(accounts::router())
        .merge(webhooks::router())
}

/// Build the application router with CORS applied and state attached.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_allowed_origins);
    routes().layer(cors).with_state(state)
}

/// CORS layer allowing the configured origins.
///
/// Origins that are not valid header values are skipped with a warning.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
