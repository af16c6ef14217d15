//! Stripe webhook endpoint.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use tracing::{debug, instrument, warn};

use crate::error::AppError;
use crate::state::AppState;
use crate::stripe::webhook::SIGNATURE_HEADER;

/// Create webhook routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/remote-account", post(handle_remote_account))
}

/// Receive a Stripe Connect event.
///
/// Returns 400 only when the signature does not verify; every verified
/// delivery is acknowledged with 200 whatever processing made of it.
#[instrument(skip(state, headers, body))]
async fn handle_remote_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .webhooks()
        .handle(&body, signature)
        .await
        .map_err(|e| {
            warn!(error = %e, "Rejected webhook delivery");
            AppError::InvalidSignature
        })?;

    debug!(outcome = ?outcome, "Webhook processed");

    Ok((StatusCode::OK, "Webhook handled successfully"))
}
