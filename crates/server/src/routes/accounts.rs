//! Coach account route handlers.
//!
//! Handlers validate input, call the reconciliation service, and shape the
//! camelCase JSON responses.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use coachlink_core::{AccountId, CoachId, Email, OnboardingStatus};

use crate::error::AppError;
use crate::state::AppState;

/// Create account routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/onboarding-link", post(onboarding_link))
        .route("/accounts/status", get(account_status))
        .route("/accounts/dashboard-link", get(dashboard_link))
        .route("/accounts/lookup", get(lookup))
}

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    pub id: CoachId,
    pub email: Email,
    pub name: String,
    pub external_account_id: AccountId,
    pub status: OnboardingStatus,
    pub is_registered: bool,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingLinkRequest {
    pub external_account_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingLinkResponse {
    pub onboarding_url: String,
}

/// Query string carrying `externalAccountId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    pub external_account_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatusResponse {
    pub external_account_id: AccountId,
    pub details_submitted: bool,
    pub payouts_enabled: bool,
    pub onboarding_complete: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardLinkResponse {
    pub dashboard_url: String,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub id: Option<CoachId>,
    pub email: Email,
    pub name: Option<String>,
    pub external_account_id: Option<AccountId>,
    pub status: OnboardingStatus,
    pub is_registered: bool,
}

// =============================================================================
// Validation
// =============================================================================

/// Trimmed, non-blank value of a required field.
fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

fn parse_email(value: Option<&str>) -> Result<Email, AppError> {
    Email::parse(required(value, "Email")?).map_err(|e| AppError::Validation(format!("Invalid email: {e}")))
}

fn parse_account_id(value: Option<&str>) -> Result<AccountId, AppError> {
    AccountId::parse(required(value, "Account ID")?)
        .map_err(|e| AppError::Validation(format!("Invalid account ID: {e}")))
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a coach, or reuse the Stripe account already bound to the email.
#[instrument(skip(state, payload))]
async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<Json<CreateAccountResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let email = parse_email(request.email.as_deref())?;
    let name = required(request.name.as_deref(), "Name")?;

    let registration = state.reconciler().register_or_reuse(&email, name).await?;

    Ok(Json(CreateAccountResponse {
        id: registration.coach.id,
        email: registration.coach.email,
        name: registration.coach.name,
        external_account_id: registration.account_id,
        status: registration.status,
        is_registered: true,
        message: registration.message,
    }))
}

/// Create a hosted onboarding link.
#[instrument(skip(state, payload))]
async fn onboarding_link(
    State(state): State<AppState>,
    payload: Result<Json<OnboardingLinkRequest>, JsonRejection>,
) -> Result<Json<OnboardingLinkResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let account_id = parse_account_id(request.external_account_id.as_deref())?;

    let onboarding_url = state.reconciler().onboarding_link(&account_id).await?;

    Ok(Json(OnboardingLinkResponse { onboarding_url }))
}

/// Refresh the account's flags from Stripe and report them.
#[instrument(skip(state))]
async fn account_status(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
) -> Result<Json<AccountStatusResponse>, AppError> {
    let account_id = parse_account_id(query.external_account_id.as_deref())?;

    let status = state.reconciler().refresh_status(&account_id).await?;

    Ok(Json(AccountStatusResponse {
        external_account_id: account_id,
        details_submitted: status.details_submitted,
        payouts_enabled: status.payouts_enabled,
        onboarding_complete: status.onboarding_complete(),
    }))
}

/// Create an Express dashboard link.
#[instrument(skip(state))]
async fn dashboard_link(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
) -> Result<Json<DashboardLinkResponse>, AppError> {
    let account_id = parse_account_id(query.external_account_id.as_deref())?;

    let dashboard_url = state.reconciler().dashboard_link(&account_id).await?;

    Ok(Json(DashboardLinkResponse { dashboard_url }))
}

/// Report whether an email is registered.
#[instrument(skip(state))]
async fn lookup(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, AppError> {
    let email = parse_email(query.email.as_deref())?;

    let lookup = state.reconciler().lookup(&email).await?;
    let is_registered = lookup.is_registered();

    let response = match lookup.coach {
        Some(coach) => LookupResponse {
            id: Some(coach.id),
            email: coach.email,
            name: Some(coach.name),
            external_account_id: coach.external_account_id,
            status: lookup.status,
            is_registered,
        },
        None => LookupResponse {
            id: None,
            email,
            name: None,
            external_account_id: None,
            status: lookup.status,
            is_registered,
        },
    };

    Ok(Json(response))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required(Some("  Alex "), "Name").unwrap(), "Alex");
        assert!(matches!(
            required(Some("   "), "Name"),
            Err(AppError::Validation(msg)) if msg == "Name is required"
        ));
        assert!(required(None, "Name").is_err());
    }

    #[test]
    fn test_parse_account_id_messages() {
        assert!(matches!(
            parse_account_id(None),
            Err(AppError::Validation(msg)) if msg == "Account ID is required"
        ));
        assert!(matches!(
            parse_account_id(Some("cus_1")),
            Err(AppError::Validation(msg)) if msg.starts_with("Invalid account ID")
        ));
        assert_eq!(parse_account_id(Some(" acct_1 ")).unwrap().as_str(), "acct_1");
    }

    #[test]
    fn test_parse_email_messages() {
        assert!(matches!(
            parse_email(Some("")),
            Err(AppError::Validation(msg)) if msg == "Email is required"
        ));
        assert!(matches!(
            parse_email(Some("nope")),
            Err(AppError::Validation(msg)) if msg.starts_with("Invalid email")
        ));
    }
}
