//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COACHLINK_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; not needed when `COACHLINK_STORE=memory`)
//! - `STRIPE_SECRET_KEY` - Stripe secret or restricted key (`sk_...` / `rk_...`)
//! - `STRIPE_WEBHOOK_SECRET` - Webhook endpoint signing secret (`whsec_...`)
//! - `ONBOARDING_REFRESH_URL` - Where Stripe sends coaches whose onboarding link expired
//! - `ONBOARDING_RETURN_URL` - Where Stripe sends coaches after onboarding
//!
//! ## Optional
//! - `COACHLINK_HOST` - Bind address (default: 127.0.0.1)
//! - `COACHLINK_PORT` - Listen port (default: 8080)
//! - `COACHLINK_STORE` - `postgres` or `memory` (default: postgres)
//! - `COACHLINK_REMOTE_STATUS_POLICY` - `assume_incomplete` or `fail` (default: `assume_incomplete`)
//! - `COACHLINK_LOG_FORMAT` - `json` or `text` (default: text)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated origins (default: <http://localhost:3000>)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `STRIPE_ACCOUNT_COUNTRY` - Country for new Express accounts (default: US)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sample rates (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::services::RemoteStatusPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_ACCOUNT_COUNTRY: &str = "US";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Webhook timestamps older than this are rejected.
pub const DEFAULT_WEBHOOK_TOLERANCE: Duration = Duration::from_secs(300);

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Coach store backend
    pub store: StoreBackend,
    /// Stripe API configuration
    pub stripe: StripeConfig,
    /// Stripe webhook verification configuration
    pub webhook: WebhookConfig,
    /// Hosted onboarding redirect targets
    pub onboarding: OnboardingConfig,
    /// Origins allowed by the CORS layer
    pub cors_allowed_origins: Vec<String>,
    /// What registration does when a remote status check fails
    pub remote_status_policy: RemoteStatusPolicy,
    /// Emit JSON logs instead of human-readable text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Which coach store the server runs against.
#[derive(Clone)]
pub enum StoreBackend {
    /// `PostgreSQL` via sqlx.
    Postgres {
        /// Connection URL (contains password)
        database_url: SecretString,
    },
    /// Process-local map; contents are lost on restart.
    Memory,
}

impl std::fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret (`sk_`) or restricted (`rk_`) API key
    pub secret_key: SecretString,
    /// API base URL, overridable for tests
    pub api_base: Url,
    /// Two-letter country code for new Express accounts
    pub account_country: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base.as_str())
            .field("account_country", &self.account_country)
            .finish()
    }
}

/// Stripe webhook verification configuration.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct WebhookConfig {
    /// Endpoint signing secret (`whsec_...`)
    pub signing_secret: SecretString,
    /// Maximum accepted age of a signed timestamp
    pub tolerance: Duration,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("signing_secret", &"[REDACTED]")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

/// Redirect targets handed to Stripe when creating onboarding links.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Used when a link has expired or was already visited
    pub refresh_url: Url,
    /// Used once the coach leaves the hosted flow
    pub return_url: Url,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (prefix, placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("COACHLINK_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("COACHLINK_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("COACHLINK_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("COACHLINK_PORT".to_string(), e.to_string()))?;

        let store = StoreBackend::from_env()?;
        let stripe = StripeConfig::from_env()?;
        let webhook = WebhookConfig::from_env()?;
        let onboarding = OnboardingConfig::from_env()?;
        let cors_allowed_origins =
            parse_origins(&get_env_or_default("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ORIGIN))?;
        let remote_status_policy =
            get_env_or_default("COACHLINK_REMOTE_STATUS_POLICY", "assume_incomplete")
                .parse::<RemoteStatusPolicy>()
                .map_err(|e| {
                    ConfigError::InvalidEnvVar("COACHLINK_REMOTE_STATUS_POLICY".to_string(), e)
                })?;
        let json_logs = get_env_or_default("COACHLINK_LOG_FORMAT", "text").eq_ignore_ascii_case("json");

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            store,
            stripe,
            webhook,
            onboarding,
            cors_allowed_origins,
            remote_status_policy,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StoreBackend {
    fn from_env() -> Result<Self, ConfigError> {
        match get_env_or_default("COACHLINK_STORE", "postgres")
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => Ok(Self::Postgres {
                database_url: get_database_url("COACHLINK_DATABASE_URL")?,
            }),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidEnvVar(
                "COACHLINK_STORE".to_string(),
                format!("expected 'postgres' or 'memory', got '{other}'"),
            )),
        }
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret_key = get_prefixed_secret("STRIPE_SECRET_KEY", &["sk_", "rk_"])?;
        let api_base = parse_url(
            "STRIPE_API_BASE",
            &get_env_or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
        )?;
        let account_country = get_env_or_default("STRIPE_ACCOUNT_COUNTRY", DEFAULT_ACCOUNT_COUNTRY);
        validate_country(&account_country)?;

        Ok(Self {
            secret_key,
            api_base,
            account_country: account_country.to_ascii_uppercase(),
        })
    }
}

impl WebhookConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            signing_secret: get_prefixed_secret("STRIPE_WEBHOOK_SECRET", &["whsec_"])?,
            tolerance: DEFAULT_WEBHOOK_TOLERANCE,
        })
    }
}

impl OnboardingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            refresh_url: parse_url(
                "ONBOARDING_REFRESH_URL",
                &get_required_env("ONBOARDING_REFRESH_URL")?,
            )?,
            return_url: parse_url(
                "ONBOARDING_RETURN_URL",
                &get_required_env("ONBOARDING_RETURN_URL")?,
            )?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an absolute http(s) URL.
fn parse_url(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Split a comma-separated origin list, dropping empty entries.
fn parse_origins(value: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect();

    if origins.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            "CORS_ALLOWED_ORIGINS".to_string(),
            "at least one origin is required".to_string(),
        ));
    }
    Ok(origins)
}

fn validate_country(country: &str) -> Result<(), ConfigError> {
    if country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "STRIPE_ACCOUNT_COUNTRY".to_string(),
            format!("expected a two-letter country code, got '{country}'"),
        ))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key from the Stripe dashboard."
            ),
        ));
    }

    Ok(())
}

/// Check that a secret carries one of the expected Stripe prefixes.
fn validate_secret_prefix(secret: &str, var_name: &str, prefixes: &[&str]) -> Result<(), ConfigError> {
    if prefixes.iter().any(|p| secret.starts_with(p)) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("must start with one of: {}", prefixes.join(", ")),
        ))
    }
}

/// Load a Stripe secret from the environment and validate prefix and strength.
fn get_prefixed_secret(key: &str, prefixes: &[&str]) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_prefix(&value, key, prefixes)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
