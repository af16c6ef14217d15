//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::CoachStore;
use crate::services::{ReconciliationService, WebhookHandler};
use crate::stripe::AccountGateway;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the coach store and the services built on top of it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn CoachStore>,
    reconciler: Arc<ReconciliationService>,
    webhooks: WebhookHandler,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Coach store (Postgres or in-memory)
    /// * `gateway` - Stripe account gateway
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn CoachStore>,
        gateway: Arc<dyn AccountGateway>,
    ) -> Self {
        let reconciler = Arc::new(
            ReconciliationService::new(Arc::clone(&store), gateway, config.onboarding.clone())
                .with_policy(config.remote_status_policy)
                .with_account_country(config.stripe.account_country.clone()),
        );
        let webhooks = WebhookHandler::new(config.webhook.clone(), Arc::clone(&reconciler));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                reconciler,
                webhooks,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the coach store.
    #[must_use]
    pub fn store(&self) -> &dyn CoachStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the reconciliation service.
    #[must_use]
    pub fn reconciler(&self) -> &ReconciliationService {
        &self.inner.reconciler
    }

    /// Get a reference to the webhook handler.
    #[must_use]
    pub fn webhooks(&self) -> &WebhookHandler {
        &self.inner.webhooks
    }
}
