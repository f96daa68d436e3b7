//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::{AuthClient, SessionClients};
use crate::commerce::CommerceClient;
use crate::config::StorefrontConfig;
use crate::payments::ReplayGuard;
use crate::services::klarna::KlarnaClient;
use crate::services::sequra::SequraClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    /// Shared client for anonymous reads; never carries a token pair.
    anonymous: CommerceClient,
    /// Per-session clients, swapped on auth transitions.
    sessions: SessionClients,
    auth: AuthClient,
    klarna: KlarnaClient,
    sequra: SequraClient,
    replay: ReplayGuard,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, crate::services::klarna::KlarnaError> {
        let anonymous = CommerceClient::build(&config.commerce.api_url, None);
        let sessions = SessionClients::new(&config.commerce.api_url);
        let auth = AuthClient::new(&config.commerce.api_url);
        let klarna = KlarnaClient::new(&config.klarna)?;
        let sequra = SequraClient::new(&config.sequra);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                anonymous,
                sessions,
                auth,
                klarna,
                sequra,
                replay: ReplayGuard::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the shared anonymous commerce client.
    #[must_use]
    pub fn anonymous(&self) -> &CommerceClient {
        &self.inner.anonymous
    }

    /// Get the per-session client registry.
    #[must_use]
    pub fn sessions(&self) -> &SessionClients {
        &self.inner.sessions
    }

    /// Get the auth client.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Get the Klarna client.
    #[must_use]
    pub fn klarna(&self) -> &KlarnaClient {
        &self.inner.klarna
    }

    /// Get the SeQura client.
    #[must_use]
    pub fn sequra(&self) -> &SequraClient {
        &self.inner.sequra
    }

    /// Get the payment callback replay guard.
    #[must_use]
    pub fn replay(&self) -> &ReplayGuard {
        &self.inner.replay
    }
}
