//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::RwLock;

use crate::config::AppsConfig;
use crate::services::email::EmailService;
use crate::services::tax::TaxClient;
use crate::slack::SlackClient;

/// In-memory holder for the platform's installation token.
///
/// Durable per-tenant storage belongs to an external auth persistence layer;
/// this registry only keeps the token alive for the process.
#[derive(Clone, Default)]
pub struct InstallRegistry {
    token: Arc<RwLock<Option<SecretString>>>,
}

impl InstallRegistry {
    /// Store the installation token.
    pub async fn store(&self, token: String) {
        *self.token.write().await = Some(SecretString::from(token));
    }

    /// Whether an installation token has been received.
    pub async fn is_registered(&self) -> bool {
        self.token.read().await.is_some()
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppsConfig,
    install: InstallRegistry,
    slack: Option<SlackClient>,
    email: Option<EmailService>,
    tax: Option<TaxClient>,
}

impl AppState {
    /// Create a new application state, wiring up the configured integrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: AppsConfig) -> Result<Self, lettre::transport::smtp::Error> {
        let slack = config.slack.as_ref().map(SlackClient::new);
        let email = config
            .email
            .as_ref()
            .map(EmailService::new)
            .transpose()?;
        let tax = config.tax.as_ref().map(TaxClient::new);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                install: InstallRegistry::default(),
                slack,
                email,
                tax,
            }),
        })
    }

    /// Build a state with explicit integration clients. Test hook.
    #[must_use]
    pub fn with_integrations(
        config: AppsConfig,
        slack: Option<SlackClient>,
        email: Option<EmailService>,
        tax: Option<TaxClient>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                install: InstallRegistry::default(),
                slack,
                email,
                tax,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppsConfig {
        &self.inner.config
    }

    /// Get the installation token registry.
    #[must_use]
    pub fn install(&self) -> &InstallRegistry {
        &self.inner.install
    }

    /// Get the Slack client, if configured.
    #[must_use]
    pub fn slack(&self) -> Option<&SlackClient> {
        self.inner.slack.as_ref()
    }

    /// Get the email service, if configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Get the tax client, if configured.
    #[must_use]
    pub fn tax(&self) -> Option<&TaxClient> {
        self.inner.tax.as_ref()
    }
}
