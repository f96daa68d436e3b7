//! App manifest and installation endpoints.
//!
//! The platform fetches the manifest during installation, then POSTs an app
//! token to `tokenTargetUrl`. The token is held in process memory only;
//! durable per-tenant storage is the job of an external auth persistence
//! layer and is out of scope here.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::state::AppState;

/// Events the app subscribes to on the orders webhook.
pub const ORDER_EVENTS: &[&str] = &["ORDER_CREATED", "ORDER_PAID"];

/// A static descriptor of this app's permissions and webhook subscriptions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub about: String,
    pub permissions: Vec<String>,
    pub app_url: String,
    pub token_target_url: String,
    pub webhooks: Vec<WebhookSubscription>,
}

/// One webhook subscription in the manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSubscription {
    pub name: String,
    pub target_url: String,
    pub events: Vec<String>,
}

impl Manifest {
    /// Build the manifest for this deployment.
    #[must_use]
    pub fn build(base_url: &str) -> Self {
        Self {
            id: "sh.coastline.apps".to_owned(),
            name: "Coastline Integrations".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            about: "Order notifications, email and tax integrations.".to_owned(),
            permissions: vec!["MANAGE_ORDERS".to_owned(), "HANDLE_PAYMENTS".to_owned()],
            app_url: base_url.to_owned(),
            token_target_url: format!("{base_url}/api/register"),
            webhooks: vec![WebhookSubscription {
                name: "Order events".to_owned(),
                target_url: format!("{base_url}/api/webhooks/orders"),
                events: ORDER_EVENTS.iter().map(|&e| e.to_owned()).collect(),
            }],
        }
    }
}

/// Serve the app manifest.
pub async fn manifest(State(state): State<AppState>) -> Json<Manifest> {
    Json(Manifest::build(&state.config().base_url))
}

/// Installation token hand-off body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub auth_token: String,
}

/// Receive the app token the platform issues at install time.
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> impl IntoResponse {
    state.install().store(request.auth_token).await;
    info!("app installation token received");

    (StatusCode::OK, Json(serde_json::json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_urls_derive_from_base() {
        let manifest = Manifest::build("https://apps.coastline.sh");

        assert_eq!(
            manifest.token_target_url,
            "https://apps.coastline.sh/api/register"
        );
        let webhook = manifest.webhooks.first().expect("one subscription");
        assert_eq!(
            webhook.target_url,
            "https://apps.coastline.sh/api/webhooks/orders"
        );
        assert_eq!(webhook.events, vec!["ORDER_CREATED", "ORDER_PAID"]);
    }

    #[test]
    fn test_manifest_serializes_camel_case() {
        let manifest = Manifest::build("https://apps.coastline.sh");
        let json = serde_json::to_value(&manifest).expect("serialize");

        assert!(json.get("tokenTargetUrl").is_some());
        assert!(json.get("appUrl").is_some());
        assert!(json["webhooks"][0].get("targetUrl").is_some());
    }
}
