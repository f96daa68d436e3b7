//! Tests for the platform app service: manifest, registration, and signed
//! webhook handling.

use axum::http::StatusCode;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::json;
use sha2::{Sha256, Sha512};

use coastline_apps::config::{AuthorizeNetConfig, SlackConfig};
use coastline_apps::slack::SlackClient;
use coastline_apps::state::AppState;

use coastline_integration_tests::{
    WEBHOOK_SECRET, apps_config, body_string, get, post_json_with_headers,
};

fn apps_app() -> axum::Router {
    let state = AppState::with_integrations(apps_config(), None, None, None);
    coastline_apps::app(state)
}

fn order_webhook_body() -> String {
    json!({
        "event": "ORDER_CREATED",
        "order": {
            "id": "gid://platform/Order/5",
            "number": "1005",
            "total": {"amount": "19.99", "currency": "USD"},
            "customerEmail": "shopper@example.com"
        }
    })
    .to_string()
}

fn sign_platform(timestamp: &str, body: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).expect("key length is fine");
    mac.update(format!("{timestamp}.{body}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[tokio::test]
async fn test_manifest_lists_webhook_subscriptions() {
    let app = apps_app();

    let response = get(&app, "/api/manifest", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    let manifest: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");

    assert_eq!(manifest["id"], "sh.coastline.apps");
    assert_eq!(
        manifest["tokenTargetUrl"],
        "http://apps.test/api/register"
    );
    assert_eq!(
        manifest["webhooks"][0]["targetUrl"],
        "http://apps.test/api/webhooks/orders"
    );
    assert_eq!(manifest["webhooks"][0]["events"][0], "ORDER_CREATED");
}

#[tokio::test]
async fn test_register_accepts_installation_token() {
    let state = AppState::with_integrations(apps_config(), None, None, None);
    let app = coastline_apps::app(state.clone());

    assert!(!state.install().is_registered().await);

    let response = post_json_with_headers(
        &app,
        "/api/register",
        &json!({ "authToken": "install-token-1" }).to_string(),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(state.install().is_registered().await);
}

#[tokio::test]
async fn test_order_webhook_accepts_valid_signature() {
    let app = apps_app();

    let body = order_webhook_body();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign_platform(&timestamp, &body);

    let response = post_json_with_headers(
        &app,
        "/api/webhooks/orders",
        &body,
        &[
            ("x-platform-timestamp", timestamp.as_str()),
            ("x-platform-signature", signature.as_str()),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_order_webhook_rejects_invalid_signature_without_fanout() {
    let mut server = mockito::Server::new_async().await;

    let slack = SlackClient::with_api_base(
        &SlackConfig {
            bot_token: SecretString::from("xoxb-test"),
            orders_channel: "C012345".to_owned(),
        },
        &server.url(),
    );
    let state = AppState::with_integrations(apps_config(), Some(slack), None, None);
    let app = coastline_apps::app(state);

    let slack_mock = server
        .mock("POST", "/chat.postMessage")
        .expect(0)
        .create_async()
        .await;

    let body = order_webhook_body();
    let timestamp = chrono::Utc::now().timestamp().to_string();

    let response = post_json_with_headers(
        &app,
        "/api/webhooks/orders",
        &body,
        &[
            ("x-platform-timestamp", timestamp.as_str()),
            ("x-platform-signature", "deadbeef"),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    slack_mock.assert_async().await;
}

#[tokio::test]
async fn test_order_webhook_rejects_missing_headers() {
    let app = apps_app();

    let response =
        post_json_with_headers(&app, "/api/webhooks/orders", &order_webhook_body(), &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_webhook_rejects_stale_timestamp() {
    let app = apps_app();

    let body = order_webhook_body();
    let stale = (chrono::Utc::now().timestamp() - 3600).to_string();
    let signature = sign_platform(&stale, &body);

    let response = post_json_with_headers(
        &app,
        "/api/webhooks/orders",
        &body,
        &[
            ("x-platform-timestamp", stale.as_str()),
            ("x-platform-signature", signature.as_str()),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_order_webhook_notifies_slack() {
    let mut server = mockito::Server::new_async().await;

    let slack = SlackClient::with_api_base(
        &SlackConfig {
            bot_token: SecretString::from("xoxb-test"),
            orders_channel: "C012345".to_owned(),
        },
        &server.url(),
    );
    let state = AppState::with_integrations(apps_config(), Some(slack), None, None);
    let app = coastline_apps::app(state);

    let slack_mock = server
        .mock("POST", "/chat.postMessage")
        .with_status(200)
        .with_body(json!({ "ok": true, "channel": "C012345", "ts": "1.2" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let body = order_webhook_body();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign_platform(&timestamp, &body);

    let response = post_json_with_headers(
        &app,
        "/api/webhooks/orders",
        &body,
        &[
            ("x-platform-timestamp", timestamp.as_str()),
            ("x-platform-signature", signature.as_str()),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    slack_mock.assert_async().await;
}

#[tokio::test]
async fn test_authorize_net_webhook_verifies_signature() {
    let mut config = apps_config();
    config.authorize_net = Some(AuthorizeNetConfig {
        signature_key: SecretString::from("anet-key"),
    });
    let state = AppState::with_integrations(config, None, None, None);
    let app = coastline_apps::app(state);

    let body = json!({
        "notificationId": "n-1",
        "eventType": "net.authorize.payment.authcapture.created",
        "payload": {"id": "trans-9"}
    })
    .to_string();

    let mut mac = Hmac::<Sha512>::new_from_slice(b"anet-key").expect("key length is fine");
    mac.update(body.as_bytes());
    let header = format!("sha512={}", hex::encode_upper(mac.finalize().into_bytes()));

    let response = post_json_with_headers(
        &app,
        "/api/webhooks/authorize-net",
        &body,
        &[("x-anet-signature", header.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Tampered body must be rejected.
    let response = post_json_with_headers(
        &app,
        "/api/webhooks/authorize-net",
        "{}",
        &[("x-anet-signature", header.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
