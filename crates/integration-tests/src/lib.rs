//! Integration test support for Coastline.
//!
//! Builds the real storefront and app-service routers against a mock
//! upstream (the commerce platform and the payment providers are both
//! served by `mockito` in the tests), and drives them with
//! `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use secrecy::SecretString;
use tower::ServiceExt;

use coastline_apps::config::AppsConfig;
use coastline_storefront::config::{
    CommerceConfig, KlarnaConfig, SequraConfig, StorefrontConfig,
};
use coastline_storefront::state::AppState;

/// Shared secret used for SeQura IPN signatures in tests.
pub const SEQURA_IPN_SECRET: &str = "sequra-ipn-signing-key-for-tests!!";

/// Shared secret used for platform webhook signatures in tests.
pub const WEBHOOK_SECRET: &str = "platform-webhook-signing-key-tests";

/// Build a storefront configuration pointed at a mock upstream.
///
/// `upstream` serves both the platform GraphQL endpoint (`/graphql/`) and
/// the payment provider APIs.
#[must_use]
pub fn storefront_config(upstream: &str) -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://storefront.test".to_owned(),
        commerce: CommerceConfig {
            api_url: format!("{upstream}/graphql/"),
        },
        klarna: KlarnaConfig {
            api_url: upstream.to_owned(),
            username: "merchant".to_owned(),
            password: SecretString::from("klarna-pass"),
        },
        sequra: SequraConfig {
            api_url: upstream.to_owned(),
            merchant_ref: "coastline".to_owned(),
            username: "merchant".to_owned(),
            password: SecretString::from("sequra-pass"),
            ipn_secret: SecretString::from(SEQURA_IPN_SECRET),
        },
        sentry_dsn: None,
    }
}

/// Build the storefront app and its state against a mock upstream.
#[must_use]
pub fn storefront_app(upstream: &str) -> (Router, AppState) {
    let state = AppState::new(storefront_config(upstream)).unwrap();
    (coastline_storefront::app(state.clone()), state)
}

/// Build an app-service configuration with no optional integrations.
#[must_use]
pub fn apps_config() -> AppsConfig {
    AppsConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://apps.test".to_owned(),
        webhook_secret: SecretString::from(WEBHOOK_SECRET),
        slack: None,
        email: None,
        tax: None,
        authorize_net: None,
        sentry_dsn: None,
    }
}

/// Send a GET request, optionally with a session cookie.
pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a POST request with a urlencoded form body.
pub async fn post_form(
    app: &Router,
    uri: &str,
    body: &str,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(body.to_owned())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body and extra headers.
pub async fn post_json_with_headers(
    app: &Router,
    uri: &str,
    body: &str,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_owned())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Extract the session cookie pair from a response, if one was set.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(ToOwned::to_owned)
}

/// Read a response body to a string.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// =============================================================================
// Platform response fixtures
// =============================================================================

/// A checkout object as the platform returns it.
#[must_use]
pub fn checkout_json(id: &str, email: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "email": email,
        "status": "ACTIVE",
        "lines": [{
            "id": "line-1",
            "variantId": "v-1",
            "title": "Tide Clock",
            "quantity": 1,
            "unitPrice": {"amount": "24.00", "currency": "USD"},
            "totalPrice": {"amount": "24.00", "currency": "USD"}
        }],
        "subtotal": {"amount": "24.00", "currency": "USD"},
        "total": {"amount": "24.00", "currency": "USD"}
    })
}

/// An order object as the platform returns it.
#[must_use]
pub fn order_json(id: &str, number: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "number": number,
        "status": "UNFULFILLED",
        "total": {"amount": "24.00", "currency": "USD"},
        "createdAt": "2026-08-01T12:00:00Z"
    })
}

/// Wrap a value as a GraphQL `data` envelope body.
#[must_use]
pub fn gql_data(value: serde_json::Value) -> String {
    serde_json::json!({ "data": value }).to_string()
}
