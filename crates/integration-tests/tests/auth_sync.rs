//! Tests for auth-change synchronization.
//!
//! Covers the two cache-consistency properties the storefront promises:
//! after sign-out no query is served from the prior session's cache, and
//! after sign-in previously mounted queries are re-fetched.

use axum::http::StatusCode;
use mockito::Matcher;
use serde_json::json;

use coastline_core::{CheckoutId, TokenPair};
use coastline_storefront::auth::{AuthState, MountedQuery, SessionClients};

use coastline_integration_tests::{
    body_string, checkout_json, get, gql_data, order_json, post_form, session_cookie,
    storefront_app,
};

fn token_create_body(access: &str, email: &str) -> String {
    gql_data(json!({
        "tokenCreate": {
            "accessToken": access,
            "refreshToken": format!("refresh-{access}"),
            "expiresIn": 3600,
            "refreshExpiresIn": 86400,
            "customer": {
                "id": "gid://platform/Customer/1",
                "email": email,
                "firstName": "Sandy",
                "lastName": "Shore"
            },
            "errors": []
        }
    }))
}

#[tokio::test]
async fn test_sign_out_discards_cached_query_results() {
    let mut server = mockito::Server::new_async().await;
    let (app, _state) = storefront_app(&server.url());

    // Sign in.
    let m_token = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("tokenCreate".to_owned()))
        .with_status(200)
        .with_body(token_create_body("acc-a", "a@example.com"))
        .expect(1)
        .create_async()
        .await;

    let response = post_form(
        &app,
        "/auth/login",
        "email=a%40example.com&password=hunter2-but-longer",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response).expect("session cookie set");
    m_token.assert_async().await;

    // The order view hits the platform once, then serves from cache, then
    // hits the platform again after sign-out. Two network calls total for
    // three renders proves both the caching and the cache teardown.
    let m_order = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("query order".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({ "order": order_json("o-1", "1001") })))
        .expect(2)
        .create_async()
        .await;

    let response = get(&app, "/orders/o-1/confirmed", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Second render: served from the signed-in client's cache.
    let response = get(&app, "/orders/o-1/confirmed", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Sign out: the client (and its cache) is replaced.
    let m_deactivate = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("tokenDeactivate".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({ "tokenDeactivate": { "errors": [] } })))
        .expect(1)
        .create_async()
        .await;

    let response = post_form(&app, "/auth/logout", "", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    m_deactivate.assert_async().await;

    // Third render: must NOT come from the prior session's cache.
    let response = get(&app, "/orders/o-1/confirmed", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    m_order.assert_async().await;
}

#[tokio::test]
async fn test_order_history_reflects_new_identity_after_reauth() {
    let mut server = mockito::Server::new_async().await;
    let (app, _state) = storefront_app(&server.url());

    // Sign in as A; history shows A's orders.
    let m_token_a = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("tokenCreate".to_owned()))
        .with_status(200)
        .with_body(token_create_body("acc-a", "a@example.com"))
        .expect(1)
        .create_async()
        .await;

    let response = post_form(
        &app,
        "/auth/login",
        "email=a%40example.com&password=correct-horse-battery",
        None,
    )
    .await;
    let cookie = session_cookie(&response).expect("session cookie set");
    m_token_a.assert_async().await;

    let m_orders_a = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("query myOrders".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({
            "me": { "orders": { "edges": [ { "node": order_json("o-a", "2001") } ] } }
        })))
        .expect(1)
        .create_async()
        .await;

    let response = get(&app, "/account/orders", Some(&cookie)).await;
    let body = body_string(response).await;
    assert!(body.contains("2001"), "body: {body}");
    m_orders_a.assert_async().await;

    // Sign out, then sign in as B. The same view must now show B's orders,
    // not anything cached for A.
    let m_deactivate = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("tokenDeactivate".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({ "tokenDeactivate": { "errors": [] } })))
        .expect(1)
        .create_async()
        .await;
    post_form(&app, "/auth/logout", "", Some(&cookie)).await;
    m_deactivate.assert_async().await;

    let m_token_b = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("tokenCreate".to_owned()))
        .with_status(200)
        .with_body(token_create_body("acc-b", "b@example.com"))
        .expect(1)
        .create_async()
        .await;

    let response = post_form(
        &app,
        "/auth/login",
        "email=b%40example.com&password=correct-horse-battery",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    m_token_b.assert_async().await;

    let m_orders_b = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("query myOrders".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({
            "me": { "orders": { "edges": [ { "node": order_json("o-b", "3001") } ] } }
        })))
        .expect(1)
        .create_async()
        .await;

    let response = get(&app, "/account/orders", Some(&cookie)).await;
    let body = body_string(response).await;
    assert!(body.contains("3001"), "body: {body}");
    assert!(!body.contains("2001"), "body: {body}");
    m_orders_b.assert_async().await;
}

#[tokio::test]
async fn test_sign_in_refetches_mounted_queries() {
    let mut server = mockito::Server::new_async().await;
    let endpoint = format!("{}/graphql/", server.url());

    let sessions = SessionClients::new(&endpoint);

    // A signed-out view mounts the checkout query without fetching it.
    sessions.client("s-1").await;
    sessions
        .mark_mounted("s-1", MountedQuery::Checkout(CheckoutId::new("c-1")))
        .await;

    // Exactly one fetch: the refetch during the sign-in transition. The
    // follow-up read is served from the rebuilt client's warmed cache.
    let m_checkout = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("query checkout".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({
            "checkout": checkout_json("c-1", Some("a@example.com"))
        })))
        .expect(1)
        .create_async()
        .await;

    let now = chrono::Utc::now().timestamp();
    let pair = TokenPair::from_lifetimes(
        "acc-a".to_owned(),
        Some("ref-a".to_owned()),
        now,
        3600,
        None,
    );

    sessions.apply("s-1", AuthState::SignedIn, Some(pair)).await;
    m_checkout.assert_async().await;

    let client = sessions.client("s-1").await;
    let checkout = client
        .checkout(&CheckoutId::new("c-1"))
        .await
        .expect("served from warmed cache");
    assert_eq!(checkout.email.as_deref(), Some("a@example.com"));

    // Still one network call in total.
    m_checkout.assert_async().await;
}
