//! End-to-end tests for the payment redirect flows.
//!
//! The mock upstream plays both the commerce platform (`/graphql/`) and the
//! payment providers. GraphQL operations are told apart by operation name in
//! the request body.

use axum::http::StatusCode;
use mockito::Matcher;
use serde_json::json;

use coastline_integration_tests::{
    SEQURA_IPN_SECRET, body_string, checkout_json, get, gql_data, order_json, post_form,
    post_json_with_headers, session_cookie, storefront_app,
};

/// Create a checkout through the storefront and return the session cookie.
async fn create_checkout(server: &mut mockito::Server, app: &axum::Router) -> String {
    let mock = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("checkoutCreate".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({
            "checkoutCreate": {
                "checkout": checkout_json("c-1", None),
                "errors": []
            }
        })))
        .expect(1)
        .create_async()
        .await;

    let response = post_form(app, "/checkout/lines", "variant_id=v-1&quantity=1", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response).expect("session cookie set");

    mock.assert_async().await;
    cookie
}

#[tokio::test]
async fn test_klarna_flow_produces_exactly_one_order_view() {
    let mut server = mockito::Server::new_async().await;
    let (app, _state) = storefront_app(&server.url());

    let cookie = create_checkout(&mut server, &app).await;

    // --- start: checkout fetch, transaction init, Klarna session ---
    let m_checkout = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("query checkout".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({ "checkout": checkout_json("c-1", None) })))
        .expect(1)
        .create_async()
        .await;

    let m_init = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("transactionInitialize".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({
            "transactionInitialize": {
                "transaction": { "transactionId": "t-1", "data": null },
                "errors": []
            }
        })))
        .expect(1)
        .create_async()
        .await;

    let m_hpp = server
        .mock("POST", "/hpp/v1/sessions")
        .with_status(200)
        .with_body(
            json!({
                "session_id": "hpp-1",
                "redirect_url": "https://pay.klarna.test/hpp-1"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let response = get(&app, "/checkout/pay/klarna/start", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("https://pay.klarna.test/hpp-1")
    );

    m_checkout.assert_async().await;
    m_init.assert_async().await;
    m_hpp.assert_async().await;

    // --- confirm: Klarna order confirmation + platform completion ---
    let m_confirm = server
        .mock(
            "POST",
            Matcher::Regex(r"^/payments/v1/authorizations/.+/order$".to_owned()),
        )
        .with_status(200)
        .with_body(json!({ "order_id": "k-1", "fraud_status": "ACCEPTED" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let m_complete = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("checkoutComplete".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({
            "checkoutComplete": {
                "order": order_json("o-1", "1001"),
                "errors": []
            }
        })))
        .expect(1)
        .create_async()
        .await;

    let confirm_uri =
        "/checkout/pay/klarna/confirm?checkout=c-1&transaction=t-1&authorization_token=auth-tok";
    let response = get(&app, confirm_uri, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Order created"), "body: {body}");
    assert!(body.contains("1001"), "body: {body}");

    m_confirm.assert_async().await;
    m_complete.assert_async().await;

    // --- replay: same callback again renders the same order, and the
    // checkout is NOT completed a second time ---
    let m_order = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("query order".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({ "order": order_json("o-1", "1001") })))
        .expect(1)
        .create_async()
        .await;

    let response = get(&app, confirm_uri, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("1001"), "body: {body}");

    m_order.assert_async().await;
    // expect(1) on m_confirm and m_complete already pinned the counts; a
    // second hit would have failed those asserts above, but re-assert to be
    // explicit about the replay not reaching them.
    m_confirm.assert_async().await;
    m_complete.assert_async().await;
}

#[tokio::test]
async fn test_klarna_callback_missing_parameter_renders_error_without_network() {
    let mut server = mockito::Server::new_async().await;
    let (app, _state) = storefront_app(&server.url());

    let catch_all = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    // checkout parameter missing
    let response = get(
        &app,
        "/checkout/pay/klarna/confirm?transaction=t-1&authorization_token=x",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("Payment failed"), "body: {body}");
    assert!(body.contains("Missing checkout reference"), "body: {body}");

    // authorization token missing
    let response = get(
        &app,
        "/checkout/pay/klarna/confirm?checkout=c-1&transaction=t-1",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    catch_all.assert_async().await;
}

#[tokio::test]
async fn test_klarna_start_without_checkout_renders_error_without_network() {
    let mut server = mockito::Server::new_async().await;
    let (app, _state) = storefront_app(&server.url());

    let catch_all = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let response = get(&app, "/checkout/pay/klarna/start", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("No active checkout"), "body: {body}");

    catch_all.assert_async().await;
}

#[tokio::test]
async fn test_klarna_callback_with_unknown_transaction_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let (app, _state) = storefront_app(&server.url());

    let catch_all = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    // Well-formed parameters, but no session ever started this transaction.
    let response = get(
        &app,
        "/checkout/pay/klarna/confirm?checkout=c-1&transaction=t-99&authorization_token=x",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("Unknown payment transaction"), "body: {body}");

    catch_all.assert_async().await;
}

fn sign_ipn(body: &str) -> String {
    use hmac::{Hmac, Mac};
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(SEQURA_IPN_SECRET.as_bytes())
        .expect("key length is fine");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[tokio::test]
async fn test_sequra_flow_completes_once_across_replayed_ipns() {
    let mut server = mockito::Server::new_async().await;
    let (app, _state) = storefront_app(&server.url());

    let cookie = create_checkout(&mut server, &app).await;

    // --- start ---
    let m_checkout = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("query checkout".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({ "checkout": checkout_json("c-1", None) })))
        .expect(1)
        .create_async()
        .await;

    let m_init = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("transactionInitialize".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({
            "transactionInitialize": {
                "transaction": { "transactionId": "t-2", "data": null },
                "errors": []
            }
        })))
        .expect(1)
        .create_async()
        .await;

    let m_solicit = server
        .mock("POST", "/merchants/coastline/orders")
        .with_status(200)
        .with_body(
            json!({
                "order_ref": "sq-1",
                "form_url": "https://form.sequra.test/sq-1"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let response = get(&app, "/checkout/pay/sequra/start", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("https://form.sequra.test/sq-1")
    );

    m_checkout.assert_async().await;
    m_init.assert_async().await;
    m_solicit.assert_async().await;

    // --- signed IPN completes the checkout exactly once ---
    let m_complete = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("checkoutComplete".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({
            "checkoutComplete": {
                "order": order_json("o-2", "1002"),
                "errors": []
            }
        })))
        .expect(1)
        .create_async()
        .await;

    let ipn_body = json!({
        "order_ref": "sq-1",
        "event": "approved",
        "checkout": "c-1",
        "transaction": "t-2"
    })
    .to_string();
    let signature = sign_ipn(&ipn_body);

    let response = post_json_with_headers(
        &app,
        "/checkout/pay/sequra/ipn",
        &ipn_body,
        &[("x-sequra-signature", signature.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Re-delivered IPN is acknowledged without completing again.
    let response = post_json_with_headers(
        &app,
        "/checkout/pay/sequra/ipn",
        &ipn_body,
        &[("x-sequra-signature", signature.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("already processed"), "body: {body}");

    m_complete.assert_async().await;

    // --- customer return page shows the order ---
    let m_order = server
        .mock("POST", "/graphql/")
        .match_body(Matcher::Regex("query order".to_owned()))
        .with_status(200)
        .with_body(gql_data(json!({ "order": order_json("o-2", "1002") })))
        .expect(1)
        .create_async()
        .await;

    let response = get(
        &app,
        "/checkout/pay/sequra/return?transaction=t-2",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Order created"), "body: {body}");
    assert!(body.contains("1002"), "body: {body}");

    m_order.assert_async().await;
}

#[tokio::test]
async fn test_sequra_ipn_rejects_bad_and_missing_signatures() {
    let mut server = mockito::Server::new_async().await;
    let (app, _state) = storefront_app(&server.url());

    let catch_all = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let ipn_body = json!({
        "order_ref": "sq-1",
        "event": "approved",
        "checkout": "c-1",
        "transaction": "t-2"
    })
    .to_string();

    // No signature header at all.
    let response = post_json_with_headers(&app, "/checkout/pay/sequra/ipn", &ipn_body, &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Wrong signature.
    let response = post_json_with_headers(
        &app,
        "/checkout/pay/sequra/ipn",
        &ipn_body,
        &[("x-sequra-signature", "0000")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    catch_all.assert_async().await;
}

#[tokio::test]
async fn test_sequra_ipn_ignores_non_approval_events() {
    let mut server = mockito::Server::new_async().await;
    let (app, _state) = storefront_app(&server.url());

    let catch_all = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let ipn_body = json!({
        "order_ref": "sq-1",
        "event": "cancelled",
        "checkout": "c-1",
        "transaction": "t-2"
    })
    .to_string();
    let signature = sign_ipn(&ipn_body);

    let response = post_json_with_headers(
        &app,
        "/checkout/pay/sequra/ipn",
        &ipn_body,
        &[("x-sequra-signature", signature.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    catch_all.assert_async().await;
}
