//! Payment redirect flows.
//!
//! Both flows sequence three remote calls across page loads: initialize a
//! transaction on the platform, redirect to the provider's hosted page, and
//! process the provider's return callback. All flow state travels in the
//! session cookie and the callback's query parameters; nothing survives
//! in-process between the pages.
//!
//! Failure semantics are deliberate and blunt: a missing parameter or a
//! remote error renders one error view and stops. There is no retry and no
//! compensation. Duplicate callbacks are absorbed by the replay guard.

pub mod klarna;
pub mod sequra;

use askama::Template;
use askama_web::WebTemplate;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Payment error page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/error.html")]
pub struct PaymentErrorTemplate {
    pub message: String,
}

/// Payment cancelled page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/cancelled.html")]
pub struct PaymentCancelledTemplate;

/// Payment pending page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/pending.html")]
pub struct PaymentPendingTemplate;

/// Render the single error view that aborts a flow.
pub(crate) fn error_view(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        PaymentErrorTemplate {
            message: message.into(),
        },
    )
        .into_response()
}
