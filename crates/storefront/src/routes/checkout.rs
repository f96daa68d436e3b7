//! Checkout route handlers.
//!
//! The active checkout's platform ID is threaded between page loads through
//! the session cookie; the checkout itself always comes from the platform.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use coastline_core::CheckoutId;

use crate::auth::MountedQuery;
use crate::commerce::types::{Checkout, CheckoutLineInput};
use crate::error::{AppError, Result};
use crate::models::session_keys;
use crate::state::AppState;

/// Checkout line display data for templates.
#[derive(Clone)]
pub struct LineView {
    pub title: String,
    pub quantity: u32,
    pub unit_price: String,
    pub total_price: String,
}

/// Checkout display data for templates.
#[derive(Clone)]
pub struct CheckoutView {
    pub lines: Vec<LineView>,
    pub subtotal: String,
    pub total: String,
    pub quantity: u32,
}

impl CheckoutView {
    /// An empty checkout.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            subtotal: "$0.00".to_owned(),
            total: "$0.00".to_owned(),
            quantity: 0,
        }
    }
}

impl From<&Checkout> for CheckoutView {
    fn from(checkout: &Checkout) -> Self {
        Self {
            lines: checkout
                .lines
                .iter()
                .map(|line| LineView {
                    title: line.title.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price.to_string(),
                    total_price: line.total_price.to_string(),
                })
                .collect(),
            subtotal: checkout.subtotal.to_string(),
            total: checkout.total.to_string(),
            quantity: checkout.quantity(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the checkout ID from the session.
pub(crate) async fn get_checkout_id(session: &Session) -> Option<CheckoutId> {
    session
        .get::<CheckoutId>(session_keys::CHECKOUT_ID)
        .await
        .ok()
        .flatten()
}

/// Set the checkout ID in the session.
async fn set_checkout_id(session: &Session, id: &CheckoutId) -> Result<()> {
    session
        .insert(session_keys::CHECKOUT_ID, id)
        .await
        .map_err(|e| AppError::Internal(format!("session store: {e}")))
}

/// Add line form data.
#[derive(Debug, Deserialize)]
pub struct AddLineForm {
    pub variant_id: String,
    pub quantity: Option<u32>,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutShowTemplate {
    pub checkout: CheckoutView,
    pub has_checkout: bool,
}

/// Display the checkout page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CheckoutShowTemplate> {
    let Some(checkout_id) = get_checkout_id(&session).await else {
        return Ok(CheckoutShowTemplate {
            checkout: CheckoutView::empty(),
            has_checkout: false,
        });
    };

    let client = super::session_client(&state, &session).await?;
    let key = super::client_key(&session).await?;

    let checkout = match client.checkout(&checkout_id).await {
        Ok(checkout) => {
            state
                .sessions()
                .mark_mounted(&key, MountedQuery::Checkout(checkout_id))
                .await;
            CheckoutView::from(&checkout)
        }
        Err(e) => {
            tracing::warn!("failed to fetch checkout {checkout_id}: {e}");
            CheckoutView::empty()
        }
    };

    Ok(CheckoutShowTemplate {
        checkout,
        has_checkout: true,
    })
}

/// Add a line to the checkout, creating the checkout if needed.
#[instrument(skip(state, session))]
pub async fn add_line(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddLineForm>,
) -> Result<Response> {
    let line = CheckoutLineInput {
        variant_id: form.variant_id,
        quantity: form.quantity.unwrap_or(1),
    };

    let client = super::session_client(&state, &session).await?;

    let checkout = match get_checkout_id(&session).await {
        Some(checkout_id) => client.checkout_lines_add(&checkout_id, vec![line]).await?,
        None => client.checkout_create(None, vec![line]).await?,
    };

    set_checkout_id(&session, &checkout.id).await?;

    Ok(Redirect::to("/checkout").into_response())
}
