//! Order route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tower_sessions::Session;
use tracing::instrument;

use coastline_core::OrderId;

use crate::auth::MountedQuery;
use crate::commerce::types::Order;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub number: String,
    pub total: String,
    pub status: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            number: order.number.clone(),
            total: order.total.to_string(),
            status: format!("{:?}", order.status),
        }
    }
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/confirmed.html")]
pub struct OrderConfirmedTemplate {
    pub order: OrderView,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/history.html")]
pub struct OrderHistoryTemplate {
    pub email: String,
    pub orders: Vec<OrderView>,
}

/// Display the confirmation page for an order.
#[instrument(skip(state, session))]
pub async fn confirmed(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<OrderConfirmedTemplate> {
    let client = super::session_client(&state, &session).await?;
    let order = client.order(&OrderId::new(id)).await?;

    Ok(OrderConfirmedTemplate {
        order: OrderView::from(&order),
    })
}

/// Display the signed-in customer's order history.
#[instrument(skip(state, session, customer))]
pub async fn history(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
) -> Result<OrderHistoryTemplate> {
    let client = super::session_client(&state, &session).await?;
    let key = super::client_key(&session).await?;

    let orders = client.my_orders(10).await?;

    // These views now depend on identity-scoped data; a later sign-in must
    // refetch them.
    state
        .sessions()
        .mark_mounted(&key, MountedQuery::OrderHistory)
        .await;
    state
        .sessions()
        .mark_mounted(&key, MountedQuery::CurrentCustomer)
        .await;

    Ok(OrderHistoryTemplate {
        email: customer.email.into_inner(),
        orders: orders.iter().map(OrderView::from).collect(),
    })
}
