//! Home page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;

use crate::error::Result;
use crate::models::{CurrentCustomer, session_keys};
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub customer_email: Option<String>,
}

/// Display the home page.
pub async fn home(State(_state): State<AppState>, session: Session) -> Result<HomeTemplate> {
    let customer: Option<CurrentCustomer> = session
        .get(session_keys::CURRENT_CUSTOMER)
        .await
        .ok()
        .flatten();

    Ok(HomeTemplate {
        customer_email: customer.map(|c| c.email.into_inner()),
    })
}
