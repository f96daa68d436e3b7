//! Sign-in and sign-out route handlers.
//!
//! These are the only places auth-state transitions originate: a successful
//! sign-in applies `SignedIn` to the session's client registry entry, a
//! sign-out applies `SignedOut`. The registry does the cache work.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use coastline_core::{Email, TokenPair};

use crate::auth::AuthState;
use crate::error::{AppError, Result};
use crate::models::{CurrentCustomer, session_keys};
use crate::state::AppState;

/// Sign-in page query parameters.
#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

/// Sign-in form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

/// Display the sign-in page.
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> LoginTemplate {
    let error = query.error.map(|code| match code.as_str() {
        "credentials" => "Invalid email or password.".to_owned(),
        _ => "Sign-in failed, please try again.".to_owned(),
    });

    LoginTemplate { error }
}

/// Sign in with email and password.
///
/// On success the token pair and customer identity land in the session, and
/// the client registry transitions this session to `SignedIn`.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let password = SecretString::from(form.password);

    let (pair, customer) = match state.auth().sign_in(&form.email, &password).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "sign-in rejected");
            return Ok(Redirect::to("/auth/login?error=credentials").into_response());
        }
    };

    let email = Email::parse(&customer.email)
        .map_err(|e| AppError::Internal(format!("platform returned bad email: {e}")))?;
    let current = CurrentCustomer {
        id: customer.id,
        email,
    };

    session
        .insert(session_keys::TOKEN_PAIR, &pair)
        .await
        .map_err(|e| AppError::Internal(format!("session store: {e}")))?;
    session
        .insert(session_keys::CURRENT_CUSTOMER, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session store: {e}")))?;

    // Notify the registry: rebuild the client, then refetch mounted queries.
    // A sign-in on top of an existing identity passes through SignedOut
    // first so the old client can never survive the identity change.
    let key = super::client_key(&session).await?;
    if state.sessions().state(&key).await == AuthState::SignedIn {
        state.sessions().apply(&key, AuthState::SignedOut, None).await;
    }
    state
        .sessions()
        .apply(&key, AuthState::SignedIn, Some(pair))
        .await;

    tracing::info!("customer signed in");

    Ok(Redirect::to("/account/orders").into_response())
}

/// Sign out.
///
/// The remote deactivation is best-effort; the local session and client are
/// torn down regardless so no cached data survives the identity.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response> {
    let pair: Option<TokenPair> = session
        .get(session_keys::TOKEN_PAIR)
        .await
        .ok()
        .flatten();

    if let Some(pair) = pair
        && let Err(e) = state.auth().sign_out(&pair).await
    {
        tracing::warn!(error = %e, "remote token deactivation failed");
    }

    let _ = session
        .remove::<TokenPair>(session_keys::TOKEN_PAIR)
        .await;
    let _ = session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await;

    // Notify the registry: replace the client so the cache dies with the
    // session's signed-in identity.
    let key = super::client_key(&session).await?;
    state.sessions().apply(&key, AuthState::SignedOut, None).await;

    tracing::info!("customer signed out");

    Ok(Redirect::to("/").into_response())
}
