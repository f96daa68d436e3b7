//! Auth-change synchronization.
//!
//! Keeps each session's commerce client consistent with its authentication
//! state. The contract is an explicit finite-state notification: two states,
//! and a fixed list of actions per transition. At most one client is active
//! per session at any time, and a client's cache never outlives the identity
//! it was built for.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use coastline_core::{CheckoutId, TokenPair};

use crate::commerce::CommerceClient;

/// Authentication state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn,
}

/// Action taken on a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Discard the session's client and substitute a newly built one with a
    /// fresh, empty cache.
    RebuildClient,
    /// Re-execute the session's mounted queries against the current client
    /// so views reflect the current identity.
    RefetchAll,
}

/// The transition table.
///
/// Rebuild always precedes refetch, so a refetch can only ever warm the new
/// identity's cache. Same-state transitions are no-ops, which makes repeated
/// sign-in/sign-out notifications idempotent.
#[must_use]
pub const fn transition(from: AuthState, to: AuthState) -> &'static [SyncAction] {
    match (from, to) {
        (AuthState::SignedOut, AuthState::SignedIn) => {
            &[SyncAction::RebuildClient, SyncAction::RefetchAll]
        }
        (AuthState::SignedIn, AuthState::SignedOut) => &[SyncAction::RebuildClient],
        _ => &[],
    }
}

/// A query a session's views currently depend on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MountedQuery {
    Checkout(CheckoutId),
    CurrentCustomer,
    OrderHistory,
}

struct SessionEntry {
    state: AuthState,
    client: CommerceClient,
    mounted: HashSet<MountedQuery>,
}

/// Registry of per-session commerce clients.
///
/// Sessions are keyed by an opaque cookie-stored key. Every session holds
/// exactly one client; transitions swap it out according to [`transition`].
#[derive(Clone)]
pub struct SessionClients {
    inner: Arc<SessionClientsInner>,
}

struct SessionClientsInner {
    endpoint: String,
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionClients {
    /// Create a registry for sessions against `endpoint`.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            inner: Arc::new(SessionClientsInner {
                endpoint: endpoint.to_owned(),
                entries: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The session's current client, creating a signed-out one on first use.
    pub async fn client(&self, session_key: &str) -> CommerceClient {
        let mut entries = self.inner.entries.write().await;
        entries
            .entry(session_key.to_owned())
            .or_insert_with(|| SessionEntry {
                state: AuthState::SignedOut,
                client: CommerceClient::build(&self.inner.endpoint, None),
                mounted: HashSet::new(),
            })
            .client
            .clone()
    }

    /// The session's current auth state.
    pub async fn state(&self, session_key: &str) -> AuthState {
        self.inner
            .entries
            .read()
            .await
            .get(session_key)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// Record that a view of this session depends on `query`.
    pub async fn mark_mounted(&self, session_key: &str, query: MountedQuery) {
        let mut entries = self.inner.entries.write().await;
        if let Some(entry) = entries.get_mut(session_key) {
            entry.mounted.insert(query);
        }
    }

    /// Apply an auth-state transition for one session.
    ///
    /// Executes the actions from [`transition`] in order and returns them.
    /// `token` is the pair bound to the rebuilt client; it must be `Some`
    /// when transitioning to [`AuthState::SignedIn`] and `None` otherwise.
    #[instrument(skip(self, token), fields(session = %session_key, to = ?to))]
    pub async fn apply(
        &self,
        session_key: &str,
        to: AuthState,
        token: Option<TokenPair>,
    ) -> &'static [SyncAction] {
        let (actions, refetch) = {
            let mut entries = self.inner.entries.write().await;
            let entry = entries
                .entry(session_key.to_owned())
                .or_insert_with(|| SessionEntry {
                    state: AuthState::SignedOut,
                    client: CommerceClient::build(&self.inner.endpoint, None),
                    mounted: HashSet::new(),
                });

            let actions = transition(entry.state, to);
            let mut refetch = None;

            for action in actions {
                match action {
                    SyncAction::RebuildClient => {
                        debug!("rebuilding session client");
                        entry.client = CommerceClient::build(&self.inner.endpoint, token.clone());
                    }
                    SyncAction::RefetchAll => {
                        refetch = Some((
                            entry.client.clone(),
                            entry.mounted.iter().cloned().collect::<Vec<_>>(),
                        ));
                    }
                }
            }

            entry.state = to;
            if to == AuthState::SignedOut {
                // The signed-out views re-register what they still need.
                entry.mounted.clear();
            }

            (actions, refetch)
        };

        if let Some((client, queries)) = refetch {
            refetch_all(&client, &queries).await;
        }

        actions
    }

    /// Drop a session's client entirely (session destroyed).
    pub async fn forget(&self, session_key: &str) {
        self.inner.entries.write().await.remove(session_key);
    }
}

/// Re-execute mounted queries to warm the (new) client's cache.
///
/// Failures are logged and skipped: the next page render will surface them
/// to the user through the normal error path.
async fn refetch_all(client: &CommerceClient, queries: &[MountedQuery]) {
    for query in queries {
        let result = match query {
            MountedQuery::Checkout(id) => client.checkout(id).await.map(|_| ()),
            MountedQuery::CurrentCustomer => client.me().await.map(|_| ()),
            MountedQuery::OrderHistory => client.my_orders(10).await.map(|_| ()),
        };

        if let Err(e) = result {
            warn!(query = ?query, error = %e, "refetch after sign-in failed");
        }
    }
}
