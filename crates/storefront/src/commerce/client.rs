//! Commerce platform client implementation.
//!
//! `CommerceClient::build` is the client factory: every call returns a client
//! with a fresh, empty cache, wired to the authenticated fetch path for the
//! token pair it was given. Expired-token refresh happens inside [`execute`],
//! invisible to callers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use coastline_core::{CheckoutId, OrderId, TokenPair, TransactionId};

use super::types::{
    Checkout, CheckoutLineInput, Customer, Order, TransactionInit, UserError, reject_user_errors,
};
use super::{CommerceError, GraphQLError, queries};

/// Read-cache TTL. Mutations invalidate affected entries immediately.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Refresh the token pair this many seconds before it expires.
const REFRESH_AHEAD_SECS: i64 = 60;

/// GraphQL response envelope: `{data}` or `{errors}`, verbatim.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

/// Cached value types. One cache per client; never shared across clients.
#[derive(Debug, Clone)]
enum CacheValue {
    Checkout(Box<Checkout>),
    Order(Box<Order>),
    Customer(Box<Customer>),
}

/// Client for the commerce platform's GraphQL API.
///
/// Cheap to clone; clones share the same cache and token pair.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    http: reqwest::Client,
    endpoint: String,
    token: RwLock<Option<TokenPair>>,
    cache: Cache<String, CacheValue>,
}

/// Execute one GraphQL request without any token handling.
///
/// Shared by [`CommerceClient::execute`] and the auth operations (which run
/// before a token pair exists).
pub(crate) async fn post_graphql<T: DeserializeOwned>(
    http: &reqwest::Client,
    endpoint: &str,
    bearer: Option<&str>,
    query: &str,
    variables: Option<serde_json::Value>,
) -> Result<T, CommerceError> {
    let body = serde_json::json!({
        "query": query,
        "variables": variables.unwrap_or(serde_json::Value::Null),
    });

    let mut request = http
        .post(endpoint)
        .header("Content-Type", "application/json")
        .json(&body);

    if let Some(token) = bearer {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let response = request.send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(CommerceError::RateLimited(retry_after));
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(CommerceError::TokenExpired);
    }

    let response_text = response.text().await?;

    if !status.is_success() {
        warn!(
            status = %status,
            body = %response_text.chars().take(500).collect::<String>(),
            "platform returned non-success status"
        );
        return Err(CommerceError::GraphQL(vec![GraphQLError {
            message: format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            ),
            locations: vec![],
            path: vec![],
        }]));
    }

    let envelope: GraphQLResponse<T> = serde_json::from_str(&response_text)?;

    if let Some(errors) = envelope.errors
        && !errors.is_empty()
    {
        debug!(errors = ?errors, "GraphQL errors in response");
        return Err(CommerceError::GraphQL(errors));
    }

    envelope.data.ok_or_else(|| {
        CommerceError::GraphQL(vec![GraphQLError {
            message: "No data in response".to_owned(),
            locations: vec![],
            path: vec![],
        }])
    })
}

impl CommerceClient {
    /// Build a client for `endpoint`, optionally bound to a token pair.
    ///
    /// This is the client factory of the storefront: the returned client owns
    /// a brand-new empty cache, so no data from any earlier client can leak
    /// through it.
    #[must_use]
    pub fn build(endpoint: &str, token: Option<TokenPair>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(CommerceClientInner {
                http: reqwest::Client::new(),
                endpoint: endpoint.to_owned(),
                token: RwLock::new(token),
                cache,
            }),
        }
    }

    /// The endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Current token pair, if the client is bound to a signed-in session.
    pub async fn token(&self) -> Option<TokenPair> {
        self.inner.token.read().await.clone()
    }

    /// Execute a GraphQL operation through the authenticated fetch path.
    ///
    /// When the bound access token is within 60 seconds of expiry and a
    /// refresh token is available, the pair is rotated first; callers never
    /// see the refresh happen. Errors are propagated verbatim.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::TokenExpired` when the platform rejects the
    /// token and it cannot be refreshed, `RateLimited` on 429, `GraphQL` for
    /// error arrays, and `Http`/`Parse` for transport failures.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<T, CommerceError> {
        self.refresh_ahead().await;

        let bearer = self
            .inner
            .token
            .read()
            .await
            .as_ref()
            .map(|pair| pair.access_token.clone());

        post_graphql(
            &self.inner.http,
            &self.inner.endpoint,
            bearer.as_deref(),
            query,
            variables,
        )
        .await
    }

    /// Rotate the token pair if it is about to expire.
    async fn refresh_ahead(&self) {
        let refresh_token = {
            let token = self.inner.token.read().await;
            match token.as_ref() {
                Some(pair) if pair.expires_within(REFRESH_AHEAD_SECS) && pair.can_refresh() => {
                    pair.refresh_token.clone()
                }
                _ => None,
            }
        };

        let Some(refresh_token) = refresh_token else {
            return;
        };

        match crate::auth::refresh(&self.inner.http, &self.inner.endpoint, &refresh_token).await {
            Ok(pair) => {
                *self.inner.token.write().await = Some(pair);
                debug!("token pair rotated ahead of expiry");
            }
            Err(e) => {
                // The next request will surface TokenExpired to the caller.
                warn!(error = %e, "token refresh failed");
            }
        }
    }

    // =========================================================================
    // Checkout operations
    // =========================================================================

    /// Fetch a checkout by ID.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the checkout does not exist, or
    /// any error from the request itself.
    #[instrument(skip(self), fields(checkout_id = %id))]
    pub async fn checkout(&self, id: &CheckoutId) -> Result<Checkout, CommerceError> {
        let cache_key = format!("checkout:{id}");

        if let Some(CacheValue::Checkout(checkout)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for checkout");
            return Ok(*checkout);
        }

        #[derive(Deserialize)]
        struct Data {
            checkout: Option<Checkout>,
        }

        let variables = serde_json::json!({ "id": id });
        let data: Data = self.execute(queries::CHECKOUT, Some(variables)).await?;

        let checkout = data
            .checkout
            .ok_or_else(|| CommerceError::NotFound(format!("checkout {id}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Checkout(Box::new(checkout.clone())))
            .await;

        Ok(checkout)
    }

    /// Create a new checkout.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::UserError` when the platform rejects the
    /// input, or any error from the request itself.
    #[instrument(skip(self, lines))]
    pub async fn checkout_create(
        &self,
        email: Option<&str>,
        lines: Vec<CheckoutLineInput>,
    ) -> Result<Checkout, CommerceError> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "checkoutCreate")]
            checkout_create: Payload,
        }

        #[derive(Deserialize)]
        struct Payload {
            checkout: Option<Checkout>,
            #[serde(default)]
            errors: Vec<UserError>,
        }

        let variables = serde_json::json!({ "email": email, "lines": lines });
        let data: Data = self
            .execute(queries::CHECKOUT_CREATE, Some(variables))
            .await?;

        reject_user_errors(data.checkout_create.errors)?;
        data.checkout_create
            .checkout
            .ok_or_else(|| CommerceError::NotFound("checkout not returned".to_owned()))
    }

    /// Add lines to a checkout.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::UserError` when the platform rejects the
    /// lines, or any error from the request itself.
    #[instrument(skip(self, lines), fields(checkout_id = %id))]
    pub async fn checkout_lines_add(
        &self,
        id: &CheckoutId,
        lines: Vec<CheckoutLineInput>,
    ) -> Result<Checkout, CommerceError> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "checkoutLinesAdd")]
            checkout_lines_add: Payload,
        }

        #[derive(Deserialize)]
        struct Payload {
            checkout: Option<Checkout>,
            #[serde(default)]
            errors: Vec<UserError>,
        }

        let variables = serde_json::json!({ "id": id, "lines": lines });
        let data: Data = self
            .execute(queries::CHECKOUT_LINES_ADD, Some(variables))
            .await?;

        reject_user_errors(data.checkout_lines_add.errors)?;
        let checkout = data
            .checkout_lines_add
            .checkout
            .ok_or_else(|| CommerceError::NotFound("checkout not returned".to_owned()))?;

        // Keep the read cache in step with the mutation result.
        self.inner
            .cache
            .insert(
                format!("checkout:{id}"),
                CacheValue::Checkout(Box::new(checkout.clone())),
            )
            .await;

        Ok(checkout)
    }

    /// Initialize a payment transaction against a checkout.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::UserError` when the platform rejects the
    /// gateway or checkout state, or any error from the request itself.
    #[instrument(skip(self), fields(checkout_id = %checkout_id, gateway = %gateway))]
    pub async fn transaction_initialize(
        &self,
        checkout_id: &CheckoutId,
        gateway: &str,
    ) -> Result<TransactionInit, CommerceError> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "transactionInitialize")]
            transaction_initialize: Payload,
        }

        #[derive(Deserialize)]
        struct Payload {
            transaction: Option<TransactionInit>,
            #[serde(default)]
            errors: Vec<UserError>,
        }

        let variables = serde_json::json!({ "checkoutId": checkout_id, "gateway": gateway });
        let data: Data = self
            .execute(queries::TRANSACTION_INITIALIZE, Some(variables))
            .await?;

        reject_user_errors(data.transaction_initialize.errors)?;
        data.transaction_initialize
            .transaction
            .ok_or_else(|| CommerceError::NotFound("transaction not returned".to_owned()))
    }

    /// Complete a checkout into an order.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::UserError` when the platform rejects the
    /// completion, or any error from the request itself.
    #[instrument(skip(self), fields(checkout_id = %checkout_id, transaction_id = %transaction_id))]
    pub async fn checkout_complete(
        &self,
        checkout_id: &CheckoutId,
        transaction_id: &TransactionId,
    ) -> Result<Order, CommerceError> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "checkoutComplete")]
            checkout_complete: Payload,
        }

        #[derive(Deserialize)]
        struct Payload {
            order: Option<Order>,
            #[serde(default)]
            errors: Vec<UserError>,
        }

        let variables =
            serde_json::json!({ "checkoutId": checkout_id, "transactionId": transaction_id });
        let data: Data = self
            .execute(queries::CHECKOUT_COMPLETE, Some(variables))
            .await?;

        reject_user_errors(data.checkout_complete.errors)?;
        let order = data
            .checkout_complete
            .order
            .ok_or_else(|| CommerceError::NotFound("order not returned".to_owned()))?;

        // The checkout is consumed; drop the stale read entry.
        self.inner
            .cache
            .invalidate(&format!("checkout:{checkout_id}"))
            .await;

        Ok(order)
    }

    // =========================================================================
    // Order and customer operations
    // =========================================================================

    /// Fetch an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the order does not exist, or any
    /// error from the request itself.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: &OrderId) -> Result<Order, CommerceError> {
        let cache_key = format!("order:{id}");

        if let Some(CacheValue::Order(order)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for order");
            return Ok(*order);
        }

        #[derive(Deserialize)]
        struct Data {
            order: Option<Order>,
        }

        let variables = serde_json::json!({ "id": id });
        let data: Data = self.execute(queries::ORDER, Some(variables)).await?;

        let order = data
            .order
            .ok_or_else(|| CommerceError::NotFound(format!("order {id}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Order(Box::new(order.clone())))
            .await;

        Ok(order)
    }

    /// Fetch the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` when no customer is bound to the
    /// token, or any error from the request itself.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<Customer, CommerceError> {
        let cache_key = "me".to_owned();

        if let Some(CacheValue::Customer(customer)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for customer");
            return Ok(*customer);
        }

        #[derive(Deserialize)]
        struct Data {
            me: Option<Customer>,
        }

        let data: Data = self.execute(queries::ME, None).await?;
        let customer = data
            .me
            .ok_or_else(|| CommerceError::NotFound("no signed-in customer".to_owned()))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Customer(Box::new(customer.clone())))
            .await;

        Ok(customer)
    }

    /// Fetch the signed-in customer's most recent orders.
    ///
    /// # Errors
    ///
    /// Returns any error from the request itself.
    #[instrument(skip(self))]
    pub async fn my_orders(&self, first: u32) -> Result<Vec<Order>, CommerceError> {
        #[derive(Deserialize)]
        struct Data {
            me: Option<Me>,
        }

        #[derive(Deserialize)]
        struct Me {
            orders: Connection,
        }

        #[derive(Deserialize)]
        struct Connection {
            edges: Vec<Edge>,
        }

        #[derive(Deserialize)]
        struct Edge {
            node: Order,
        }

        let variables = serde_json::json!({ "first": first });
        let data: Data = self.execute(queries::MY_ORDERS, Some(variables)).await?;

        Ok(data
            .me
            .map(|me| me.orders.edges.into_iter().map(|e| e.node).collect())
            .unwrap_or_default())
    }

    // =========================================================================
    // Cache management
    // =========================================================================

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    /// Number of live cache entries.
    pub async fn cached_entries(&self) -> u64 {
        self.inner.cache.run_pending_tasks().await;
        self.inner.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_yields_fresh_cache() {
        let client = CommerceClient::build("http://localhost:0/graphql/", None);
        assert_eq!(client.inner.cache.entry_count(), 0);
        assert_eq!(client.endpoint(), "http://localhost:0/graphql/");
    }

    #[tokio::test]
    async fn test_clients_do_not_share_caches() {
        let a = CommerceClient::build("http://localhost:0/graphql/", None);
        a.inner
            .cache
            .insert(
                "order:o-1".to_owned(),
                CacheValue::Order(Box::new(sample_order())),
            )
            .await;

        let b = CommerceClient::build("http://localhost:0/graphql/", None);
        assert_eq!(a.cached_entries().await, 1);
        assert_eq!(b.cached_entries().await, 0);
    }

    #[tokio::test]
    async fn test_token_accessor() {
        let now = chrono::Utc::now().timestamp();
        let pair = TokenPair::from_lifetimes("access".to_owned(), None, now, 3600, None);
        let client = CommerceClient::build("http://localhost:0/graphql/", Some(pair));

        let held = client.token().await.expect("token bound");
        assert_eq!(held.access_token, "access");

        let anon = CommerceClient::build("http://localhost:0/graphql/", None);
        assert!(anon.token().await.is_none());
    }

    fn sample_order() -> Order {
        use coastline_core::{CurrencyCode, Money, OrderStatus};
        use rust_decimal::Decimal;

        Order {
            id: OrderId::new("o-1"),
            number: "1001".to_owned(),
            status: OrderStatus::Unfulfilled,
            total: Money::new(Decimal::new(1000, 2), CurrencyCode::USD),
            created_at: chrono::Utc::now(),
        }
    }
}
