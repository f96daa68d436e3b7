//! Session token pair issued by the platform's auth endpoints.

use serde::{Deserialize, Serialize};

/// Seconds of clock skew allowed before a token is treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Access/refresh token pair for one signed-in session.
///
/// Owned by the auth client: minted on sign-in, rotated on refresh, and
/// dropped on sign-out. Carried inside the session cookie store, so it
/// serializes as plain strings; it must never be logged.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Bearer token attached to platform requests.
    pub access_token: String,
    /// Token exchanged for a fresh pair when the access token expires.
    pub refresh_token: Option<String>,
    /// Unix timestamp when the access token expires.
    pub access_expires_at: i64,
    /// Unix timestamp when the refresh token expires, if the platform caps it.
    pub refresh_expires_at: Option<i64>,
}

impl TokenPair {
    /// Build a pair from token lifetimes, anchored at `issued_at`.
    #[must_use]
    pub fn from_lifetimes(
        access_token: String,
        refresh_token: Option<String>,
        issued_at: i64,
        expires_in: i64,
        refresh_expires_in: Option<i64>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            access_expires_at: issued_at + expires_in,
            refresh_expires_at: refresh_expires_in.map(|secs| issued_at + secs),
        }
    }

    /// Whether the access token is expired (with a 60 second skew buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(0)
    }

    /// Whether the access token expires within the next `seconds`.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.access_expires_at - EXPIRY_SKEW_SECS - seconds
    }

    /// Whether a usable refresh token is available.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
            && self.refresh_expires_at.is_none_or(|expires_at| {
                let now = chrono::Utc::now().timestamp();
                now < expires_at - EXPIRY_SKEW_SECS
            })
    }
}

// Tokens are credentials; keep them out of Debug output.
impl core::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access_expires_at: i64, refresh: Option<(&str, Option<i64>)>) -> TokenPair {
        TokenPair {
            access_token: "access".to_owned(),
            refresh_token: refresh.map(|(t, _)| t.to_owned()),
            access_expires_at,
            refresh_expires_at: refresh.and_then(|(_, exp)| exp),
        }
    }

    #[test]
    fn test_is_expired() {
        let now = chrono::Utc::now().timestamp();

        assert!(pair(now - 3600, None).is_expired());
        assert!(!pair(now + 3600, None).is_expired());
        // Inside the skew buffer counts as expired.
        assert!(pair(now + 30, None).is_expired());
    }

    #[test]
    fn test_expires_within() {
        let now = chrono::Utc::now().timestamp();
        let token = pair(now + 200, None);

        assert!(token.expires_within(300));
        assert!(!token.expires_within(10));
    }

    #[test]
    fn test_can_refresh() {
        let now = chrono::Utc::now().timestamp();

        assert!(pair(now - 10, Some(("refresh", Some(now + 86400)))).can_refresh());
        assert!(pair(now - 10, Some(("refresh", None))).can_refresh());
        assert!(!pair(now - 10, None).can_refresh());
        assert!(!pair(now - 10, Some(("refresh", Some(now - 1800)))).can_refresh());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let now = chrono::Utc::now().timestamp();
        let token = pair(now, Some(("very-secret", None)));
        let debug = format!("{token:?}");

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("access\""));
    }
}
