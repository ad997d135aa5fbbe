use chrono::{DateTime, TimeDelta, Utc};

use crate::protocol::TokenGrant;

/// A lease is refreshed once it is this close to expiry.
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// One authenticated session. Never mutated; a refresh or re-login builds a
/// new lease and the client swaps it in whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLease {
    access_token: String,
    refresh_token: String,
    expire_at: DateTime<Utc>,
    uid: String,
}

impl TokenLease {
    /// `expire_time` is the lifetime in seconds. A negative lifetime expires
    /// at `now`; one past the calendar range saturates at the latest
    /// representable instant.
    pub(crate) fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let expire_at = TimeDelta::try_seconds(grant.expire_time.max(0))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expire_at,
            uid: grant.uid,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn expire_at(&self) -> DateTime<Utc> {
        self.expire_at
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        let margin = TimeDelta::seconds(REFRESH_MARGIN_SECS);
        self.expire_at
            .checked_sub_signed(margin)
            .is_none_or(|refresh_at| now > refresh_at)
    }
}
