//! Access-token cache for app login.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Tokens are refreshed this long before they expire.
pub(crate) const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Holds the most recent token until shortly before it expires.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// The cached token, if it is still usable at `now`.
    pub(crate) fn current(&self, now: Instant) -> Option<String> {
        let guard = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|token| now.checked_add(REFRESH_MARGIN).is_some_and(|edge| edge < token.expires_at))
            .map(|token| token.value.clone())
    }

    /// Remember a freshly issued token.
    pub(crate) fn store(&self, value: String, lifetime: Duration, now: Instant) {
        let Some(expires_at) = now.checked_add(lifetime) else {
            return;
        };
        let mut guard = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(CachedToken { value, expires_at });
    }

    /// Forget the cached token.
    pub(crate) fn clear(&self) {
        let mut guard = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}
