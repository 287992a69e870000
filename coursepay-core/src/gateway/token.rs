use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-wide cache for the gateway's OAuth bearer token.
///
/// Expiry is tracked with `tokio::time::Instant`, so tests drive it with
/// paused time. A token is only handed out while `now < expires_at`; the
/// safety margin is subtracted when the token is stored.
#[derive(Debug)]
pub struct TokenCache {
    margin: Duration,
    slot: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl TokenCache {
    pub fn new(margin: Duration) -> Self {
        Self {
            margin,
            slot: Mutex::new(None),
        }
    }

    /// The cached token, unless it has expired.
    pub async fn get(&self) -> Option<String> {
        let slot = self.slot.lock().await;
        slot.as_ref()
            .filter(|cached| Instant::now() < cached.expires_at)
            .map(|cached| cached.token.clone())
    }

    /// Cache a token that the gateway says lives for `expires_in`.
    ///
    /// A lifetime shorter than the margin yields an entry that is already
    /// stale for the next caller.
    pub async fn store(&self, token: String, expires_in: Duration) {
        let expires_at = Instant::now() + expires_in.saturating_sub(self.margin);
        *self.slot.lock().await = Some(CachedToken { token, expires_at });
    }

    /// Drop the cached token so the next caller refreshes.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}
