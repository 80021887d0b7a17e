//! Self-refreshing machine-to-machine token source.
//!
//! One source exists per configured audience. Construction performs a blocking
//! initial fetch and fails if the identity provider is unreachable, so a
//! misconfigured gateway never starts. A background task then refreshes the
//! token ten minutes before expiry, retrying every minute on failure. The
//! current token sits in an atomically swapped slot, so reads on the request
//! hot path take no locks.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::idp::{IdpClient, IssuedToken};
use crate::{Error, Result};

/// Refresh this long before the reported expiry
const REFRESH_MARGIN: Duration = Duration::from_secs(600);
/// Retry interval after a failed refresh
const RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Cached bearer credential for gateway→provider calls.
///
/// `token()` returns the current access token, or an empty string when none
/// is available.
#[derive(Clone)]
pub struct TokenSource {
    current: Arc<ArcSwapOption<IssuedToken>>,
}

impl TokenSource {
    /// Create a source for `audience`, fetching the first token immediately.
    ///
    /// The refresh task stops when `shutdown` fires; `token()` keeps serving
    /// the last cached value afterwards.
    ///
    /// # Errors
    ///
    /// Fails when the initial token fetch fails.
    pub async fn connect(
        idp: Arc<IdpClient>,
        audience: String,
        shutdown: &broadcast::Sender<()>,
    ) -> Result<Self> {
        let initial = idp
            .token(&audience)
            .await
            .map_err(|e| Error::TokenIssuance(format!("initial m2m fetch for {audience}: {e}")))?;

        let mut delay = refresh_delay(initial.expires_in);
        let current = Arc::new(ArcSwapOption::from_pointee(initial));

        let slot = Arc::clone(&current);
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {
                        match idp.token(&audience).await {
                            Ok(token) => {
                                delay = refresh_delay(token.expires_in);
                                debug!(audience = %audience, next_refresh_secs = delay.as_secs(), "m2m token refreshed");
                                slot.store(Some(Arc::new(token)));
                            }
                            Err(e) => {
                                error!(audience = %audience, error = %e, "failed to refresh m2m token");
                                delay = RETRY_INTERVAL;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Ok(Self { current })
    }

    /// Current access token, or empty string when unavailable
    #[must_use]
    pub fn token(&self) -> String {
        self.current
            .load()
            .as_ref()
            .map(|token| token.access_token.clone())
            .unwrap_or_default()
    }
}

/// Time until the next refresh after an issuance reporting `expires_in`
/// seconds of lifetime.
fn refresh_delay(expires_in: u64) -> Duration {
    Duration::from_secs(expires_in).saturating_sub(REFRESH_MARGIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_fires_ten_minutes_before_expiry() {
        assert_eq!(refresh_delay(86_400), Duration::from_secs(85_800));
        assert_eq!(refresh_delay(3_600), Duration::from_secs(3_000));
    }

    #[test]
    fn short_lived_tokens_refresh_immediately() {
        assert_eq!(refresh_delay(600), Duration::ZERO);
        assert_eq!(refresh_delay(0), Duration::ZERO);
    }

    #[test]
    fn retry_interval_is_one_minute() {
        assert_eq!(RETRY_INTERVAL, Duration::from_secs(60));
    }

    #[test]
    fn empty_slot_yields_empty_token() {
        let source = TokenSource {
            current: Arc::new(ArcSwapOption::empty()),
        };
        assert_eq!(source.token(), "");
    }

    #[test]
    fn token_reads_current_slot() {
        let source = TokenSource {
            current: Arc::new(ArcSwapOption::from_pointee(IssuedToken {
                access_token: "abc".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 3_600,
            })),
        };
        assert_eq!(source.token(), "abc");
    }
}
