//! Rate-limit key/policy model and the gatekeeper contract.
//!
//! The string form of [`Key`] is the wire contract with the external limiter
//! backend and must stay stable across versions.

mod redis;

pub use self::redis::RedisGatekeeper;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Identifies one rate-limit bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Service the request targets
    pub service: String,
    /// Whether the service-level limiter was selected; service-level and
    /// method-level limits partition independently
    pub is_service_limiter: bool,
    /// API method the request targets
    pub method: String,
    /// Partition value: client IP or subject id
    pub entity: String,
}

impl Key {
    /// Stable wire form of the key.
    ///
    /// `lim_<service>:<entity>` for service-level limiters,
    /// `lim_<service>:<method>:<entity>` for method-level ones.
    #[must_use]
    pub fn bucket(&self) -> String {
        if self.is_service_limiter {
            format!("lim_{}:{}", self.service, self.entity)
        } else {
            format!("lim_{}:{}:{}", self.service, self.method, self.entity)
        }
    }
}

/// Token-bucket parameters passed per call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limit {
    /// Tokens refilled per `period`
    pub rate: u64,
    /// Maximum bucket capacity
    pub burst: u64,
    /// Refill period
    pub period: Duration,
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Time until the next token is available; zero when allowed
    pub retry_after: Duration,
}

/// Token-bucket admission check against shared state.
///
/// A transport failure is an error; the processor maps it to a 5xx.
#[async_trait]
pub trait Gatekeeper: Send + Sync {
    /// Attempt to consume one token from the bucket identified by `key`.
    async fn allow(&self, key: &Key, limit: &Limit) -> Result<Decision>;
}
