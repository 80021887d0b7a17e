//! Provider-declared policy records and resolution rules.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::HttpMethod;

/// Attribute of the request that partitions a rate-limit bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateLimitBy {
    /// Partition by client IP address
    #[default]
    Ip,
    /// Partition by authenticated subject id
    SubjectId,
}

impl RateLimitBy {
    /// Lowercase wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::SubjectId => "subject_id",
        }
    }
}

impl Serialize for RateLimitBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RateLimitBy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        // Unknown values fall back to the default partition attribute so
        // description construction stays total.
        Ok(match name.as_str() {
            "subject_id" => Self::SubjectId,
            _ => Self::Ip,
        })
    }
}

/// Token-bucket rate limit declared by a provider.
///
/// `rate` requests are allowed per `period`, with `burst` permitted
/// instantaneous excess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterSpec {
    /// Bucket partition attribute
    pub by: RateLimitBy,
    /// Tokens refilled per `period`
    pub rate: u64,
    /// Maximum bucket capacity
    pub burst: u64,
    /// Refill period
    pub period: Duration,
}

/// Per-method policy within a [`ServicePolicy`]
#[derive(Debug, Clone, Default)]
pub struct MethodPolicy {
    /// Method name
    pub method: String,
    /// Whether requests to this method are audited
    pub audit_enabled: bool,
    /// Method-level rate limit; overrides the service-level one when present
    pub limiter: Option<RateLimiterSpec>,
    /// Whether this method requires an authenticated subject
    pub auth_required: bool,
    /// Permissions the subject must hold to call this method
    pub required_permissions: Vec<String>,
    /// HTTP methods this API method accepts
    pub allowed_http_methods: HashSet<HttpMethod>,
}

/// Policy a provider declares for itself via its description endpoint.
///
/// Entries are replaced wholesale on every sync tick; a request reads one
/// snapshot at routing time and threads it through the rest of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ServicePolicy {
    /// Whether every request to this service is audited
    pub audit_enabled: bool,
    /// Service-level rate limit, used when a method declares none
    pub limiter: Option<RateLimiterSpec>,
    /// Whether every method of this service requires authentication
    pub auth_required: bool,
    /// Permissions required for every method of this service
    pub required_permissions: Vec<String>,
    /// Per-method policies keyed by method name
    pub methods: HashMap<String, MethodPolicy>,
}

impl ServicePolicy {
    /// Whether a request to `method` must emit an audit record.
    /// The service-level flag short-circuits.
    #[must_use]
    pub fn need_audit(&self, method: &str) -> bool {
        if self.audit_enabled {
            return true;
        }

        self.methods.get(method).is_some_and(|m| m.audit_enabled)
    }

    /// Select the limiter governing `method`.
    ///
    /// Returns the method-level limiter when declared, else the service-level
    /// one. The boolean records which level was chosen; it participates in the
    /// rate-limit key so the two levels partition independently.
    #[must_use]
    pub fn select_limiter(&self, method: &str) -> Option<(&RateLimiterSpec, bool)> {
        if let Some(limiter) = self.methods.get(method).and_then(|m| m.limiter.as_ref()) {
            return Some((limiter, false));
        }

        self.limiter.as_ref().map(|limiter| (limiter, true))
    }

    /// Whether a request to `method` must carry a valid bearer token.
    ///
    /// Forced true whenever the method requires permissions, even if neither
    /// level declares the authentication flag.
    #[must_use]
    pub fn need_authentication(&self, method: &str) -> bool {
        if self.auth_required {
            return true;
        }

        if self.methods.get(method).is_some_and(|m| m.auth_required) {
            return true;
        }

        !self.required_permissions.is_empty()
            || self
                .methods
                .get(method)
                .is_some_and(|m| !m.required_permissions.is_empty())
    }

    /// Union of service-level and method-level permissions, deduplicated.
    /// Order is not significant.
    #[must_use]
    pub fn required_permissions(&self, method: &str) -> Vec<String> {
        let method_permissions = self
            .methods
            .get(method)
            .map(|m| m.required_permissions.as_slice())
            .unwrap_or_default();

        let mut seen = HashSet::new();
        self.required_permissions
            .iter()
            .chain(method_permissions)
            .filter(|p| seen.insert(p.as_str()))
            .cloned()
            .collect()
    }
}
