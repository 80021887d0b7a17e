//! Wire schema of the provider RPC channel and domain conversion.
//!
//! Bodies travel base64-encoded inside JSON. Description construction is
//! total: every missing field defaults to its zero semantics (no limiter →
//! no limit, no methods → every method unknown).

use std::collections::HashMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Headers, HttpMethod, MethodPolicy, ProviderProcessRequest, ProviderProcessResponse,
    RateLimitBy, RateLimiterSpec, ServicePolicy, SubjectInformation,
};
use crate::{Error, Result};

/// Rate limiter declaration on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterWire {
    /// Bucket partition attribute
    #[serde(default)]
    pub by: RateLimitBy,
    /// Tokens per period
    pub rate: u64,
    /// Bucket capacity
    pub burst: u64,
    /// Refill period in milliseconds
    pub period_ms: u64,
}

impl From<LimiterWire> for RateLimiterSpec {
    fn from(wire: LimiterWire) -> Self {
        Self {
            by: wire.by,
            rate: wire.rate,
            burst: wire.burst,
            period: Duration::from_millis(wire.period_ms),
        }
    }
}

/// Per-method policy declaration on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodWire {
    /// Method name
    pub method: String,
    /// Audit flag
    pub audit_enabled: bool,
    /// Method-level rate limiter
    pub rate_limiter: Option<LimiterWire>,
    /// Authentication flag
    pub required_authentication: bool,
    /// Permissions required for this method
    pub required_permissions: Vec<String>,
    /// Accepted HTTP methods
    pub allowed_http_methods: Vec<HttpMethod>,
}

impl From<MethodWire> for MethodPolicy {
    fn from(wire: MethodWire) -> Self {
        Self {
            method: wire.method,
            audit_enabled: wire.audit_enabled,
            limiter: wire.rate_limiter.map(Into::into),
            auth_required: wire.required_authentication,
            required_permissions: wire.required_permissions,
            allowed_http_methods: wire.allowed_http_methods.into_iter().collect(),
        }
    }
}

/// Response of the provider `description` operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptionWire {
    /// Service-level audit flag
    pub audit_enabled: bool,
    /// Service-level rate limiter
    pub rate_limiter: Option<LimiterWire>,
    /// Service-level authentication flag
    pub required_authentication: bool,
    /// Service-level required permissions
    pub required_permissions: Vec<String>,
    /// Per-method declarations
    pub methods: Vec<MethodWire>,
}

impl From<DescriptionWire> for ServicePolicy {
    fn from(wire: DescriptionWire) -> Self {
        let methods: HashMap<String, MethodPolicy> = wire
            .methods
            .into_iter()
            .map(|m| (m.method.clone(), MethodPolicy::from(m)))
            .collect();

        Self {
            audit_enabled: wire.audit_enabled,
            limiter: wire.rate_limiter.map(Into::into),
            auth_required: wire.required_authentication,
            required_permissions: wire.required_permissions,
            methods,
        }
    }
}

/// Subject identity on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectWire {
    /// Subject id
    pub id: String,
    /// Granted permissions
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl From<&SubjectInformation> for SubjectWire {
    fn from(subject: &SubjectInformation) -> Self {
        Self {
            id: subject.id.clone(),
            permissions: subject.permissions.iter().cloned().collect(),
        }
    }
}

/// Request of the provider `process` operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequestWire {
    /// API method name
    pub api_method: String,
    /// HTTP method of the original request
    pub http_method: HttpMethod,
    /// Path remainder
    pub path: String,
    /// Raw query string
    pub query: String,
    /// Base64-encoded body
    pub body: String,
    /// Forwarded headers
    pub headers: Headers,
    /// Authenticated subject
    pub subject: Option<SubjectWire>,
}

impl From<&ProviderProcessRequest> for ProcessRequestWire {
    fn from(request: &ProviderProcessRequest) -> Self {
        Self {
            api_method: request.api_method.clone(),
            http_method: request.http_method,
            path: request.path.clone(),
            query: request.query.clone(),
            body: BASE64.encode(&request.body),
            headers: request.headers.clone(),
            subject: request.subject.as_ref().map(Into::into),
        }
    }
}

/// Response of the provider `process` operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessResponseWire {
    /// HTTP status code
    pub status_code: u16,
    /// Base64-encoded body
    #[serde(default)]
    pub body: String,
    /// Response headers
    #[serde(default)]
    pub headers: Headers,
}

impl ProcessResponseWire {
    /// Decode into the domain response.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not valid base64.
    pub fn into_domain(self) -> Result<ProviderProcessResponse> {
        let body = BASE64
            .decode(&self.body)
            .map_err(|e| Error::Provider(format!("undecodable response body: {e}")))?;

        Ok(ProviderProcessResponse {
            status_code: self.status_code,
            body,
            headers: self.headers,
        })
    }
}
