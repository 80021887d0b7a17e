//! Request processing pipeline.
//!
//! [`Pipeline`] is the gateway entrypoint: parse → route → authenticate →
//! authorize → rate-limit → forward → respond. It never fails; every outcome
//! is a [`ProviderProcessResponse`], with errors encoded as
//! `{"error_msg": "..."}` JSON bodies.
//!
//! Audit records are emitted only for outcomes that reached provider
//! dispatch. Earlier rejections (auth, rate limit) are not audited; expanding
//! audit to cover denials is a candidate for a future security review.

mod metrics;

pub use self::metrics::MetricsProcessor;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::audit::{AuditResult, Auditor, Fields};
use crate::auth::TokenParser;
use crate::domain::{
    Headers, ProcessRequest, ProviderProcessRequest, ProviderProcessResponse, RateLimitBy,
    ServicePolicy, AUTHORIZATION_HEADER, CONTENT_TYPE_HEADER, FORWARDED_FOR_HEADER,
};
use crate::provider::ClientRegistry;
use crate::ratelimit::{Gatekeeper, Key, Limit};
use crate::store::Store;

/// `Retry-After` header set on rate-limited responses
const RETRY_AFTER_HEADER: &str = "retry-after";

/// Synced provider policies keyed by service name
pub type PolicyStore = Store<String, Arc<ServicePolicy>>;

/// The gateway request entrypoint.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Run one request through the pipeline. Never fails; every outcome is a
    /// response with an appropriate status.
    async fn process(&self, request: ProcessRequest) -> ProviderProcessResponse;
}

/// [`Processor`] implementation composing the policy store, client registry,
/// token parser, auditor, and rate-limit gatekeeper.
pub struct Pipeline {
    descriptions: Arc<PolicyStore>,
    clients: Arc<ClientRegistry>,
    token_parser: Arc<dyn TokenParser>,
    auditor: Arc<dyn Auditor>,
    gatekeeper: Arc<dyn Gatekeeper>,
}

impl Pipeline {
    /// Compose a pipeline from its collaborators
    #[must_use]
    pub fn new(
        descriptions: Arc<PolicyStore>,
        clients: Arc<ClientRegistry>,
        token_parser: Arc<dyn TokenParser>,
        auditor: Arc<dyn Auditor>,
        gatekeeper: Arc<dyn Gatekeeper>,
    ) -> Self {
        Self {
            descriptions,
            clients,
            token_parser,
            auditor,
            gatekeeper,
        }
    }
}

#[async_trait]
impl Processor for Pipeline {
    async fn process(&self, request: ProcessRequest) -> ProviderProcessResponse {
        if let Err(e) = request.validate() {
            return error_response(400, &format!("failed to validate process request: {e}"), None);
        }

        // One policy snapshot per request; a sync tick mid-request does not
        // affect resolution below.
        let Some(policy) = self.descriptions.get(&request.service) else {
            return error_response(
                404,
                &format!("description for service {} not found", request.service),
                None,
            );
        };

        let Some(method_policy) = policy.methods.get(&request.api_method) else {
            return error_response(
                404,
                &format!(
                    "description for method {} of service {} not found",
                    request.api_method, request.service
                ),
                None,
            );
        };

        if !method_policy
            .allowed_http_methods
            .contains(&request.http_method)
        {
            return error_response(
                405,
                &format!("http method {} not allowed", request.http_method),
                None,
            );
        }

        let Some(client) = self.clients.get(&request.service) else {
            return error_response(
                404,
                &format!("client for service {} not found", request.service),
                None,
            );
        };

        let need_authentication = policy.need_authentication(&request.api_method);
        let required_permissions = policy.required_permissions(&request.api_method);

        // Parsing is attempted even when auth is optional: the subject feeds
        // subject_id rate limiting and is forwarded to the provider.
        let subject = match self
            .token_parser
            .parse_token(bearer_token(&request.headers))
            .await
        {
            Ok(subject) => Some(subject),
            Err(e) => {
                if need_authentication {
                    return error_response(401, &format!("failed to authenticate: {e}"), None);
                }
                None
            }
        };

        if need_authentication {
            if let Some(subject) = &subject {
                for permission in &required_permissions {
                    if !subject.permissions.contains(permission) {
                        return error_response(
                            403,
                            &format!("subject doesn't have required permission {permission}"),
                            None,
                        );
                    }
                }
            }
        }

        if let Some((limiter, is_service_limiter)) = policy.select_limiter(&request.api_method) {
            let entity = match limiter.by {
                RateLimitBy::Ip => real_ip(&request.remote_addr, &request.headers),
                RateLimitBy::SubjectId => subject
                    .as_ref()
                    .map(|s| s.id.clone())
                    .unwrap_or_default(),
            };

            let key = Key {
                service: request.service.clone(),
                is_service_limiter,
                method: request.api_method.clone(),
                entity,
            };
            let limit = Limit {
                rate: limiter.rate,
                burst: limiter.burst,
                period: limiter.period,
            };

            match self.gatekeeper.allow(&key, &limit).await {
                Ok(decision) if !decision.allowed => {
                    let secs = retry_after_secs(decision.retry_after);
                    debug!(bucket = %key.bucket(), retry_after_secs = secs, "rate limited");

                    let mut headers = Headers::new();
                    headers.set(RETRY_AFTER_HEADER, secs.to_string());
                    return error_response(
                        429,
                        &format!("rate limit exceeded, retry after {secs}s"),
                        Some(headers),
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    return error_response(500, &format!("internal rate limiter error: {e}"), None);
                }
            }
        }

        let mut provider_request = ProviderProcessRequest {
            api_method: request.api_method.clone(),
            http_method: request.http_method,
            path: request.path,
            query: request.query,
            body: request.body,
            headers: request.headers,
            subject: subject.clone(),
        };
        provider_request.preprocess();

        let need_audit = policy.need_audit(&request.api_method);

        match client.process(&provider_request).await {
            Ok(mut response) => {
                response.set_defaults();

                if need_audit {
                    self.auditor.write(Fields {
                        service: request.service,
                        method: request.api_method,
                        subject,
                        result: AuditResult::Ok,
                    });
                }

                response
            }
            Err(e) => {
                if need_audit {
                    self.auditor.write(Fields {
                        service: request.service.clone(),
                        method: request.api_method.clone(),
                        subject,
                        result: AuditResult::Error,
                    });
                }

                error_response(500, &format!("failed to process request: {e}"), None)
            }
        }
    }
}

/// Bearer token from the `Authorization` header, `Bearer ` prefix stripped.
/// Empty string when the header is absent.
fn bearer_token(headers: &Headers) -> &str {
    headers
        .get(AUTHORIZATION_HEADER)
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value))
        .unwrap_or_default()
}

/// Client IP: `X-Forwarded-For` when present (the gateway sits behind a
/// trusted reverse proxy), else the host part of the peer address.
fn real_ip(remote_addr: &str, headers: &Headers) -> String {
    if let Some(forwarded) = headers.get(FORWARDED_FOR_HEADER) {
        return forwarded.to_string();
    }

    remote_addr
        .parse::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

fn retry_after_secs(retry_after: Duration) -> u64 {
    retry_after.as_secs_f64().ceil() as u64
}

/// Build an error response with the standard JSON envelope
fn error_response(
    status_code: u16,
    message: &str,
    headers: Option<Headers>,
) -> ProviderProcessResponse {
    let mut headers = headers.unwrap_or_default();
    headers.set(CONTENT_TYPE_HEADER, "application/json");

    ProviderProcessResponse {
        status_code,
        body: json!({ "error_msg": message }).to_string().into_bytes(),
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_stripped() {
        let mut headers = Headers::new();
        headers.set("Authorization", "Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), "abc.def.ghi");
    }

    #[test]
    fn missing_authorization_yields_empty_token() {
        assert_eq!(bearer_token(&Headers::new()), "");
    }

    #[test]
    fn raw_token_without_prefix_passes_through() {
        let mut headers = Headers::new();
        headers.set("Authorization", "abc.def.ghi");
        assert_eq!(bearer_token(&headers), "abc.def.ghi");
    }

    #[test]
    fn forwarded_for_takes_precedence_over_peer_address() {
        let mut headers = Headers::new();
        headers.set("X-Forwarded-For", "203.0.113.7");
        assert_eq!(real_ip("10.0.0.1:9999", &headers), "203.0.113.7");
    }

    #[test]
    fn peer_address_host_part_is_used_without_forwarded_for() {
        assert_eq!(real_ip("10.0.0.1:9999", &Headers::new()), "10.0.0.1");
        assert_eq!(real_ip("[::1]:9999", &Headers::new()), "::1");
    }

    #[test]
    fn unparsable_peer_address_yields_empty_entity() {
        assert_eq!(real_ip("not-an-address", &Headers::new()), "");
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        assert_eq!(retry_after_secs(Duration::from_millis(100)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(60)), 60);
        assert_eq!(retry_after_secs(Duration::from_millis(60_001)), 61);
        assert_eq!(retry_after_secs(Duration::ZERO), 0);
    }

    #[test]
    fn error_response_carries_json_envelope() {
        let response = error_response(404, "description for service x not found", None);

        assert_eq!(response.status_code, 404);
        assert_eq!(
            response.headers.get("content-type"),
            Some("application/json")
        );

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error_msg"], "description for service x not found");
    }

    #[test]
    fn error_response_keeps_extra_headers() {
        let mut headers = Headers::new();
        headers.set("retry-after", "60");

        let response = error_response(429, "rate limit exceeded", Some(headers));
        assert_eq!(response.headers.get("retry-after"), Some("60"));
        assert_eq!(
            response.headers.get("content-type"),
            Some("application/json")
        );
    }
}
