//! Structured audit records for request outcomes.
//!
//! Audit is independent of logs and metrics: it records who did what against
//! which service, and whether it succeeded. Emission is fire-and-forget from
//! the processor's perspective and must never cause a request to fail.

use serde::Serialize;
use tracing::warn;

use crate::domain::SubjectInformation;

/// Outcome recorded in an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    /// The provider handled the request
    Ok,
    /// The provider call failed
    Error,
}

impl AuditResult {
    /// Wire name of the result
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Fields written to the audit trail
#[derive(Debug, Clone)]
pub struct Fields {
    /// Service the request targeted
    pub service: String,
    /// API method the request targeted
    pub method: String,
    /// Authenticated subject, when one was established
    pub subject: Option<SubjectInformation>,
    /// Request outcome
    pub result: AuditResult,
}

/// Audit record writer
pub trait Auditor: Send + Sync {
    /// Emit one audit record. Must not fail the request.
    fn write(&self, fields: Fields);
}

/// Default [`Auditor`] writing structured records to the log stream under the
/// `audit` target, queryable by any log aggregator.
#[derive(Debug, Default)]
pub struct LogAuditor;

impl Auditor for LogAuditor {
    fn write(&self, fields: Fields) {
        match &fields.subject {
            Some(subject) => {
                let mut permissions: Vec<&str> =
                    subject.permissions.iter().map(String::as_str).collect();
                permissions.sort_unstable();

                warn!(
                    target: "audit",
                    service = %fields.service,
                    method = %fields.method,
                    result = fields.result.as_str(),
                    subject.id = %subject.id,
                    subject.permissions = ?permissions,
                    "audit for request"
                );
            }
            None => {
                warn!(
                    target: "audit",
                    service = %fields.service,
                    method = %fields.method,
                    result = fields.result.as_str(),
                    "audit for request"
                );
            }
        }
    }
}
