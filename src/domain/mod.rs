//! Domain model: HTTP methods, policy records, request/response records.
//!
//! Everything here is pure in-memory data with no I/O. Policy resolution
//! (audit, limiter selection, authentication, permission merging) lives on
//! [`ServicePolicy`]; the processor composes these rules per request.

mod method;
mod policy;
mod process;

pub use method::HttpMethod;
pub use policy::{MethodPolicy, RateLimitBy, RateLimiterSpec, ServicePolicy};
pub use process::{
    Headers, ProcessRequest, ProviderProcessRequest, ProviderProcessResponse, SubjectInformation,
    AUTHORIZATION_HEADER, CONTENT_TYPE_HEADER, FORWARDED_FOR_HEADER,
};
