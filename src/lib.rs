//! Policy Gateway Library
//!
//! Authenticating API gateway that terminates HTTP requests, validates bearer
//! tokens against an OAuth/OIDC identity provider, enforces backend-declared
//! policy, and dispatches to provider services over an internal RPC channel.
//!
//! # Features
//!
//! - **Data-driven policy**: providers declare audit, auth, permission, and
//!   rate-limit rules via a description endpoint that is synced periodically
//! - **M2M credentials**: self-refreshing client-credentials tokens attached
//!   to every gateway→provider call
//! - **Distributed rate limiting**: token-bucket decisions via Redis, correct
//!   across gateway replicas
//! - **Production Ready**: Prometheus metrics, structured audit log, graceful
//!   shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod auth;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod idp;
pub mod m2m;
pub mod processor;
pub mod provider;
pub mod ratelimit;
pub mod server;
pub mod store;
pub mod sync;

pub use error::{Error, Result};

use cli::LogFormat;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `level` seeds the filter when `RUST_LOG` is unset. JSON output flattens
/// event fields into the top-level object so the audit records emitted under
/// the `audit` target stay queryable by field name.
pub fn setup_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true))
            .init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).init(),
    }
}
