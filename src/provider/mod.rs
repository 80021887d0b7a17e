//! Provider clients — the gateway's view of backend services.
//!
//! Every provider exposes two operations: `description`, which returns the
//! policy it declares for itself, and `process`, which handles a forwarded
//! request. The registry mapping service names to clients is populated once
//! at boot from configuration and never mutated afterwards.

mod http;
pub mod wire;

pub use self::http::HttpProviderClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ProviderProcessRequest, ProviderProcessResponse, ServicePolicy};
use crate::store::Store;
use crate::Result;

/// Client capability for one provider service.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Fetch the policy the provider declares for itself.
    async fn description(&self) -> Result<ServicePolicy>;

    /// Dispatch a request to the provider.
    async fn process(&self, request: &ProviderProcessRequest) -> Result<ProviderProcessResponse>;
}

/// Name → client mapping, immutable after boot
pub type ClientRegistry = Store<String, Arc<dyn ProviderClient>>;
