//! JSON-over-HTTP provider client.
//!
//! Both operations POST to `{address}/rpc/{operation}` with a JSON body and
//! carry the current M2M token in the `x-m2m-token` header when a token
//! source is configured. The per-client operation timeout applies to every
//! call, independently of caller deadlines.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::domain::{ProviderProcessRequest, ProviderProcessResponse, ServicePolicy};
use crate::m2m::TokenSource;
use crate::{Error, Result};

use super::wire::{DescriptionWire, ProcessRequestWire, ProcessResponseWire};
use super::ProviderClient;

/// Metadata header carrying the gateway's M2M token
pub const M2M_TOKEN_HEADER: &str = "x-m2m-token";

/// [`ProviderClient`] over HTTP
pub struct HttpProviderClient {
    name: String,
    base_url: String,
    http: reqwest::Client,
    m2m: Option<TokenSource>,
}

impl HttpProviderClient {
    /// Create a client for the provider at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying HTTP client cannot be built.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        m2m: Option<TokenSource>,
        operation_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(operation_timeout)
            .build()?;

        Ok(Self {
            name: name.into(),
            base_url: address.into().trim_end_matches('/').to_string(),
            http,
            m2m,
        })
    }

    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(format!("{}/rpc/{operation}", self.base_url))
            .json(body);

        if let Some(m2m) = &self.m2m {
            request = request.header(M2M_TOKEN_HEADER, m2m.token());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Provider(format!("{} {operation}: {e}", self.name)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Provider(format!(
                "{} {operation}: unexpected status {status}",
                self.name
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("{} {operation}: {e}", self.name)))
    }
}

#[async_trait::async_trait]
impl ProviderClient for HttpProviderClient {
    async fn description(&self) -> Result<ServicePolicy> {
        let wire: DescriptionWire = self.call("description", &json!({})).await?;
        Ok(wire.into())
    }

    async fn process(&self, request: &ProviderProcessRequest) -> Result<ProviderProcessResponse> {
        let wire: ProcessResponseWire = self
            .call("process", &ProcessRequestWire::from(request))
            .await?;
        wire.into_domain()
    }
}
