//! Request and response records crossing the gateway boundary.

use std::collections::{hash_map, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

use super::HttpMethod;

/// `Authorization` header; stripped before a request is forwarded
pub const AUTHORIZATION_HEADER: &str = "authorization";
/// `Content-Type` header
pub const CONTENT_TYPE_HEADER: &str = "content-type";
/// `X-Forwarded-For` header; trusted as the real client IP when present
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Case-insensitive multi-valued header map.
///
/// Names are normalized to lowercase on insertion, matching the wire form
/// providers see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(HashMap<String, Vec<String>>);

impl Headers {
    /// Empty header map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name`
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Replace all values under `name` with a single value
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// First value under `name`, if any
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Whether any value exists under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove all values under `name`
    pub fn remove(&mut self, name: &str) {
        self.0.remove(&name.to_ascii_lowercase());
    }

    /// Iterate over `(name, values)` pairs
    pub fn iter(&self) -> hash_map::Iter<'_, String, Vec<String>> {
        self.0.iter()
    }

    /// Number of distinct header names
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map holds no headers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = hash_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Identity extracted from a validated bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectInformation {
    /// Subject id (`sub` claim); never empty
    pub id: String,
    /// Permissions granted to the subject
    pub permissions: HashSet<String>,
}

impl SubjectInformation {
    /// Reject subjects with an empty id
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidToken("subject id is empty".to_string()));
        }

        Ok(())
    }
}

/// Inbound request at the front-end boundary
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    /// Target service name
    pub service: String,
    /// HTTP method of the inbound request
    pub http_method: HttpMethod,
    /// Target API method name
    pub api_method: String,
    /// Path remainder after `/{service}/{method}`
    pub path: String,
    /// Raw query string
    pub query: String,
    /// Request body
    pub body: Vec<u8>,
    /// Request headers
    pub headers: Headers,
    /// Peer address as reported by the listener
    pub remote_addr: String,
}

impl ProcessRequest {
    /// Structural validation; service, method, and HTTP method must be present
    pub fn validate(&self) -> Result<()> {
        if self.service.is_empty() {
            return Err(Error::InvalidRequest("service must not be empty".to_string()));
        }

        if self.api_method.is_empty() {
            return Err(Error::InvalidRequest(
                "API method must not be empty".to_string(),
            ));
        }

        if self.http_method == HttpMethod::Unspecified {
            return Err(Error::InvalidRequest(
                "HTTP method must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Outbound request forwarded to a provider
#[derive(Debug, Clone)]
pub struct ProviderProcessRequest {
    /// Target API method name
    pub api_method: String,
    /// HTTP method of the original request
    pub http_method: HttpMethod,
    /// Path remainder
    pub path: String,
    /// Raw query string
    pub query: String,
    /// Request body
    pub body: Vec<u8>,
    /// Forwarded headers
    pub headers: Headers,
    /// Authenticated subject, when one was established
    pub subject: Option<SubjectInformation>,
}

impl ProviderProcessRequest {
    /// Strip the bearer token before dispatch; the provider receives identity
    /// via the typed subject field.
    pub fn preprocess(&mut self) {
        self.headers.remove(AUTHORIZATION_HEADER);
    }
}

/// Response returned by a provider (or synthesized by the gateway)
#[derive(Debug, Clone, Default)]
pub struct ProviderProcessResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Response body
    pub body: Vec<u8>,
    /// Response headers
    pub headers: Headers,
}

impl ProviderProcessResponse {
    /// Inject `Content-Type: application/json` when the body is non-empty and
    /// the provider set no content type.
    pub fn set_defaults(&mut self) {
        if !self.body.is_empty() && self.headers.get(CONTENT_TYPE_HEADER).is_none() {
            self.headers.set(CONTENT_TYPE_HEADER, "application/json");
        }
    }
}
