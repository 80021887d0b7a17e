//! Bearer token validation against the identity provider.
//!
//! # Verification flow
//!
//! 1. Decode the JWT header (no verification) to extract `kid`.
//! 2. Fetch the provider's JWKS (cached for 5 minutes; refreshed once on an
//!    unknown `kid`).
//! 3. Verify the RS256 signature and standard claims (`exp`, `aud`, `iss`)
//!    with a 60-second clock-skew allowance.
//! 4. Map the `sub` and `permissions` claims to a [`SubjectInformation`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    jwk::{AlgorithmParameters, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use crate::config::IdpConfig;
use crate::domain::SubjectInformation;
use crate::{Error, Result};

/// Validates a bearer token and extracts the subject it identifies.
#[async_trait]
pub trait TokenParser: Send + Sync {
    /// Parse and validate `token`, returning the authenticated subject.
    async fn parse_token(&self, token: &str) -> Result<SubjectInformation>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    permissions: Vec<String>,
}

struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

impl CachedJwks {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }
}

/// [`TokenParser`] backed by the identity provider's JWKS endpoint.
pub struct JwksTokenParser {
    issuer: String,
    audience: String,
    jwks_uri: String,
    http: reqwest::Client,
    cache: RwLock<Option<CachedJwks>>,
    ttl: Duration,
}

impl JwksTokenParser {
    /// JWKS cache lifetime
    const JWKS_TTL: Duration = Duration::from_secs(300);
    /// Allowed clock skew between the identity provider and the gateway host
    const CLOCK_LEEWAY_SECS: u64 = 60;

    /// Create a parser pinned to the configured issuer and audience.
    #[must_use]
    pub fn new(config: &IdpConfig) -> Self {
        let mut issuer = config.domain.clone();
        if !issuer.ends_with('/') {
            issuer.push('/');
        }

        Self {
            jwks_uri: format!("{issuer}.well-known/jwks.json"),
            issuer,
            audience: config.audience.clone(),
            http: reqwest::Client::new(),
            cache: RwLock::new(None),
            ttl: Self::JWKS_TTL,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = Self::CLOCK_LEEWAY_SECS;
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation
    }

    async fn fetch_jwks(&self) -> Result<JwkSet> {
        debug!(uri = %self.jwks_uri, "fetching JWKS");
        let keys: JwkSet = self.http.get(&self.jwks_uri).send().await?.json().await?;

        *self.cache.write() = Some(CachedJwks {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }

    /// Find a decoding key by `kid`, refreshing the cache once if unknown.
    async fn find_decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        let cached = {
            let guard = self.cache.read();
            guard
                .as_ref()
                .filter(|c| !c.is_stale(self.ttl))
                .map(|c| c.keys.clone())
        };

        if let Some(keys) = cached {
            if let Some(key) = find_key_in_jwks(&keys, kid) {
                return Ok(key);
            }
        }

        let keys = self.fetch_jwks().await?;
        find_key_in_jwks(&keys, kid)
            .ok_or_else(|| Error::InvalidToken(format!("unknown key id {kid}")))
    }
}

#[async_trait]
impl TokenParser for JwksTokenParser {
    async fn parse_token(&self, token: &str) -> Result<SubjectInformation> {
        if token.is_empty() {
            return Err(Error::InvalidToken("no bearer token".to_string()));
        }

        let header = jsonwebtoken::decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| Error::InvalidToken("token header has no key id".to_string()))?;

        let decoding_key = self.find_decoding_key(&kid).await?;
        let data = jsonwebtoken::decode::<Claims>(token, &decoding_key, &self.validation())?;

        let subject = SubjectInformation {
            id: data.claims.sub,
            permissions: data.claims.permissions.into_iter().collect(),
        };
        subject.validate()?;

        Ok(subject)
    }
}

fn find_key_in_jwks(keys: &JwkSet, kid: &str) -> Option<DecodingKey> {
    keys.keys
        .iter()
        .find(|jwk| jwk.common.key_id.as_deref() == Some(kid))
        .and_then(|jwk| match &jwk.algorithm {
            AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok(),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> JwksTokenParser {
        JwksTokenParser::new(&IdpConfig {
            domain: "https://tenant.example.com".to_string(),
            audience: "https://gateway.example.com".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
        })
    }

    #[test]
    fn jwks_uri_follows_discovery_convention() {
        assert_eq!(
            parser().jwks_uri,
            "https://tenant.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn issuer_gains_trailing_slash() {
        assert_eq!(parser().issuer, "https://tenant.example.com/");
    }

    #[tokio::test]
    async fn empty_token_is_rejected_without_io() {
        let err = parser().parse_token("").await.unwrap_err();
        assert!(matches!(err, Error::InvalidToken(_)));
    }

    #[tokio::test]
    async fn malformed_token_is_rejected_without_io() {
        assert!(parser().parse_token("not-a-jwt").await.is_err());
    }

    #[test]
    fn permissions_claim_defaults_to_empty() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"auth0|user"}"#).unwrap();
        assert!(claims.permissions.is_empty());
    }

    #[test]
    fn duplicate_permissions_collapse_into_set() {
        let claims: Claims = serde_json::from_str(
            r#"{"sub":"auth0|user","permissions":["read:a","read:a","read:b"]}"#,
        )
        .unwrap();

        let subject = SubjectInformation {
            id: claims.sub,
            permissions: claims.permissions.into_iter().collect(),
        };
        assert_eq!(subject.permissions.len(), 2);
    }
}
