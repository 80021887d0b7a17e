//! Identity provider client for machine-to-machine token issuance.
//!
//! Speaks the OAuth client-credentials flow: POST `{domain}/oauth/token` with
//! the gateway's client id/secret and the target audience. Any non-200
//! response is an error.

use serde::{Deserialize, Serialize};

use crate::config::IdpConfig;
use crate::{Error, Result};

/// Access token issued by the identity provider
#[derive(Debug, Clone, Deserialize)]
pub struct IssuedToken {
    /// The bearer credential itself
    pub access_token: String,
    /// Token type, normally `Bearer`
    pub token_type: String,
    /// Lifetime in seconds, as reported by the provider
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    audience: &'a str,
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// Client-credentials token client
pub struct IdpClient {
    domain: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl IdpClient {
    /// Create a client from the identity-provider configuration
    #[must_use]
    pub fn new(config: &IdpConfig) -> Self {
        let mut domain = config.domain.clone();
        if !domain.ends_with('/') {
            domain.push('/');
        }

        Self {
            domain,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Request a fresh token for `audience`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-200 status, or an
    /// undecodable response body.
    pub async fn token(&self, audience: &str) -> Result<IssuedToken> {
        let response = self
            .http
            .post(format!("{}oauth/token", self.domain))
            .json(&TokenRequest {
                audience,
                grant_type: "client_credentials",
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            })
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenIssuance(format!(
                "unexpected status {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_gains_trailing_slash() {
        let client = IdpClient::new(&IdpConfig {
            domain: "https://tenant.example.com".to_string(),
            audience: String::new(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        });

        assert_eq!(client.domain, "https://tenant.example.com/");
    }

    #[test]
    fn issued_token_deserializes() {
        let token: IssuedToken = serde_json::from_str(
            r#"{"access_token":"abc","token_type":"Bearer","expires_in":86400}"#,
        )
        .unwrap();

        assert_eq!(token.access_token, "abc");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 86_400);
    }
}
