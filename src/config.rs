//! Configuration management

use std::{path::Path, time::Duration};

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Public server configuration (the gateway entrypoint)
    pub public_listen_address: String,
    /// Admin server configuration (health, metrics)
    pub admin_listen_address: String,
    /// Identity provider configuration
    pub idp: IdpConfig,
    /// Redis configuration (rate limiter backend)
    pub redis: RedisConfig,
    /// How often provider descriptions are re-synced
    #[serde(with = "humantime_serde")]
    pub description_sync_period: Duration,
    /// Provider service configurations
    pub services: Vec<ServiceConfig>,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config: Self = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("POLICY_GATEWAY_").split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate required fields and per-service entries
    pub fn validate(&self) -> Result<()> {
        if self.idp.domain.is_empty() {
            return Err(Error::Config("idp.domain is required".to_string()));
        }

        if self.idp.audience.is_empty() {
            return Err(Error::Config("idp.audience is required".to_string()));
        }

        if self.idp.client_id.is_empty() {
            return Err(Error::Config("idp.client_id is required".to_string()));
        }

        if self.idp.client_secret.is_empty() {
            return Err(Error::Config("idp.client_secret is required".to_string()));
        }

        if self.description_sync_period.is_zero() {
            return Err(Error::Config(
                "description_sync_period must be greater than zero".to_string(),
            ));
        }

        for (index, service) in self.services.iter().enumerate() {
            service.validate().map_err(|e| {
                let name = if service.name.is_empty() {
                    format!("with index {index}")
                } else {
                    service.name.clone()
                };
                Error::Config(format!("service {name} is invalid: {e}"))
            })?;
        }

        Ok(())
    }
}

/// Identity provider (OAuth/OIDC) configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IdpConfig {
    /// Identity provider domain, e.g. `https://tenant.auth0.com`
    pub domain: String,
    /// Expected audience of inbound bearer tokens
    pub audience: String,
    /// Client id for machine-to-machine token issuance
    pub client_id: String,
    /// Client secret for machine-to-machine token issuance
    pub client_secret: String,
}

/// Redis configuration for the distributed rate limiter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis address as `host:port`
    pub address: String,
    /// Redis password (empty for no auth)
    pub password: String,
}

impl RedisConfig {
    /// Connection URL for the `redis` crate
    #[must_use]
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}", self.address)
        } else {
            format!("redis://:{}@{}", self.password, self.address)
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            password: String::new(),
        }
    }
}

/// A single provider service entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name; first segment of the public request path
    pub name: String,
    /// Base address of the provider RPC endpoint
    pub address: String,
    /// Audience for the M2M token attached to calls to this provider.
    /// When absent, calls carry no M2M token.
    pub m2m_audience: Option<String>,
    /// Timeout applied to every call to this provider
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,
}

impl ServiceConfig {
    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("field name is required".to_string()));
        }

        if self.address.is_empty() {
            return Err(Error::Config("field address is required".to_string()));
        }

        if self.operation_timeout.is_zero() {
            return Err(Error::Config(
                "field operation_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            address: String::new(),
            m2m_audience: None,
            operation_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_listen_address: "0.0.0.0:7070".to_string(),
            admin_listen_address: "0.0.0.0:7071".to_string(),
            idp: IdpConfig::default(),
            redis: RedisConfig::default(),
            description_sync_period: Duration::from_secs(60),
            services: Vec::new(),
        }
    }
}

/// Duration fields on the wire: a decimal count followed by an optional
/// `ms`, `s`, or `m` unit. A bare number means seconds.
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Write a duration as whole seconds, `"60s"` style
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&format_args!("{}s", duration.as_secs()))
    }

    /// Accepts `"500ms"`, `"30s"`, `"5m"`, or `"30"`; anything else is an
    /// error, including an unknown unit.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;

        let digits_end = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        let (count, unit) = raw.split_at(digits_end);
        let count: u64 = count
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid duration {raw:?}")))?;

        match unit {
            "ms" => Ok(Duration::from_millis(count)),
            "" | "s" => Ok(Duration::from_secs(count)),
            "m" => Ok(Duration::from_secs(count * 60)),
            _ => Err(serde::de::Error::custom(format!(
                "unknown duration unit in {raw:?}"
            ))),
        }
    }
}
