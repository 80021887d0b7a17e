//! Error types for the gateway

use std::io;

use thiserror::Error;

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound request failed structural validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Bearer token validation failed
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Identity provider rejected a token issuance request
    #[error("Token issuance failed: {0}")]
    TokenIssuance(String),

    /// Provider RPC failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Description sync failed for one or more providers
    #[error("Description sync failed: {0}")]
    DescriptionSync(String),

    /// Rate limiter backend failure
    #[error("Rate limiter error: {0}")]
    RateLimiter(#[from] redis::RedisError),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
