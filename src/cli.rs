//! Command-line interface definitions for `policy-gateway`.
//!
//! Defines the top-level [`Cli`] struct parsed by `clap`. The binary has a
//! single mode: load the configuration and run the public and admin servers.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Text,
    /// One JSON object per line, for log aggregators
    Json,
}

/// Policy Gateway - authenticating API gateway for provider services
///
/// Terminates HTTP requests, authenticates them against the configured
/// identity provider, enforces the policy each provider declares through its
/// description endpoint, and forwards the request to the matching provider.
#[derive(Parser, Debug)]
#[command(name = "policy-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the gateway configuration file (YAML)
    #[arg(
        short,
        long,
        default_value = "gateway.yaml",
        env = "POLICY_GATEWAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Minimum log level: trace, debug, info, warn, or error
    #[arg(long, default_value = "info", env = "POLICY_GATEWAY_LOG_LEVEL")]
    pub log_level: String,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "text",
        env = "POLICY_GATEWAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,
}
