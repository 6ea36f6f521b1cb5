//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub rental: RentalConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_timeout() -> u64 {
    30
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply embedded migrations at startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_run_migrations() -> bool {
    true
}

/// Gateway deployment environment
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    #[default]
    Sandbox,
    Production,
}

/// Payment gateway configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Server key used as the basic-auth user
    pub server_key: String,

    /// Sandbox or production endpoints
    #[serde(default)]
    pub environment: GatewayEnvironment,

    /// Override for the hosted-checkout base URL
    pub snap_url: Option<String>,

    /// Override for the status API base URL
    pub api_url: Option<String>,

    /// Deadline for a single gateway call in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,

    /// Hours until an issued checkout token expires
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: i64,

    /// Reject callbacks whose claimed status differs from the gateway's
    #[serde(default)]
    pub strict_callback_verification: bool,
}

fn default_gateway_timeout() -> u64 {
    15
}

fn default_expiry_hours() -> i64 {
    24
}

impl GatewayConfig {
    /// Hosted-checkout base URL for the configured environment
    pub fn snap_base_url(&self) -> String {
        match (&self.snap_url, self.environment) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, GatewayEnvironment::Production) => "https://app.midtrans.com".to_string(),
            (None, GatewayEnvironment::Sandbox) => "https://app.sandbox.midtrans.com".to_string(),
        }
    }

    /// Status API base URL for the configured environment
    pub fn api_base_url(&self) -> String {
        match (&self.api_url, self.environment) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, GatewayEnvironment::Production) => "https://api.midtrans.com".to_string(),
            (None, GatewayEnvironment::Sandbox) => "https://api.sandbox.midtrans.com".to_string(),
        }
    }
}

/// Rental engine configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RentalConfig {
    /// Commit a whole return in one transaction instead of one per item
    #[serde(default)]
    pub atomic_return: bool,
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("server.timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", true)?
            .set_default("gateway.environment", "sandbox")?
            .set_default("gateway.timeout_secs", 15)?
            .set_default("gateway.expiry_hours", 24)?
            .set_default("gateway.strict_callback_verification", false)?
            .set_default("rental.atomic_return", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with TOYRENT_ prefix
            .add_source(
                Environment::with_prefix("TOYRENT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("TOYRENT").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
