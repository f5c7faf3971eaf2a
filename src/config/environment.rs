// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

//! Environment-based configuration management for production deployment

use crate::constants::{otp_policy, tokens};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info, // Default fallback
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Environment type for cookie and security configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development, // Default fallback for unrecognized values
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is a development environment
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database with file path
    SQLite { path: PathBuf },
    /// In-memory SQLite (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str),
            }
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/users.db"),
        }
    }
}

impl std::fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Log level
    pub log_level: LogLevel,
    /// Deployment environment
    pub environment: Environment,
    /// Database configuration
    pub database: DatabaseConfig,
    /// JWT signing configuration
    pub jwt: JwtConfig,
    /// OTP policy configuration
    pub otp: OtpPolicyConfig,
    /// SMTP delivery configuration
    pub smtp: SmtpConfig,
    /// Key-value store configuration
    pub store: StoreSettings,
    /// Security settings
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite path or `sqlite::memory:`)
    pub url: DatabaseUrl,
}

/// JWT signing configuration.
///
/// Access and refresh tokens use distinct secrets so a leaked access secret
/// cannot mint refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret for access tokens
    pub access_secret: String,
    /// HMAC secret for refresh tokens
    pub refresh_secret: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
}

/// OTP policy configuration, all windows in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpPolicyConfig {
    /// OTP time-to-live
    pub ttl_secs: u64,
    /// Resend cooldown
    pub cooldown_secs: u64,
    /// Request-count window
    pub request_window_secs: u64,
    /// Requests allowed inside the window before a spam lock
    pub resend_limit: u64,
    /// Spam lock duration
    pub spam_lock_secs: u64,
    /// Failed verification attempts allowed before an account lock
    pub max_failed_attempts: u64,
    /// Failed-attempt counter window
    pub failed_attempt_window_secs: u64,
    /// Account lock duration
    pub account_lock_secs: u64,
}

impl Default for OtpPolicyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: otp_policy::TTL_SECS,
            cooldown_secs: otp_policy::COOLDOWN_SECS,
            request_window_secs: otp_policy::REQUEST_WINDOW_SECS,
            resend_limit: otp_policy::RESEND_LIMIT,
            spam_lock_secs: otp_policy::SPAM_LOCK_SECS,
            max_failed_attempts: otp_policy::MAX_FAILED_ATTEMPTS,
            failed_attempt_window_secs: otp_policy::FAILED_ATTEMPT_WINDOW_SECS,
            account_lock_secs: otp_policy::ACCOUNT_LOCK_SECS,
        }
    }
}

impl OtpPolicyConfig {
    /// Load OTP policy from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            ttl_secs: env_parse_or("OTP_TTL_SECS", otp_policy::TTL_SECS),
            cooldown_secs: env_parse_or("OTP_COOLDOWN_SECS", otp_policy::COOLDOWN_SECS),
            request_window_secs: env_parse_or(
                "OTP_REQUEST_WINDOW_SECS",
                otp_policy::REQUEST_WINDOW_SECS,
            ),
            resend_limit: env_parse_or("OTP_RESEND_LIMIT", otp_policy::RESEND_LIMIT),
            spam_lock_secs: env_parse_or("OTP_SPAM_LOCK_SECS", otp_policy::SPAM_LOCK_SECS),
            max_failed_attempts: env_parse_or(
                "OTP_MAX_FAILED_ATTEMPTS",
                otp_policy::MAX_FAILED_ATTEMPTS,
            ),
            failed_attempt_window_secs: env_parse_or(
                "OTP_FAILED_ATTEMPT_WINDOW_SECS",
                otp_policy::FAILED_ATTEMPT_WINDOW_SECS,
            ),
            account_lock_secs: env_parse_or("OTP_ACCOUNT_LOCK_SECS", otp_policy::ACCOUNT_LOCK_SECS),
        }
    }
}

/// SMTP delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay host
    pub host: String,
    /// SMTP relay port
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password
    pub password: String,
    /// From address on outgoing mail
    pub from_address: String,
}

/// Key-value store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Redis URL for the shared store; `None` selects the in-memory backend
    pub redis_url: Option<String>,
    /// Maximum number of entries in the in-memory store
    pub max_entries: usize,
    /// Cleanup interval for expired in-memory entries, in seconds
    pub cleanup_interval_secs: u64,
    /// Redis connection configuration
    pub redis_connection: RedisConnectionConfig,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            max_entries: 100_000,
            cleanup_interval_secs: 60,
            redis_connection: RedisConnectionConfig::default(),
        }
    }
}

impl StoreSettings {
    /// Load store settings from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").ok(),
            max_entries: env_parse_or("STORE_MAX_ENTRIES", 100_000),
            cleanup_interval_secs: env_parse_or("STORE_CLEANUP_INTERVAL_SECS", 60),
            redis_connection: RedisConnectionConfig::from_env(),
        }
    }
}

/// Redis connection and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConnectionConfig {
    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
    /// Response/command timeout in seconds
    pub response_timeout_secs: u64,
    /// Number of reconnection retries after connection drop
    pub reconnection_retries: usize,
    /// Exponential backoff base for retry delays
    pub retry_exponent_base: u64,
    /// Maximum retry delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Number of retries for initial connection at startup
    pub initial_connection_retries: u32,
    /// Initial retry delay in milliseconds (doubles with exponential backoff)
    pub initial_retry_delay_ms: u64,
}

impl Default for RedisConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 5,
            response_timeout_secs: 2,
            reconnection_retries: 6,
            retry_exponent_base: 2,
            max_retry_delay_ms: 10_000,
            initial_connection_retries: 5,
            initial_retry_delay_ms: 500,
        }
    }
}

impl RedisConnectionConfig {
    /// Load Redis connection configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connection_timeout_secs: env_parse_or(
                "REDIS_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            ),
            response_timeout_secs: env_parse_or(
                "REDIS_RESPONSE_TIMEOUT_SECS",
                defaults.response_timeout_secs,
            ),
            reconnection_retries: env_parse_or(
                "REDIS_RECONNECTION_RETRIES",
                defaults.reconnection_retries,
            ),
            retry_exponent_base: env_parse_or(
                "REDIS_RETRY_EXPONENT_BASE",
                defaults.retry_exponent_base,
            ),
            max_retry_delay_ms: env_parse_or(
                "REDIS_MAX_RETRY_DELAY_MS",
                defaults.max_retry_delay_ms,
            ),
            initial_connection_retries: env_parse_or(
                "REDIS_INITIAL_CONNECTION_RETRIES",
                defaults.initial_connection_retries,
            ),
            initial_retry_delay_ms: env_parse_or(
                "REDIS_INITIAL_RETRY_DELAY_MS",
                defaults.initial_retry_delay_ms,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// CORS allowed origins
    pub cors_origins: Vec<String>,
    /// Key for the keyed OTP hash at rest. Must be shared across instances
    /// so a code issued by one instance verifies on another.
    pub otp_hash_key: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails
    /// to parse or validate
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let config = Self {
            http_port: env_var_or("HTTP_PORT", "8080")?
                .parse()
                .context("Invalid HTTP_PORT value")?,
            log_level: LogLevel::from_str_or_default(&env_var_or("LOG_LEVEL", "info")?),
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )?),

            database: DatabaseConfig {
                url: DatabaseUrl::parse_url(&env_var_or("DATABASE_URL", "./data/users.db")?),
            },

            jwt: JwtConfig {
                access_secret: required_env("ACCESS_TOKEN_SECRET")?,
                refresh_secret: required_env("REFRESH_TOKEN_SECRET")?,
                access_ttl_secs: env_parse_or("ACCESS_TOKEN_TTL_SECS", tokens::ACCESS_TTL_SECS),
                refresh_ttl_secs: env_parse_or("REFRESH_TOKEN_TTL_SECS", tokens::REFRESH_TTL_SECS),
            },

            otp: OtpPolicyConfig::from_env(),

            smtp: SmtpConfig {
                host: env_var_or("SMTP_HOST", "localhost")?,
                port: env_var_or("SMTP_PORT", "587")?
                    .parse()
                    .context("Invalid SMTP_PORT value")?,
                username: env_var_or("SMTP_USERNAME", "")?,
                password: env_var_or("SMTP_PASSWORD", "")?,
                from_address: env_var_or("SMTP_FROM", "no-reply@shopverse.example")?,
            },

            store: StoreSettings::from_env(),

            security: SecurityConfig {
                cors_origins: parse_origins(&env_var_or("CORS_ORIGINS", "*")?),
                otp_hash_key: env_var_or("OTP_HASH_KEY", "")?,
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range or inconsistent
    pub fn validate(&self) -> Result<()> {
        if self.jwt.access_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "ACCESS_TOKEN_SECRET must be at least 32 bytes"
            ));
        }
        if self.jwt.refresh_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "REFRESH_TOKEN_SECRET must be at least 32 bytes"
            ));
        }
        if self.jwt.access_secret == self.jwt.refresh_secret {
            return Err(anyhow::anyhow!(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ"
            ));
        }

        if self.otp.resend_limit == 0 {
            return Err(anyhow::anyhow!("OTP_RESEND_LIMIT must be at least 1"));
        }
        if self.otp.max_failed_attempts == 0 {
            return Err(anyhow::anyhow!("OTP_MAX_FAILED_ATTEMPTS must be at least 1"));
        }
        if self.otp.ttl_secs == 0 {
            return Err(anyhow::anyhow!("OTP_TTL_SECS must be at least 1"));
        }

        if self.environment.is_production() && self.security.otp_hash_key.len() < 16 {
            return Err(anyhow::anyhow!(
                "OTP_HASH_KEY must be at least 16 bytes in production"
            ));
        }

        if self.environment.is_production() && self.store.redis_url.is_none() {
            warn!("Production environment without REDIS_URL: rate-limit state will be per-instance");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "ShopVerse Auth Configuration:\n\
             - HTTP Port: {}\n\
             - Log Level: {}\n\
             - Environment: {}\n\
             - Database: {}\n\
             - Store Backend: {}\n\
             - OTP TTL: {}s, Cooldown: {}s, Resend Limit: {}\n\
             - Access Token TTL: {}s, Refresh Token TTL: {}s",
            self.http_port,
            self.log_level,
            self.environment,
            self.database.url,
            self.store
                .redis_url
                .as_deref()
                .map_or("memory", |_| "redis"),
            self.otp.ttl_secs,
            self.otp.cooldown_secs,
            self.otp.resend_limit,
            self.jwt.access_ttl_secs,
            self.jwt.refresh_ttl_secs,
        )
    }
}

/// Get environment variable with a default fallback
fn env_var_or(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_owned()))
}

/// Get a required environment variable
fn required_env(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("Missing required environment variable {key}"))
}

/// Parse an environment variable, falling back to a default on absence or parse failure
fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
