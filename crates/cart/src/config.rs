//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CART_API_BASE_URL` - Base URL of the stock and catalog API (default: `http://localhost:3333`)
//! - `CART_API_TOKEN` - Bearer token sent with every API request
//! - `CART_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `CART_CATALOG_CACHE_TTL_SECS` - How long product records stay cached (default: 300)
//! - `CART_STORAGE_PATH` - File backing the local key-value store (default: `.rocketshoes/storage.json`)
//! - `CART_STRICT_STOCK` - Reject amounts above the stock quantity (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:3333";
const DEFAULT_TIMEOUT_SECS: &str = "10";
const DEFAULT_CACHE_TTL_SECS: &str = "300";
const DEFAULT_STORAGE_PATH: &str = ".rocketshoes/storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart application configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct CartConfig {
    /// Base URL for `/stock/{id}` and `/products/{id}`
    pub api_base_url: Url,
    /// Optional bearer token for the API
    pub api_token: Option<SecretString>,
    /// Upper bound on a single API request
    pub request_timeout: Duration,
    /// Catalog cache time-to-live
    pub catalog_cache_ttl: Duration,
    /// Path of the file-backed key-value store
    pub storage_path: PathBuf,
    /// Reject requested amounts above the available stock
    pub strict_stock: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for CartConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .field("storage_path", &self.storage_path)
            .field("strict_stock", &self.strict_stock)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = parse_base_url(
            "CART_API_BASE_URL",
            &get_or_default(&lookup, "CART_API_BASE_URL", DEFAULT_BASE_URL),
        )?;
        let api_token = get_optional(&lookup, "CART_API_TOKEN").map(SecretString::from);
        let request_timeout = Duration::from_secs(parse_secs(
            "CART_REQUEST_TIMEOUT_SECS",
            &get_or_default(&lookup, "CART_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        )?);
        let catalog_cache_ttl = Duration::from_secs(parse_secs(
            "CART_CATALOG_CACHE_TTL_SECS",
            &get_or_default(&lookup, "CART_CATALOG_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
        )?);
        let storage_path =
            PathBuf::from(get_or_default(&lookup, "CART_STORAGE_PATH", DEFAULT_STORAGE_PATH));
        let strict_stock = get_optional(&lookup, "CART_STRICT_STOCK")
            .map(|value| parse_bool("CART_STRICT_STOCK", &value))
            .transpose()?
            .unwrap_or(false);
        let sentry_dsn = get_optional(&lookup, "SENTRY_DSN");

        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            api_token,
            request_timeout,
            catalog_cache_ttl,
            storage_path,
            strict_stock,
            sentry_dsn,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable, treating an empty value as unset.
fn get_optional<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get a variable with a default value.
fn get_or_default<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &str) -> String {
    get_optional(lookup, key).unwrap_or_else(|| default.to_string())
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Parse the API base URL. A trailing slash is added so relative joins
/// (`stock/1`) land under the configured path instead of replacing its last
/// segment.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
