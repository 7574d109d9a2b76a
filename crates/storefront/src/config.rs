//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 8000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: <http://localhost:8000>)
//! - `STOREFRONT_SITE_NAME` - Shop name shown in page headers
//! - `STOREFRONT_STATIC_DIR` - Directory served under `/static`
//! - `STOREFRONT_PAGE_SIZE` - Products per listing page (default: 8, clamped to 1..=100)
//! - `STOREFRONT_RATE_LIMIT_PER_MINUTE` - Requests per minute per client IP (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::listing;

const DEFAULT_SITE_NAME: &str = "Lacquers & Paints";
const DEFAULT_STATIC_DIR: &str = "crates/storefront/static";
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;
const MAX_RATE_LIMIT_PER_MINUTE: u32 = 60_000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Shop name rendered in page headers and titles
    pub site_name: String,
    /// Directory holding static assets
    pub static_dir: String,
    /// Products per listing page, always within `1..=100`
    pub page_size: u32,
    /// Requests allowed per minute per client IP
    pub rate_limit_per_minute: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. "production")
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// `from_env` uses the process environment; tests pass a closure over
    /// fixed values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("STOREFRONT_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_string()))?;

        let host = parse_var(&lookup, "STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_var(&lookup, "STOREFRONT_PORT", "8000")?;
        let base_url: Url = parse_var(&lookup, "STOREFRONT_BASE_URL", "http://localhost:8000")?;

        let site_name = lookup("STOREFRONT_SITE_NAME").unwrap_or_else(|| DEFAULT_SITE_NAME.into());
        let static_dir =
            lookup("STOREFRONT_STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.into());

        let page_size = listing::clamp_page_size(parse_var(
            &lookup,
            "STOREFRONT_PAGE_SIZE",
            &listing::DEFAULT_PAGE_SIZE.to_string(),
        )?);

        let rate_limit_per_minute: u32 = parse_var(
            &lookup,
            "STOREFRONT_RATE_LIMIT_PER_MINUTE",
            &DEFAULT_RATE_LIMIT_PER_MINUTE.to_string(),
        )?;
        if !(1..=MAX_RATE_LIMIT_PER_MINUTE).contains(&rate_limit_per_minute) {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_RATE_LIMIT_PER_MINUTE".to_string(),
                format!("must be between 1 and {MAX_RATE_LIMIT_PER_MINUTE}"),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            site_name,
            static_dir,
            page_size,
            rate_limit_per_minute,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (controls secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Read a variable with a default and parse it.
fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("STOREFRONT_DATABASE_URL", "postgres://localhost/tshop")])
            .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.page_size, 8);
        assert_eq!(config.rate_limit_per_minute, 30);
        assert_eq!(config.site_name, DEFAULT_SITE_NAME);
        assert!(!config.is_secure());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_database_url() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_database_url_fallback() {
        let config = config_from(&[("DATABASE_URL", "postgres://fly/tshop")]).unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fly/tshop");
    }

    #[test]
    fn test_page_size_clamped() {
        let base = ("STOREFRONT_DATABASE_URL", "postgres://localhost/tshop");

        let config = config_from(&[base, ("STOREFRONT_PAGE_SIZE", "500")]).unwrap();
        assert_eq!(config.page_size, 100);

        let config = config_from(&[base, ("STOREFRONT_PAGE_SIZE", "0")]).unwrap();
        assert_eq!(config.page_size, 1);

        let config = config_from(&[base, ("STOREFRONT_PAGE_SIZE", "-3")]).unwrap();
        assert_eq!(config.page_size, 1);
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[
            ("STOREFRONT_DATABASE_URL", "postgres://localhost/tshop"),
            ("STOREFRONT_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOREFRONT_PORT"));
    }

    #[test]
    fn test_rate_limit_bounds() {
        let err = config_from(&[
            ("STOREFRONT_DATABASE_URL", "postgres://localhost/tshop"),
            ("STOREFRONT_RATE_LIMIT_PER_MINUTE", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_https_base_url_is_secure() {
        let config = config_from(&[
            ("STOREFRONT_DATABASE_URL", "postgres://localhost/tshop"),
            ("STOREFRONT_BASE_URL", "https://shop.example.com"),
        ])
        .unwrap();
        assert!(config.is_secure());
    }
}
