//! Configuration module for the NoodlePicks web proxy.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;

use crate::errors::AppError;

/// Default origin of the recommendation backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin of the backend API that requests are forwarded to
    pub backend_url: String,
    /// Address to bind the proxy to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let backend_url = normalize_origin(
            &env::var("NOODLEPICKS_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string()),
        );

        let raw_addr =
            env::var("NOODLEPICKS_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let bind_addr = raw_addr.parse().map_err(|_| {
            AppError::Internal(format!("Invalid NOODLEPICKS_BIND_ADDR format: {}", raw_addr))
        })?;

        let log_level = env::var("NOODLEPICKS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            backend_url,
            bind_addr,
            log_level,
        })
    }

    /// Configuration pointing at an explicit backend, used by tests and embedders.
    pub fn for_backend(backend_url: &str) -> Self {
        Self {
            backend_url: normalize_origin(backend_url),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_level: "warn".to_string(),
        }
    }
}

/// Strip trailing slashes so paths can be appended with a leading `/`.
fn normalize_origin(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("NOODLEPICKS_BACKEND_URL");
        env::remove_var("NOODLEPICKS_BIND_ADDR");
        env::remove_var("NOODLEPICKS_LOG_LEVEL");

        let config = Config::from_env().unwrap();

        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_for_backend_strips_trailing_slash() {
        let config = Config::for_backend("http://backend:5000/");
        assert_eq!(config.backend_url, "http://backend:5000");
        assert_eq!(config.bind_addr.port(), 0);
    }
}
