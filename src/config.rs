//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.
//! The portal deliberately resolves a single API root here; the previous
//! generation of the portal scattered per-module base URLs across the
//! client (ports 5001, 5002, 3006) and this is the fix.

use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum ConfigError {
    #[error("Failed to load environment variables: {0}")]
    EnvLoad(#[from] dotenvy::Error),

    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Bind to 0.0.0.0 so container deployments work out of the box
            host: Ipv4Addr::new(0, 0, 0, 0),
            port: 5050,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Authentication bootstrap configuration
///
/// The portal seeds one administrator account at startup so a fresh
/// deployment can be administered immediately.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_name: "Portal Administrator".to_string(),
            admin_email: "admin@campus.local".to_string(),
            admin_password: "ChangeMe123".to_string(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let server = ServerConfig {
            host: std::env::var("HOST")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().port),
        };

        let cors = CorsConfig {
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|s| Self::parse_origins(&s))
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            admin_name: std::env::var("ADMIN_NAME").unwrap_or(defaults.admin_name),
            admin_email: std::env::var("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: std::env::var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
        };

        Ok(Self { server, cors, auth })
    }

    /// Split a comma-separated origin list, keeping only well-formed URLs
    fn parse_origins(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter(|s| {
                if url::Url::parse(s).is_ok() {
                    true
                } else {
                    warn!("Ignoring malformed CORS origin '{}'", s);
                    false
                }
            })
            .map(|s| s.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 5050);
    }

    #[test]
    fn test_default_auth_config() {
        let config = AuthConfig::default();
        assert_eq!(config.admin_email, "admin@campus.local");
    }

    #[test]
    fn test_parse_origins_drops_malformed_entries() {
        let origins = Settings::parse_origins("http://localhost:3001, not a url, https://portal.campus.edu");
        assert_eq!(
            origins,
            vec![
                "http://localhost:3001".to_string(),
                "https://portal.campus.edu".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_origins_empty_input() {
        assert!(Settings::parse_origins("").is_empty());
        assert!(Settings::parse_origins(" , ,").is_empty());
    }
}
