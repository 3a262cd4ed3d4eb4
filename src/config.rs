//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
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

/// Limits and lists used by the validation pipeline
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Maximum `@description` length, in characters
    pub description_max_length: usize,
    /// Any body line longer than this marks the code as minified
    pub minified_max_line_length: usize,
    /// Average body line length above which a long body counts as minified
    pub minified_max_average_line_length: usize,
    /// Bodies shorter than this skip the average line length check
    pub minified_min_body_length: usize,
    /// Base of per-owner default namespaces
    pub namespace_base_url: String,
    /// Regexes matching approved external dependencies
    pub approved_dependency_patterns: Vec<String>,
    /// Directives stripped from every accepted revision
    pub forbidden_directives: Vec<String>,
    /// Directives whose values load external code
    pub dependency_directives: Vec<String>,
    /// JSON file with disallowed code fingerprints
    pub disallowed_signatures_path: Option<PathBuf>,
    /// Description used for the code published in place of deleted scripts
    pub deletion_notice: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            description_max_length: 500,
            minified_max_line_length: 5000,
            minified_max_average_line_length: 250,
            minified_min_body_length: 5000,
            namespace_base_url: "http://localhost/".to_string(),
            approved_dependency_patterns: vec![
                r"https?://ajax\.googleapis\.com/ajax/libs/.*".to_string(),
                r"https?://code\.jquery\.com/.*".to_string(),
            ],
            forbidden_directives: vec!["updateURL".to_string(), "downloadURL".to_string()],
            dependency_directives: vec!["require".to_string()],
            disallowed_signatures_path: None,
            deletion_notice: "This script was deleted".to_string(),
        }
    }
}

impl PolicyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let namespace_base_url =
            std::env::var("NAMESPACE_BASE_URL").unwrap_or(defaults.namespace_base_url);
        url::Url::parse(&namespace_base_url).map_err(|e| ConfigError::InvalidValue {
            key: "NAMESPACE_BASE_URL".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            description_max_length: env_parse(
                "DESCRIPTION_MAX_LENGTH",
                defaults.description_max_length,
            )?,
            minified_max_line_length: env_parse(
                "MINIFIED_MAX_LINE_LENGTH",
                defaults.minified_max_line_length,
            )?,
            minified_max_average_line_length: env_parse(
                "MINIFIED_MAX_AVERAGE_LINE_LENGTH",
                defaults.minified_max_average_line_length,
            )?,
            minified_min_body_length: env_parse(
                "MINIFIED_MIN_BODY_LENGTH",
                defaults.minified_min_body_length,
            )?,
            namespace_base_url,
            approved_dependency_patterns: env_list("APPROVED_DEPENDENCY_PATTERNS")
                .unwrap_or(defaults.approved_dependency_patterns),
            forbidden_directives: env_list("FORBIDDEN_DIRECTIVES")
                .unwrap_or(defaults.forbidden_directives),
            dependency_directives: env_list("DEPENDENCY_DIRECTIVES")
                .unwrap_or(defaults.dependency_directives),
            disallowed_signatures_path: std::env::var("DISALLOWED_SIGNATURES_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            deletion_notice: std::env::var("DELETION_NOTICE").unwrap_or(defaults.deletion_notice),
        })
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub policy: PolicyConfig,
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
            allowed_origins: env_list("ALLOWED_ORIGINS")
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        Ok(Self {
            server,
            cors,
            policy: PolicyConfig::from_env()?,
        })
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|raw| split_list(&raw))
}

/// Split a comma separated value, dropping blank entries
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_default_policy_config() {
        let config = PolicyConfig::default();
        assert_eq!(config.description_max_length, 500);
        assert_eq!(config.minified_max_line_length, 5000);
        assert_eq!(config.forbidden_directives, ["updateURL", "downloadURL"]);
        assert_eq!(config.dependency_directives, ["require"]);
        assert!(url::Url::parse(&config.namespace_base_url).is_ok());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), ["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
