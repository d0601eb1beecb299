//! Configuration management
//!
//! Configuration is loaded from a `config.yml` file, with `CONDUIT_*`
//! environment variables overriding file settings. Missing values are
//! filled with defaults.

use serde::{Deserialize, Serialize};

/// Secret used when none is configured. Only suitable for local development.
pub const DEV_JWT_SECRET: &str = "conduit-development-secret-change-me";

/// Longest accepted token lifetime (ten years)
pub const MAX_TOKEN_TTL_HOURS: i64 = 10 * 365 * 24;

/// Longest accepted cache TTL (one year)
pub const MAX_CACHE_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the SPA dev server)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL (`:memory:` for an in-memory database)
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/conduit.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Token lifetime in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl AuthConfig {
    /// Whether the built-in development secret is in use
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns the default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - CONDUIT_SERVER_HOST
    /// - CONDUIT_SERVER_PORT
    /// - CONDUIT_SERVER_CORS_ORIGIN
    /// - CONDUIT_DATABASE_URL
    /// - CONDUIT_DATABASE_MAX_CONNECTIONS
    /// - CONDUIT_AUTH_JWT_SECRET
    /// - CONDUIT_AUTH_TOKEN_TTL_HOURS
    /// - CONDUIT_CACHE_TTL_SECONDS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check values that have no sensible fallback
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must not be empty".to_string(),
            ));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_hours must be positive".to_string(),
            ));
        }
        if self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "auth.token_ttl_hours must be at most {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if self.cache.ttl_seconds > MAX_CACHE_TTL_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "cache.ttl_seconds must be at most {}",
                MAX_CACHE_TTL_SECONDS
            )));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("CONDUIT_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CONDUIT_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("CONDUIT_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Database configuration
        if let Ok(url) = std::env::var("CONDUIT_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(max) = std::env::var("CONDUIT_DATABASE_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                self.database.max_connections = max;
            }
        }

        // Auth configuration
        if let Ok(secret) = std::env::var("CONDUIT_AUTH_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(hours) = std::env::var("CONDUIT_AUTH_TOKEN_TTL_HOURS") {
            if let Ok(hours) = hours.parse::<i64>() {
                self.auth.token_ttl_hours = hours;
            }
        }

        // Cache configuration
        if let Ok(ttl) = std::env::var("CONDUIT_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_KEYS: &[&str] = &[
        "CONDUIT_SERVER_HOST",
        "CONDUIT_SERVER_PORT",
        "CONDUIT_SERVER_CORS_ORIGIN",
        "CONDUIT_DATABASE_URL",
        "CONDUIT_DATABASE_MAX_CONNECTIONS",
        "CONDUIT_AUTH_JWT_SECRET",
        "CONDUIT_AUTH_TOKEN_TTL_HOURS",
        "CONDUIT_CACHE_TTL_SECONDS",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/conduit.db");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert!(config.auth.uses_dev_secret());
        assert_eq!(config.cache.ttl_seconds, 300);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\nauth:\n  token_ttl_hours: 2\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_ttl_hours, 2);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.auth.uses_dev_secret());
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"
server:
  host: "127.0.0.1"
  port: 9000
  cors_origin: "https://conduit.example"
database:
  url: "/var/lib/conduit/conduit.db"
  max_connections: 4
auth:
  jwt_secret: "s3cret"
  token_ttl_hours: 12
cache:
  ttl_seconds: 60
"#).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origin, "https://conduit.example");
        assert_eq!(config.database.url, "/var/lib/conduit/conduit.db");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.token_ttl_hours, 12);
        assert_eq!(config.cache.ttl_seconds, 60);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();

        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = "  ".to_string();

        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_non_positive_ttl() {
        let mut config = Config::default();
        config.auth.token_ttl_hours = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_token_ttl() {
        let mut config = Config::default();
        config.auth.token_ttl_hours = i64::MAX / 2;

        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        config.auth.token_ttl_hours = MAX_TOKEN_TTL_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_cache_ttl() {
        let mut config = Config::default();
        config.cache.ttl_seconds = 100_000_000_000;

        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        config.cache.ttl_seconds = MAX_CACHE_TTL_SECONDS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_largest_valid_values_build_services() {
        let mut config = Config::default();
        config.auth.token_ttl_hours = MAX_TOKEN_TTL_HOURS;
        config.cache.ttl_seconds = MAX_CACHE_TTL_SECONDS;
        config.validate().unwrap();

        let tokens = crate::services::TokenService::from_config(&config.auth);
        let cache = crate::cache::create_cache(&config.cache);

        let mut user = crate::models::User::new("jake".into(), "jake@jake.jake".into(), "hash".into());
        user.id = 1;
        assert!(tokens.issue(&user).is_ok());
        assert_eq!(cache.default_ttl().as_secs(), MAX_CACHE_TTL_SECONDS);
    }

    #[test]
    fn test_env_overrides() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("CONDUIT_SERVER_HOST", "192.168.1.1");
        std::env::set_var("CONDUIT_SERVER_PORT", "4000");
        std::env::set_var("CONDUIT_DATABASE_URL", ":memory:");
        std::env::set_var("CONDUIT_AUTH_JWT_SECRET", "from-env");
        std::env::set_var("CONDUIT_CACHE_TTL_SECONDS", "42");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.database.url, ":memory:");
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.cache.ttl_seconds, 42);

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_numbers_ignored() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("CONDUIT_SERVER_PORT", "not-a-port");
        std::env::set_var("CONDUIT_AUTH_TOKEN_TTL_HOURS", "soon");

        let config = Config::load_with_env(std::path::Path::new("nonexistent_config.yml")).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_hours, 24);

        clear_env();
    }
}
