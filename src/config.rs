//! Configuration module for mailroom.

use serde::Deserialize;
use std::path::Path;

use crate::{MailroomError, Result};

/// Environment variable overriding `auth.jwt_secret`.
pub const ENV_JWT_SECRET: &str = "MAILROOM_JWT_SECRET";

/// Environment variable overriding `database.path`.
pub const ENV_DATABASE_PATH: &str = "MAILROOM_DATABASE_PATH";

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Login attempts per minute per IP.
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_login_rate_limit() -> u32 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            login_rate_limit: default_login_rate_limit(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/mailroom.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Letter image upload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    /// Directory where uploaded images are stored.
    #[serde(default = "default_uploads_path")]
    pub path: String,
    /// URL prefix under which stored images are served.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Maximum image size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_uploads_path() -> String {
    "data/uploads".to_string()
}

fn default_public_url() -> String {
    "/uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    5
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            path: default_uploads_path(),
            public_url: default_public_url(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

impl UploadsConfig {
    /// Maximum image size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file path. Empty disables file output.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/mailroom.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign access tokens (HS256).
    #[serde(default)]
    pub jwt_secret: String,
    /// `iss` claim written into and required from access tokens.
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry_days: u64,
}

fn default_jwt_issuer() -> String {
    "mailroom".to_string()
}

fn default_access_expiry() -> u64 {
    3600
}

fn default_refresh_expiry() -> u64 {
    7
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: default_jwt_issuer(),
            access_token_expiry_secs: default_access_expiry(),
            refresh_token_expiry_days: default_refresh_expiry(),
        }
    }
}

/// Initial super admin account, created at startup when no super admin exists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl BootstrapConfig {
    /// Returns the credentials when both are configured.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(MailroomError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| MailroomError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `MAILROOM_JWT_SECRET`: JWT signing secret
    /// - `MAILROOM_DATABASE_PATH`: SQLite database file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var(ENV_JWT_SECRET) {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
        if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(MailroomError::Config(format!(
                "jwt_secret is not set. Set it in config.toml or via {ENV_JWT_SECRET}."
            )));
        }
        if self.auth.access_token_expiry_secs == 0 {
            return Err(MailroomError::Config(
                "access_token_expiry_secs must be positive".to_string(),
            ));
        }
        if self.server.login_rate_limit == 0 {
            return Err(MailroomError::Config(
                "login_rate_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.database.path, "data/mailroom.db");
        assert_eq!(config.uploads.public_url, "/uploads");
        assert_eq!(config.uploads.max_upload_bytes(), 5 * 1024 * 1024);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.auth.jwt_issuer, "mailroom");
        assert_eq!(config.auth.access_token_expiry_secs, 3600);
        assert_eq!(config.auth.refresh_token_expiry_days, 7);
        assert!(config.bootstrap.admin_credentials().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
cors_origins = ["http://localhost:3000"]
login_rate_limit = 3

[database]
path = "/var/lib/mailroom/mail.db"
max_connections = 8

[uploads]
path = "/var/lib/mailroom/uploads"
public_url = "/files"
max_upload_size_mb = 2

[logging]
level = "debug"
file = ""

[auth]
jwt_secret = "secret"
jwt_issuer = "registry"
access_token_expiry_secs = 600
refresh_token_expiry_days = 30

[bootstrap]
admin_username = "admin"
admin_password = "changeme123"
"#;
        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.server.login_rate_limit, 3);
        assert_eq!(config.database.path, "/var/lib/mailroom/mail.db");
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.uploads.public_url, "/files");
        assert_eq!(config.uploads.max_upload_bytes(), 2 * 1024 * 1024);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file.is_empty());
        assert_eq!(config.auth.jwt_secret, "secret");
        assert_eq!(config.auth.jwt_issuer, "registry");
        assert_eq!(config.auth.access_token_expiry_secs, 600);
        assert_eq!(config.auth.refresh_token_expiry_days, 30);
        assert_eq!(
            config.bootstrap.admin_credentials(),
            Some(("admin", "changeme123"))
        );
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 9000

[auth]
jwt_secret = "abc"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.jwt_issuer, "mailroom");
        assert_eq!(config.database.path, "data/mailroom.db");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert!(config.auth.jwt_secret.is_empty());
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[server\nport = ");
        assert!(matches!(result, Err(MailroomError::Config(_))));
    }

    #[test]
    fn test_bootstrap_requires_both_fields() {
        let config = Config::parse(
            r#"
[bootstrap]
admin_username = "admin"
"#,
        )
        .unwrap();
        assert!(config.bootstrap.admin_credentials().is_none());
    }

    #[test]
    fn test_validate_requires_jwt_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_expiry() {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config.auth.access_token_expiry_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_env_overrides() {
        let original_secret = std::env::var(ENV_JWT_SECRET).ok();
        let original_path = std::env::var(ENV_DATABASE_PATH).ok();

        std::env::set_var(ENV_JWT_SECRET, "env-secret-key");
        std::env::set_var(ENV_DATABASE_PATH, "/tmp/env.db");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.auth.jwt_secret, "env-secret-key");
        assert_eq!(config.database.path, "/tmp/env.db");

        // Empty values leave the configured value alone.
        std::env::set_var(ENV_JWT_SECRET, "");
        let mut config = Config::default();
        config.auth.jwt_secret = "file-secret".to_string();
        config.apply_env_overrides();
        assert_eq!(config.auth.jwt_secret, "file-secret");

        match original_secret {
            Some(val) => std::env::set_var(ENV_JWT_SECRET, val),
            None => std::env::remove_var(ENV_JWT_SECRET),
        }
        match original_path {
            Some(val) => std::env::set_var(ENV_DATABASE_PATH, val),
            None => std::env::remove_var(ENV_DATABASE_PATH),
        }
    }
}
