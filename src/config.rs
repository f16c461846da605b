//! Configuration module
//!
//! [`AppConfig`] is read from a TOML file (see [`default_config_path`]) and
//! then patched from environment variables, so secrets never have to live
//! in the file:
//!
//! | Variable                | Field                          |
//! |-------------------------|--------------------------------|
//! | `DATABASE_URL`          | `database.url`                 |
//! | `JWT_KEY`               | `security.jwt_secret`          |
//! | `GOOGLE_API_KEY`        | `geocoding.api_key`            |
//! | `AWS_ACCESS_KEY_ID`     | `storage.access_key_id`        |
//! | `AWS_SECRET_ACCESS_KEY` | `storage.secret_access_key`    |
//! | `AWS_REGION`            | `storage.region`               |
//! | `S3_BUCKET`             | `storage.bucket`               |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::crypto::DEV_JWT_SECRET;
use crate::infrastructure::geocoding::google::DEFAULT_GEOCODE_URL;
use crate::shared::{CallTimeouts, InfraError};

/// Full application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub geocoding: GeocodingConfig,
    pub storage: StorageConfig,
    pub timeouts: TimeoutConfig,
}

// ── Sections ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
    pub cors_origins: Vec<String>,
    /// Request body limit, images included
    pub max_upload_bytes: usize,
    /// Externally visible base URL, used for locally stored image links
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            shutdown_timeout: 30,
            cors_origins: vec!["http://localhost:3000".to_string()],
            max_upload_bytes: 5 * 1024 * 1024,
            public_url: None,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SeaORM connection string (`sqlite://...` or `postgres://...`)
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://./places.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseSettings {
    pub fn connection_url(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bcrypt_cost: u32,
}

impl SecurityConfig {
    /// Whether tokens would be signed with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiration_hours: 1,
            bcrypt_cost: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error (or any `EnvFilter` directive)
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub api_key: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODE_URL.to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
    pub public_base_url: Option<String>,
    pub key_prefix: String,
    /// Target directory for the `local` backend
    pub local_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            bucket: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            endpoint: None,
            public_base_url: None,
            key_prefix: "images".to_string(),
            local_dir: "./uploads/images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub geocoder_secs: u64,
    pub storage_secs: u64,
    pub database_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            geocoder_secs: 10,
            storage_secs: 30,
            database_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn call_timeouts(&self) -> CallTimeouts {
        CallTimeouts {
            geocoder: Duration::from_secs(self.geocoder_secs),
            storage: Duration::from_secs(self.storage_secs),
            database: Duration::from_secs(self.database_secs),
        }
    }
}

// ── Loading ────────────────────────────────────────────────────────

impl AppConfig {
    /// Read the TOML file at `path` and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, InfraError> {
        toml::from_str(raw).map_err(|e| InfraError::Config(e.to_string()))
    }

    /// Defaults patched from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(secret) = lookup("JWT_KEY") {
            self.security.jwt_secret = secret;
        }
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.geocoding.api_key = key;
        }
        if let Some(id) = lookup("AWS_ACCESS_KEY_ID") {
            self.storage.access_key_id = Some(id);
        }
        if let Some(secret) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = Some(secret);
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.storage.region = region;
        }
        if let Some(bucket) = lookup("S3_BUCKET") {
            self.storage.bucket = bucket;
        }
    }

    /// Settings the server cannot start without.
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.security.jwt_secret.is_empty() {
            return Err(InfraError::Config("security.jwt_secret is empty".into()));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(InfraError::Config(
                "security.bcrypt_cost must be between 4 and 31".into(),
            ));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.is_empty() {
            return Err(InfraError::Config(
                "storage.bucket is required for the s3 backend".into(),
            ));
        }
        Ok(())
    }
}

/// `$PLACES_CONFIG`, else `~/.config/places-service/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("PLACES_CONFIG") {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .map(|dir| dir.join("places-service").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.security.jwt_expiration_hours, 1);
        assert_eq!(config.security.bcrypt_cost, 12);
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
        assert!(config.validate().is_ok());
        assert!(config.security.uses_dev_secret());
    }

    #[test]
    fn test_configured_secret_is_not_dev_secret() {
        let security = SecurityConfig {
            jwt_secret: "a-real-deployment-secret".into(),
            ..SecurityConfig::default()
        };
        assert!(!security.uses_dev_secret());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 8080

            [storage]
            backend = "s3"
            bucket = "places-images"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.key_prefix, "images");
        assert_eq!(config.timeouts.storage_secs, 30);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("[server\nport = ").unwrap_err();
        assert!(matches!(err, InfraError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgres://u:p@db/places"),
            ("JWT_KEY", "from-env"),
            ("S3_BUCKET", "bucket-from-env"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.url, "postgres://u:p@db/places");
        assert_eq!(config.security.jwt_secret, "from-env");
        assert_eq!(config.storage.bucket, "bucket-from-env");
        assert_eq!(config.storage.region, "us-east-1");
    }

    #[test]
    fn test_s3_without_bucket_is_invalid() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::S3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nformat = \"json\"").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.format, "json");
    }
}
