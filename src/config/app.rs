//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::archive::{LocalTableService, MemoryTableService, TableId, TableService};
use crate::store::{
    DEFAULT_KEY_PREFIX, DEFAULT_POOL_CAPACITY, DEFAULT_TIMEOUT, PoolOptions, ReleasePolicy,
    RespDialer, StatsReader,
};

use super::validation::{ConfigError, expand_env_vars, validate_address};

// =============================================================================
// Constants
// =============================================================================

/// Default archive interval (1 minute).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Minimum archive interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Default root directory of the local backend.
pub const DEFAULT_ARCHIVE_PATH: &str = "./archive";

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_pool_capacity() -> usize {
    DEFAULT_POOL_CAPACITY
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_archive_path() -> PathBuf {
    PathBuf::from(DEFAULT_ARCHIVE_PATH)
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

// =============================================================================
// Store Configuration
// =============================================================================

/// Statistics store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store address as `host:port`.
    pub address: String,

    /// Password sent with AUTH after dial. Empty or absent means no AUTH.
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Idle connections kept for reuse (default: 1000).
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,

    /// Whether latched connections go back to the idle buffer.
    #[serde(default)]
    pub release_policy: ReleasePolicy,

    /// Key namespace of the stats (default: "stats").
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl StoreConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: None,
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            release_policy: ReleasePolicy::default(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn dialer(&self) -> RespDialer {
        RespDialer::new(&self.address)
            .with_password(self.password.clone().unwrap_or_default())
            .with_connect_timeout(self.connect_timeout)
            .with_io_timeouts(self.read_timeout, self.write_timeout)
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            capacity: self.pool_capacity,
            release_policy: self.release_policy,
        }
    }

    pub fn reader(&self) -> StatsReader {
        StatsReader::new(&self.key_prefix)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_address(&self.address).map_err(ConfigError::ValidationError)?;

        for (name, value) in [
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "store {name} must be non-zero"
                )));
            }
        }

        if self.pool_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "store pool_capacity must be positive".to_string(),
            ));
        }

        if self.key_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "store key_prefix cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Archive Configuration
// =============================================================================

/// Where archive tables live.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArchiveBackend {
    /// JSON files under `path`.
    #[default]
    Local,
    /// Process memory; nothing survives a restart.
    Memory,
}

/// Archive destination and schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub backend: ArchiveBackend,

    /// Root directory of the local backend (default: "./archive").
    #[serde(default = "default_archive_path")]
    pub path: PathBuf,

    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,

    /// Time between archive cycles (default: 1m, minimum: 1s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

impl ArchiveConfig {
    pub fn table(&self) -> TableId {
        TableId::new(&self.project_id, &self.dataset_id, &self.table_id)
    }

    /// Build the configured table service.
    pub fn table_service(&self) -> Arc<dyn TableService> {
        match self.backend {
            ArchiveBackend::Local => Arc::new(LocalTableService::new(&self.path)),
            ArchiveBackend::Memory => Arc::new(MemoryTableService::new()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("project_id", &self.project_id),
            ("dataset_id", &self.dataset_id),
            ("table_id", &self.table_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "archive {name} cannot be empty"
                )));
            }
        }

        if self.interval < MIN_INTERVAL {
            return Err(ConfigError::ValidationError(format!(
                "archive interval must be at least {}",
                humantime::format_duration(MIN_INTERVAL)
            )));
        }

        if self.backend == ArchiveBackend::Local && self.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "archive path cannot be empty for the local backend".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub archive: ArchiveConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded before parsing.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(&expand_env_vars(content))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.archive.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
store:
  address: "localhost:6379"
archive:
  project_id: proj
  dataset_id: stats
  table_id: archive
"#;

    fn valid() -> AppConfig {
        AppConfig::from_yaml(MINIMAL).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = valid();

        assert_eq!(config.store.password, None);
        assert_eq!(config.store.connect_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.store.read_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.store.write_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.store.pool_capacity, DEFAULT_POOL_CAPACITY);
        assert_eq!(config.store.release_policy, ReleasePolicy::DiscardLatched);
        assert_eq!(config.store.key_prefix, "stats");
        assert_eq!(config.archive.backend, ArchiveBackend::Local);
        assert_eq!(config.archive.path, PathBuf::from("./archive"));
        assert_eq!(config.archive.interval, DEFAULT_INTERVAL);
        assert_eq!(config.archive.table().to_string(), "proj:stats.archive");
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
store:
  address: "10.0.0.5:7000"
  password: hunter2
  connect_timeout: 2s
  read_timeout: 500ms
  write_timeout: 1s
  pool_capacity: 16
  release_policy: retain_latched
  key_prefix: hub
archive:
  backend: memory
  project_id: p
  dataset_id: d
  table_id: t
  interval: 30s
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.store.password.as_deref(), Some("hunter2"));
        assert_eq!(config.store.read_timeout, Duration::from_millis(500));
        assert_eq!(config.store.pool_options().capacity, 16);
        assert_eq!(
            config.store.pool_options().release_policy,
            ReleasePolicy::RetainLatched
        );
        assert_eq!(config.store.reader().dims_key(), "hub:dims");
        assert_eq!(config.archive.backend, ArchiveBackend::Memory);
        assert_eq!(config.archive.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_password_from_env_default() {
        let yaml = MINIMAL.replace(
            "address: \"localhost:6379\"",
            "address: \"localhost:6379\"\n  password: \"${STATSHUB_NO_SUCH_PW_1:-fromdefault}\"",
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();

        assert_eq!(config.store.password.as_deref(), Some("fromdefault"));
    }

    #[test]
    fn test_invalid_address() {
        let mut config = valid();
        config.store.address = "localhost".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("host:port"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = valid();
        config.store.read_timeout = Duration::ZERO;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("read_timeout"));
    }

    #[test]
    fn test_zero_pool_capacity_rejected() {
        let mut config = valid();
        config.store.pool_capacity = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_table_id_rejected() {
        let mut config = valid();
        config.archive.dataset_id = " ".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dataset_id"));
    }

    #[test]
    fn test_interval_minimum() {
        let mut config = valid();
        config.archive.interval = Duration::from_millis(500);
        assert!(config.validate().is_err());

        config.archive.interval = MIN_INTERVAL;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let err = AppConfig::from_yaml("store:\n  address: \"localhost:6379\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(ArchiveBackend::Local.to_string(), "local");
        assert_eq!(ArchiveBackend::Memory.as_ref(), "memory");
    }
}
