//! Configuration module.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Store settings (address, credentials, timeouts, pool)
//! - Archive settings (backend, table identifiers, interval)

mod app;
mod validation;

pub use app::{AppConfig, ArchiveBackend, ArchiveConfig, StoreConfig};
pub use validation::{ConfigError, expand_env_vars, validate_address};

// Re-export constants
pub use app::{DEFAULT_ARCHIVE_PATH, DEFAULT_INTERVAL, MIN_INTERVAL};
