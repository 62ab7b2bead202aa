//! # Service Configuration
//!
//! Configuration for the order service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BREWLINE_DB_PATH=/var/lib/brewline/brewline.db                     │
//! │     BREWLINE_PICKUP_LEAD_MINUTES=15                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/order-service/order-service.toml (Linux)                 │
//! │     ~/Library/Application Support/com.brewline.order-service/ (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! name = "Brewline Downtown"
//! currency_symbol = "$"
//! currency_code = "USD"
//!
//! [database]
//! path = "/var/lib/brewline/brewline.db"
//! max_connections = 5
//!
//! [orders]
//! min_pickup_lead_minutes = 10
//! max_pickup_ahead_hours = 12
//! tracking_code_length = 8
//! queue_limit = 50
//!
//! [retry]
//! initial_backoff_ms = 50
//! max_backoff_ms = 1000
//! max_elapsed_ms = 5000
//! multiplier = 2.0
//!
//! [logging]
//! level = "info,brewline=debug"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use brewline_core::fulfillment::MAX_TRACKING_CODE_LENGTH;
use brewline_core::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;

/// Database file name inside the platform data directory.
const DATABASE_FILE: &str = "brewline.db";

/// Config file name inside the platform config directory.
const CONFIG_FILE: &str = "order-service.toml";

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Store identity and money formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// ISO 4217 code, informational.
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
}

fn default_store_name() -> String {
    "Brewline".to_string()
}
fn default_currency_symbol() -> String {
    "$".to_string()
}
fn default_currency_code() -> String {
    "USD".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: default_store_name(),
            currency_symbol: default_currency_symbol(),
            currency_code: default_currency_code(),
        }
    }
}

/// Database location and pool sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// `None` means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Order intake rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSettings {
    /// Earliest pickup, in minutes from now.
    #[serde(default = "default_min_pickup_lead")]
    pub min_pickup_lead_minutes: i64,

    /// Latest pickup, in hours from now.
    #[serde(default = "default_max_pickup_ahead")]
    pub max_pickup_ahead_hours: i64,

    #[serde(default = "default_tracking_code_length")]
    pub tracking_code_length: usize,

    /// Max orders returned by a staff queue listing.
    #[serde(default = "default_queue_limit")]
    pub queue_limit: u32,
}

fn default_min_pickup_lead() -> i64 {
    10
}
fn default_max_pickup_ahead() -> i64 {
    12
}
fn default_tracking_code_length() -> usize {
    brewline_core::TRACKING_CODE_LENGTH
}
fn default_queue_limit() -> u32 {
    50
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            min_pickup_lead_minutes: default_min_pickup_lead(),
            max_pickup_ahead_hours: default_max_pickup_ahead(),
            tracking_code_length: default_tracking_code_length(),
            queue_limit: default_queue_limit(),
        }
    }
}

/// Backoff around transient database failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Total time budget before the last error is surfaced.
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_initial_backoff() -> u64 {
    50
}
fn default_max_backoff() -> u64 {
    1_000
}
fn default_max_elapsed() -> u64 {
    5_000
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            max_elapsed_ms: default_max_elapsed(),
            multiplier: default_multiplier(),
        }
    }
}

/// Log filter used when `RUST_LOG` is unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: Option<String>,
}

// =============================================================================
// App Configuration
// =============================================================================

/// Complete order service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub orders: OrderSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading order service config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load order service config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a config file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Order service config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.name.trim().is_empty() {
            return Err(ConfigError::Invalid("store.name must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        let orders = &self.orders;
        if orders.min_pickup_lead_minutes < 0 {
            return Err(ConfigError::Invalid(
                "orders.min_pickup_lead_minutes must not be negative".into(),
            ));
        }
        if orders.max_pickup_ahead_hours * 60 <= orders.min_pickup_lead_minutes {
            return Err(ConfigError::Invalid(
                "orders.max_pickup_ahead_hours must leave a pickup window after the lead time"
                    .into(),
            ));
        }
        if !(4..=MAX_TRACKING_CODE_LENGTH).contains(&orders.tracking_code_length) {
            return Err(ConfigError::Invalid(format!(
                "orders.tracking_code_length must be between 4 and {}, got {}",
                MAX_TRACKING_CODE_LENGTH, orders.tracking_code_length
            )));
        }
        if orders.queue_limit == 0 {
            return Err(ConfigError::Invalid(
                "orders.queue_limit must be greater than 0".into(),
            ));
        }

        let retry = &self.retry;
        if retry.initial_backoff_ms == 0 || retry.initial_backoff_ms > retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms must be positive and at most retry.max_backoff_ms"
                    .into(),
            ));
        }
        if retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.multiplier must be at least 1.0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `BREWLINE_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup` (the environment in production).
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("BREWLINE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup("BREWLINE_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(lead) = lookup("BREWLINE_PICKUP_LEAD_MINUTES") {
            match lead.parse::<i64>() {
                Ok(minutes) => self.orders.min_pickup_lead_minutes = minutes,
                Err(_) => warn!(value = %lead, "Ignoring invalid BREWLINE_PICKUP_LEAD_MINUTES"),
            }
        }

        if let Some(length) = lookup("BREWLINE_TRACKING_CODE_LENGTH") {
            match length.parse::<usize>() {
                Ok(len) => self.orders.tracking_code_length = len,
                Err(_) => warn!(value = %length, "Ignoring invalid BREWLINE_TRACKING_CODE_LENGTH"),
            }
        }

        if let Some(elapsed) = lookup("BREWLINE_RETRY_MAX_ELAPSED_MS") {
            match elapsed.parse::<u64>() {
                Ok(ms) => self.retry.max_elapsed_ms = ms,
                Err(_) => warn!(value = %elapsed, "Ignoring invalid BREWLINE_RETRY_MAX_ELAPSED_MS"),
            }
        }

        if let Some(level) = lookup("BREWLINE_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "brewline", "order-service")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolved database path: configured, else the platform data directory,
    /// else the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }

        directories::ProjectDirs::from("com", "brewline", "order-service")
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }

    /// Formats an amount with the store's currency symbol.
    pub fn format_money(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            self.store.currency_symbol,
            amount.dollars().abs(),
            amount.cents_part()
        )
    }

    /// Backoff policy for database calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(self.retry.initial_backoff_ms),
            max_interval: Duration::from_millis(self.retry.max_backoff_ms),
            max_elapsed: Duration::from_millis(self.retry.max_elapsed_ms),
            multiplier: self.retry.multiplier,
        }
    }
}
