use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::services::reservas::ExpiryPolicy;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_RESERVA_VIGENCIA_DIAS: i64 = 3;
const DEFAULT_RESERVA_RENOVACION_DIAS: i64 = 7;
const DEFAULT_RESERVA_MAX_RENOVACIONES: i32 = 3;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    #[validate(custom = "validate_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Interval between expiry sweep passes (seconds)
    #[serde(default = "default_sweep_interval_secs")]
    #[validate(range(min = 1, message = "Sweep interval must be at least one second"))]
    pub sweep_interval_secs: u64,

    /// Initial reservation lifetime (days)
    #[serde(default = "default_reserva_vigencia_dias")]
    #[validate(range(min = 1))]
    pub reserva_vigencia_dias: i64,

    /// Renewal window granted from the moment of renewal (days)
    #[serde(default = "default_reserva_renovacion_dias")]
    #[validate(range(min = 1))]
    pub reserva_renovacion_dias: i64,

    /// Maximum number of renewals per reservation
    #[serde(default = "default_reserva_max_renovaciones")]
    #[validate(range(min = 0))]
    pub reserva_max_renovaciones: i32,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}
fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}
fn default_reserva_vigencia_dias() -> i64 {
    DEFAULT_RESERVA_VIGENCIA_DIAS
}
fn default_reserva_renovacion_dias() -> i64 {
    DEFAULT_RESERVA_RENOVACION_DIAS
}
fn default_reserva_max_renovaciones() -> i32 {
    DEFAULT_RESERVA_MAX_RENOVACIONES
}

fn validate_environment(value: &str) -> Result<(), ValidationError> {
    match value {
        "development" | "test" | "staging" | "production" => Ok(()),
        _ => Err(ValidationError::new("unknown_environment")),
    }
}

impl AppConfig {
    /// Minimal constructor used by tests and tooling.
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            sweep_interval_secs: default_sweep_interval_secs(),
            reserva_vigencia_dias: default_reserva_vigencia_dias(),
            reserva_renovacion_dias: default_reserva_renovacion_dias(),
            reserva_max_renovaciones: default_reserva_max_renovaciones(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    /// Permissive CORS is only acceptable in development or when explicitly
    /// opted into.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Reservation validity windows derived from configuration.
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::from_dias(
            self.reserva_vigencia_dias,
            self.reserva_renovacion_dias,
            self.reserva_max_renovaciones,
        )
    }
}

/// Loads configuration from layered files plus `APP__`-prefixed environment
/// overrides, then validates it.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, environment)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("Invalid configuration: {}", e)))?;

    info!(environment = %cfg.environment, "Configuration loaded");

    Ok(cfg)
}

/// Initializes the tracing subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        // A subscriber was already installed (e.g. by a test harness).
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        )
    }

    #[test]
    fn constructor_applies_defaults() {
        let cfg = test_config();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.sweep_interval_secs, 300);
        assert_eq!(cfg.reserva_vigencia_dias, 3);
        assert_eq!(cfg.reserva_renovacion_dias, 7);
        assert_eq!(cfg.reserva_max_renovaciones, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn environment_is_validated() {
        let mut cfg = test_config();
        cfg.environment = "galaxy".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn permissive_cors_only_in_dev_or_explicit() {
        let mut cfg = test_config();
        assert!(cfg.should_allow_permissive_cors());

        cfg.environment = "production".to_string();
        assert!(!cfg.should_allow_permissive_cors());

        cfg.cors_allow_any_origin = true;
        assert!(cfg.should_allow_permissive_cors());
    }

    #[test]
    fn expiry_policy_reflects_configured_windows() {
        let mut cfg = test_config();
        cfg.reserva_vigencia_dias = 2;
        cfg.reserva_renovacion_dias = 5;
        cfg.reserva_max_renovaciones = 1;

        let policy = cfg.expiry_policy();
        assert_eq!(policy.vigencia_inicial, Duration::days(2));
        assert_eq!(policy.vigencia_renovacion, Duration::days(5));
        assert_eq!(policy.max_renovaciones, 1);
    }
}
