//! Configuration loading for the Faultline service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `FAULTLINE_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Application configuration derived from `FAULTLINE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operator_tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub viewer_tokens: Vec<String>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub circuit: CircuitConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub connectors: ConnectorsConfig,
}

/// Retry policy tuning shared by all connectors.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial try (default: 3)
    ///
    /// Environment variable: `FAULTLINE_RETRY_MAX_RETRIES`
    #[serde(default = "default_retry_max_retries")]
    #[schema(example = 3)]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds (default: 1000)
    ///
    /// Environment variable: `FAULTLINE_RETRY_INITIAL_DELAY_MS`
    #[serde(default = "default_retry_initial_delay_ms")]
    #[schema(example = 1000)]
    pub initial_delay_ms: u64,

    /// Upper bound for backoff delays in milliseconds (default: 30000)
    ///
    /// Environment variable: `FAULTLINE_RETRY_MAX_DELAY_MS`
    #[serde(default = "default_retry_max_delay_ms")]
    #[schema(example = 30000)]
    pub max_delay_ms: u64,

    /// Exponential base for the backoff curve (default: 2.0)
    ///
    /// Environment variable: `FAULTLINE_RETRY_EXPONENTIAL_BASE`
    #[serde(default = "default_retry_exponential_base")]
    #[schema(example = 2.0)]
    pub exponential_base: f64,

    /// Whether delays are multiplied by a uniform factor in [0.9, 1.1]
    /// (default: true)
    ///
    /// Environment variable: `FAULTLINE_RETRY_JITTER`
    #[serde(default = "default_retry_jitter")]
    pub jitter: bool,
}

/// Circuit breaker tuning shared by all connectors.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CircuitConfig {
    /// Consecutive failures before the circuit opens (default: 5)
    ///
    /// Environment variable: `FAULTLINE_CIRCUIT_FAILURE_THRESHOLD`
    #[serde(default = "default_circuit_failure_threshold")]
    #[schema(example = 5)]
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before allowing a half-open probe
    /// (default: 60)
    ///
    /// Environment variable: `FAULTLINE_CIRCUIT_RECOVERY_TIMEOUT_SECONDS`
    #[serde(default = "default_circuit_recovery_timeout_seconds")]
    #[schema(example = 60)]
    pub recovery_timeout_seconds: u64,

    /// Consecutive half-open successes before the circuit closes (default: 2)
    ///
    /// Environment variable: `FAULTLINE_CIRCUIT_SUCCESS_THRESHOLD`
    #[serde(default = "default_circuit_success_threshold")]
    #[schema(example = 2)]
    pub success_threshold: u32,
}

/// Background ingestion scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SchedulerConfig {
    /// Whether the background ingest loops run at all (default: true)
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// Base interval between collects per connector in seconds (default: 300)
    #[serde(default = "default_scheduler_interval_seconds")]
    pub interval_seconds: u64,

    /// Minimum jitter applied to the interval, as a fraction (default: 0.0)
    #[serde(default = "default_scheduler_jitter_pct_min")]
    pub jitter_pct_min: f64,

    /// Maximum jitter applied to the interval, as a fraction (default: 0.2)
    #[serde(default = "default_scheduler_jitter_pct_max")]
    pub jitter_pct_max: f64,

    /// Deadline for a single collect() invocation in seconds (default: 30)
    #[serde(default = "default_collect_timeout_seconds")]
    pub collect_timeout_seconds: u64,
}

/// Per-connector source settings. A connector is only registered when its
/// source location is configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ConnectorsConfig {
    /// Path to the git repository to monitor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_repo_path: Option<String>,

    /// Number of recent commits fetched per collect
    #[serde(default = "default_git_lookback_commits")]
    pub git_lookback_commits: u32,

    /// HTTP endpoint returning recent CI runs as a JSON array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_endpoint: Option<String>,

    /// Path to a JSON-lines structured log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_path: Option<String>,

    /// HTTP endpoint returning a metric-series map as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_endpoint: Option<String>,

    /// HTTP endpoint returning recent traces as a JSON array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces_endpoint: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            operator_tokens: Vec::new(),
            viewer_tokens: Vec::new(),
            retry: RetryConfig::default(),
            circuit: CircuitConfig::default(),
            scheduler: SchedulerConfig::default(),
            connectors: ConnectorsConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_retry_max_retries(),
            initial_delay_ms: default_retry_initial_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
            exponential_base: default_retry_exponential_base(),
            jitter: default_retry_jitter(),
        }
    }
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_circuit_failure_threshold(),
            recovery_timeout_seconds: default_circuit_recovery_timeout_seconds(),
            success_threshold: default_circuit_success_threshold(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            interval_seconds: default_scheduler_interval_seconds(),
            jitter_pct_min: default_scheduler_jitter_pct_min(),
            jitter_pct_max: default_scheduler_jitter_pct_max(),
            collect_timeout_seconds: default_collect_timeout_seconds(),
        }
    }
}

impl RetryConfig {
    /// Validate retry configuration bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > 10 {
            return Err(ConfigError::InvalidRetryMaxRetries {
                value: self.max_retries,
            });
        }

        if self.initial_delay_ms == 0 || self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidRetryDelayBounds {
                initial: self.initial_delay_ms,
                max: self.max_delay_ms,
            });
        }

        if self.exponential_base < 1.0 {
            return Err(ConfigError::InvalidRetryBase {
                value: self.exponential_base,
            });
        }

        Ok(())
    }
}

impl CircuitConfig {
    /// Validate circuit breaker configuration bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::InvalidCircuitThreshold {
                field: "failure threshold",
                value: self.failure_threshold,
            });
        }

        if self.success_threshold == 0 {
            return Err(ConfigError::InvalidCircuitThreshold {
                field: "success threshold",
                value: self.success_threshold,
            });
        }

        if self.recovery_timeout_seconds == 0 {
            return Err(ConfigError::InvalidCircuitRecoveryTimeout {
                value: self.recovery_timeout_seconds,
            });
        }

        Ok(())
    }
}

impl SchedulerConfig {
    /// Validate scheduler configuration bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_seconds < 10 {
            return Err(ConfigError::InvalidSchedulerInterval {
                value: self.interval_seconds,
            });
        }

        if !(0.0..=1.0).contains(&self.jitter_pct_min) || !(0.0..=1.0).contains(&self.jitter_pct_max)
        {
            return Err(ConfigError::InvalidSchedulerJitterRange {
                min: self.jitter_pct_min,
                max: self.jitter_pct_max,
            });
        }

        if self.jitter_pct_min > self.jitter_pct_max {
            return Err(ConfigError::InvalidSchedulerJitterInverted {
                min: self.jitter_pct_min,
                max: self.jitter_pct_max,
            });
        }

        if self.collect_timeout_seconds == 0 {
            return Err(ConfigError::InvalidCollectTimeout {
                value: self.collect_timeout_seconds,
            });
        }

        Ok(())
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns a redacted JSON representation (token lists are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.operator_tokens.is_empty() {
            config.operator_tokens = vec!["[REDACTED]".to_string()];
        }
        if !config.viewer_tokens.is_empty() {
            config.viewer_tokens = vec!["[REDACTED]".to_string()];
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings
    /// are missing or out of bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operator_tokens.is_empty() {
            return Err(ConfigError::MissingOperatorTokens);
        }

        self.retry.validate()?;
        self.circuit.validate()?;
        self.scheduler.validate()?;

        if self.connectors.git_lookback_commits == 0 {
            return Err(ConfigError::InvalidGitLookback {
                value: self.connectors.git_lookback_commits,
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://data/faultline.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_retry_max_retries() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

fn default_retry_exponential_base() -> f64 {
    2.0
}

fn default_retry_jitter() -> bool {
    true
}

fn default_circuit_failure_threshold() -> u32 {
    5
}

fn default_circuit_recovery_timeout_seconds() -> u64 {
    60
}

fn default_circuit_success_threshold() -> u32 {
    2
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_scheduler_interval_seconds() -> u64 {
    300 // 5 minutes
}

fn default_scheduler_jitter_pct_min() -> f64 {
    0.0
}

fn default_scheduler_jitter_pct_max() -> f64 {
    0.2
}

fn default_collect_timeout_seconds() -> u64 {
    30
}

fn default_git_lookback_commits() -> u32 {
    10
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error(
        "no operator tokens configured; set FAULTLINE_OPERATOR_TOKEN or FAULTLINE_OPERATOR_TOKENS"
    )]
    MissingOperatorTokens,
    #[error("retry max retries must not exceed 10, got {value}")]
    InvalidRetryMaxRetries { value: u32 },
    #[error("retry initial delay ({initial}ms) must be positive and not exceed max delay ({max}ms)")]
    InvalidRetryDelayBounds { initial: u64, max: u64 },
    #[error("retry exponential base must be at least 1.0, got {value}")]
    InvalidRetryBase { value: f64 },
    #[error("circuit {field} must be at least 1, got {value}")]
    InvalidCircuitThreshold { field: &'static str, value: u32 },
    #[error("circuit recovery timeout must be positive, got {value}")]
    InvalidCircuitRecoveryTimeout { value: u64 },
    #[error("scheduler interval must be at least 10 seconds, got {value}")]
    InvalidSchedulerInterval { value: u64 },
    #[error("scheduler jitter percentages are out of bounds (min: {min}, max: {max})")]
    InvalidSchedulerJitterRange { min: f64, max: f64 },
    #[error("scheduler jitter minimum ({min}) cannot be greater than maximum ({max})")]
    InvalidSchedulerJitterInverted { min: f64, max: f64 },
    #[error("collect timeout must be positive, got {value}")]
    InvalidCollectTimeout { value: u64 },
    #[error("git lookback commit count must be at least 1, got {value}")]
    InvalidGitLookback { value: u32 },
}

/// Loads configuration using layered `.env` files and `FAULTLINE_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates the configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("FAULTLINE_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                if profile == "test" {
                    "sqlite::memory:".to_string()
                } else {
                    default_database_url()
                }
            });
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);

        // Operator tokens: single token or comma-separated list.
        let operator_tokens = if let Some(tokens) = layered.remove("OPERATOR_TOKENS") {
            split_token_list(&tokens)
        } else if let Some(token) = layered.remove("OPERATOR_TOKEN") {
            vec![token]
        } else {
            Vec::new()
        };

        let viewer_tokens = layered
            .remove("VIEWER_TOKENS")
            .map(|tokens| split_token_list(&tokens))
            .unwrap_or_default();

        let retry = RetryConfig {
            max_retries: layered
                .remove("RETRY_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_retry_max_retries),
            initial_delay_ms: layered
                .remove("RETRY_INITIAL_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_retry_initial_delay_ms),
            max_delay_ms: layered
                .remove("RETRY_MAX_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_retry_max_delay_ms),
            exponential_base: layered
                .remove("RETRY_EXPONENTIAL_BASE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_retry_exponential_base),
            jitter: layered
                .remove("RETRY_JITTER")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_retry_jitter),
        };

        let circuit = CircuitConfig {
            failure_threshold: layered
                .remove("CIRCUIT_FAILURE_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_circuit_failure_threshold),
            recovery_timeout_seconds: layered
                .remove("CIRCUIT_RECOVERY_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_circuit_recovery_timeout_seconds),
            success_threshold: layered
                .remove("CIRCUIT_SUCCESS_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_circuit_success_threshold),
        };

        let scheduler = SchedulerConfig {
            enabled: layered
                .remove("SCHEDULER_ENABLED")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_scheduler_enabled),
            interval_seconds: layered
                .remove("SCHEDULER_INTERVAL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_scheduler_interval_seconds),
            jitter_pct_min: layered
                .remove("SCHEDULER_JITTER_PCT_MIN")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_scheduler_jitter_pct_min),
            jitter_pct_max: layered
                .remove("SCHEDULER_JITTER_PCT_MAX")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_scheduler_jitter_pct_max),
            collect_timeout_seconds: layered
                .remove("COLLECT_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_collect_timeout_seconds),
        };

        let connectors = ConnectorsConfig {
            git_repo_path: layered.remove("GIT_REPO_PATH").filter(|v| !v.is_empty()),
            git_lookback_commits: layered
                .remove("GIT_LOOKBACK_COMMITS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_git_lookback_commits),
            ci_endpoint: layered.remove("CI_ENDPOINT").filter(|v| !v.is_empty()),
            logs_path: layered.remove("LOGS_PATH").filter(|v| !v.is_empty()),
            metrics_endpoint: layered.remove("METRICS_ENDPOINT").filter(|v| !v.is_empty()),
            traces_endpoint: layered.remove("TRACES_ENDPOINT").filter(|v| !v.is_empty()),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            operator_tokens,
            viewer_tokens,
            retry,
            circuit,
            scheduler,
            connectors,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("FAULTLINE_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("FAULTLINE_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn split_token_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_validation_bounds() {
        let valid = RetryConfig::default();
        assert!(valid.validate().is_ok());

        let inverted = RetryConfig {
            initial_delay_ms: 60_000,
            max_delay_ms: 30_000,
            ..RetryConfig::default()
        };
        assert!(inverted.validate().is_err());

        let shrinking = RetryConfig {
            exponential_base: 0.5,
            ..RetryConfig::default()
        };
        assert!(shrinking.validate().is_err());
    }

    #[test]
    fn test_circuit_validation_bounds() {
        assert!(CircuitConfig::default().validate().is_ok());

        let zero_failures = CircuitConfig {
            failure_threshold: 0,
            ..CircuitConfig::default()
        };
        assert!(zero_failures.validate().is_err());

        let zero_timeout = CircuitConfig {
            recovery_timeout_seconds: 0,
            ..CircuitConfig::default()
        };
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_config_requires_operator_tokens() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingOperatorTokens)
        ));

        let config = AppConfig {
            operator_tokens: vec!["tok".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redacted_json_hides_tokens() {
        let config = AppConfig {
            operator_tokens: vec!["super-secret".to_string()],
            viewer_tokens: vec!["also-secret".to_string()],
            ..Default::default()
        };

        let json = config.redacted_json().unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("also-secret"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn test_split_token_list() {
        assert_eq!(
            split_token_list("a, b ,,c"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(split_token_list("").is_empty());
    }
}
