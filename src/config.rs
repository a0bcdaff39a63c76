//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - shardexec.toml (default configuration)
//! - shardexec.local.toml (git-ignored local overrides)
//! - Environment variables (SHARDEXEC_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # shardexec.toml
//! [executor]
//! max_threads = 16
//! isolation = "fail_fast"
//! exception_thrown = false
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! SHARDEXEC_EXECUTOR__MAX_THREADS=8
//! SHARDEXEC_LOGGING__FORMAT=json
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::execution::{ExecutorError, ExecutorResult};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Statement executor and worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Number of worker threads for parallel unit execution
    /// 0 = use all available CPU cores
    #[serde(default)]
    pub max_threads: usize,

    /// Worker thread names are `{prefix}-{index}`
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,

    /// What the worker pool does with sibling units once one unit fails
    #[serde(default)]
    pub isolation: IsolationMode,

    /// Propagate unit failures to the caller (true) or suppress them into
    /// neutral results (false)
    #[serde(default = "default_true")]
    pub exception_thrown: bool,

    /// Record per-operation execution timers
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

/// Sibling-unit behavior when a unit fails under the propagate policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IsolationMode {
    /// Every submitted unit runs to completion; the failure of the
    /// lowest-indexed failing unit is reported afterwards
    #[default]
    WaitForAll,

    /// Units not yet started are skipped once a failure is observed.
    /// Units already running finish; which failure is reported is unspecified
    FailFast,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_thread_name_prefix() -> String {
    "shardexec-worker".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. shardexec.toml (base configuration)
    /// 2. shardexec.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (SHARDEXEC_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("shardexec.toml"))
            .merge(Toml::file("shardexec.local.toml"))
            .merge(Env::prefixed("SHARDEXEC_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SHARDEXEC_").split("__"))
            .extract()
    }

    /// Reject settings the executor cannot run with
    pub fn validate(&self) -> ExecutorResult<()> {
        self.executor.validate()?;
        self.logging.validate()
    }
}

impl ExecutorConfig {
    /// Worker count after resolving 0 to the number of CPU cores
    pub fn effective_threads(&self) -> usize {
        if self.max_threads == 0 {
            num_cpus::get()
        } else {
            self.max_threads
        }
    }

    pub fn validate(&self) -> ExecutorResult<()> {
        if self.thread_name_prefix.trim().is_empty() {
            return Err(ExecutorError::Config(
                "executor.thread_name_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> ExecutorResult<()> {
        match self.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(ExecutorError::Config(format!(
                "logging.format must be 'text' or 'json', got '{other}'"
            ))),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            max_threads: 0, // 0 = use all available CPU cores
            thread_name_prefix: default_thread_name_prefix(),
            isolation: IsolationMode::default(),
            exception_thrown: true,
            metrics_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_executor_config() {
        let config = Config::default();
        assert_eq!(config.executor.max_threads, 0);
        assert_eq!(config.executor.thread_name_prefix, "shardexec-worker");
        assert_eq!(config.executor.isolation, IsolationMode::WaitForAll);
        assert!(config.executor.exception_thrown);
        assert!(config.executor.metrics_enabled);
    }

    #[test]
    fn test_default_logging_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_effective_threads() {
        let mut executor = ExecutorConfig::default();
        assert_eq!(executor.effective_threads(), num_cpus::get());
        executor.max_threads = 3;
        assert_eq!(executor.effective_threads(), 3);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let mut config = Config::default();
        config.executor.isolation = IsolationMode::FailFast;
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[executor]"));
        assert!(toml_str.contains("[logging]"));

        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.executor.isolation, IsolationMode::FailFast);
        assert_eq!(back.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let back: Config = toml::from_str("[executor]\nmax_threads = 2\n").unwrap();
        assert_eq!(back.executor.max_threads, 2);
        assert!(back.executor.exception_thrown);
        assert_eq!(back.logging.format, "text");
    }

    #[test]
    fn test_isolation_mode_serde() {
        let json = serde_json::to_string(&IsolationMode::WaitForAll).unwrap();
        assert_eq!(json, "\"wait_for_all\"");
        let json = serde_json::to_string(&IsolationMode::FailFast).unwrap();
        assert_eq!(json, "\"fail_fast\"");
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let mut config = Config::default();
        config.executor.thread_name_prefix = "  ".to_string();
        assert!(matches!(config.validate(), Err(ExecutorError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("xml"));
    }
}
