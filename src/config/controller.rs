//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_CONCURRENT_RECONCILES, DEFAULT_METRICS_PORT, DEFAULT_SERVER_POLL_INTERVAL_MS,
    DEFAULT_SERVER_STARTUP_TIMEOUT_SECS, DEFAULT_SYNC_PERIOD_SECS,
    DEFAULT_WATCH_RESTART_DELAY_SECS,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Fixed requeue interval applied after every reconcile pass (seconds)
    /// Used for successes and failures alike; the failure counter bounds retries
    pub sync_period_secs: u64,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciles: u16,
    /// Restrict the watch to a single namespace (all namespaces when unset)
    pub watch_namespace: Option<String>,
    /// Delay before restarting the watch after the controller stream ends (seconds)
    pub watch_restart_delay_secs: u64,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: LogFormat,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sync_period_secs: DEFAULT_SYNC_PERIOD_SECS,
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            watch_namespace: None,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            enable_metrics: true,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            sync_period_secs: parsed_or(&lookup, "SYNC_PERIOD_SECS", defaults.sync_period_secs),
            max_concurrent_reconciles: parsed_or(
                &lookup,
                "MAX_CONCURRENT_RECONCILES",
                defaults.max_concurrent_reconciles,
            ),
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty()),
            watch_restart_delay_secs: parsed_or(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT").map_or(defaults.log_format, |v| LogFormat::parse(&v)),
            enable_metrics: lookup("ENABLE_METRICS")
                .map_or(defaults.enable_metrics, |v| parse_bool(&v)),
        }
    }

    /// Fixed requeue interval
    #[must_use]
    pub fn sync_period(&self) -> Duration {
        Duration::from_secs(self.sync_period_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// HTTP server configuration for metrics and probes
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub metrics_port: u16,
    pub startup_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            metrics_port: parsed_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            startup_timeout_secs: parsed_or(
                &lookup,
                "SERVER_STARTUP_TIMEOUT_SECS",
                defaults.startup_timeout_secs,
            ),
            poll_interval_ms: parsed_or(
                &lookup,
                "SERVER_POLL_INTERVAL_MS",
                defaults.poll_interval_ms,
            ),
        }
    }

    #[must_use]
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Read a value through `lookup` and parse it, falling back to `default`
fn parsed_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Interpret a boolean environment value
fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = ControllerConfig::from_lookup(|_| None);
        assert_eq!(config.sync_period_secs, DEFAULT_SYNC_PERIOD_SECS);
        assert_eq!(config.max_concurrent_reconciles, 2);
        assert!(config.watch_namespace.is_none());
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.enable_metrics);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("SYNC_PERIOD_SECS", "15"),
            ("MAX_CONCURRENT_RECONCILES", "4"),
            ("WATCH_NAMESPACE", "web"),
            ("LOG_FORMAT", "JSON"),
            ("ENABLE_METRICS", "off"),
        ]));
        assert_eq!(config.sync_period(), Duration::from_secs(15));
        assert_eq!(config.max_concurrent_reconciles, 4);
        assert_eq!(config.watch_namespace.as_deref(), Some("web"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.enable_metrics);
    }

    #[test]
    fn test_unparseable_values_fall_back_to_defaults() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("SYNC_PERIOD_SECS", "soon"),
            ("WATCH_NAMESPACE", "  "),
        ]));
        assert_eq!(config.sync_period_secs, DEFAULT_SYNC_PERIOD_SECS);
        assert!(config.watch_namespace.is_none());
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        for v in ["true", "TRUE", "1", "yes", "on"] {
            assert!(parse_bool(v), "{v} should be true");
        }
        for v in ["false", "0", "no", "off", ""] {
            assert!(!parse_bool(v), "{v} should be false");
        }
    }

    #[test]
    fn test_server_config_port_override() {
        let config = ServerConfig::from_lookup(lookup_from(&[("METRICS_PORT", "9090")]));
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.startup_timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }
}
