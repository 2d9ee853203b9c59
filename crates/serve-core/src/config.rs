//! Configuration for the tensorserve server
//!
//! Supports YAML files, environment variables with the `TENSORSERVE_`
//! prefix, and command-line overrides applied by the binary.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub http_addr: SocketAddr,

    /// Degraded-state hysteresis settings
    pub degraded: DegradedConfig,

    /// Metrics settings
    pub metrics: MetricsConfig,

    /// Bound on how long `load()` may run before the model is declared failed
    pub load_timeout_seconds: u64,

    /// Run one warm-up prediction after a successful load
    pub warm_up: bool,
}

/// Degraded-state thresholds
///
/// The model leaves `Ready` for `Degraded` after `threshold` consecutive
/// prediction failures within a `window_seconds` sliding window, and
/// returns on the next success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedConfig {
    pub threshold: u32,
    pub window_seconds: u64,
}

impl Default for DegradedConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            window_seconds: 30,
        }
    }
}

/// Metrics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Latency histogram bucket boundaries in seconds, ascending
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            latency_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".parse().expect("static address is valid"),
            degraded: DegradedConfig::default(),
            metrics: MetricsConfig::default(),
            load_timeout_seconds: 30,
            warm_up: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration with precedence: environment variables over the
    /// configuration file over defaults.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            for candidate in &["./tensorserve.yaml", "/etc/tensorserve/config.yaml"] {
                builder = builder.add_source(config::File::with_name(candidate).required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TENSORSERVE")
                .separator("__")
                .try_parsing(true),
        );

        let parsed: Self = builder.build()?.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.degraded.threshold == 0 {
            return Err(ConfigError::Invalid(
                "degraded threshold must be > 0".to_string(),
            ));
        }

        if self.metrics.latency_buckets.is_empty() {
            return Err(ConfigError::Invalid(
                "latency buckets cannot be empty".to_string(),
            ));
        }

        let sorted = self
            .metrics
            .latency_buckets
            .windows(2)
            .all(|pair| pair[0] < pair[1]);
        if !sorted {
            return Err(ConfigError::Invalid(
                "latency buckets must be strictly ascending".to_string(),
            ));
        }

        if self.load_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "load timeout must be > 0 seconds".to_string(),
            ));
        }

        Ok(())
    }
}
