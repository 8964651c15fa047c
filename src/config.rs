// src/config.rs

//! Manages server configuration: loading, defaults, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9191
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_connections")]
    max_connections: usize,
    #[serde(default = "default_max_frame_length")]
    max_frame_length: usize,
    #[serde(default = "default_read_buffer_size")]
    read_buffer_size: usize,
    #[serde(with = "humantime_serde", default = "default_shutdown_grace_period")]
    shutdown_grace_period: Duration,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    9090
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_connections() -> usize {
    10000
}
fn default_max_frame_length() -> usize {
    16 * 1024 * 1024 // 16 MB
}
fn default_read_buffer_size() -> usize {
    8 * 1024
}
fn default_shutdown_grace_period() -> Duration {
    Duration::from_secs(5)
}

/// Represents the final, validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// The maximum number of simultaneously registered connections.
    pub max_connections: usize,
    /// The largest message payload the framed protocol accepts, in bytes.
    pub max_frame_length: usize,
    /// The size of each connection's socket read buffer, in bytes.
    pub read_buffer_size: usize,
    /// How long shutdown waits for background tasks to finish.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace_period: Duration,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_connections: default_max_connections(),
            max_frame_length: default_max_frame_length(),
            read_buffer_size: default_read_buffer_size(),
            shutdown_grace_period: default_shutdown_grace_period(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid configuration in '{path}'"))
    }

    /// Like [`Config::from_file`], but falls back to the defaults if the file
    /// does not exist.
    pub fn from_file_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            warn!("Config file '{}' not found, using defaults.", path);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;

        let config = Config {
            host: raw_config.host,
            port: raw_config.port,
            log_level: raw_config.log_level,
            max_connections: raw_config.max_connections,
            max_frame_length: raw_config.max_frame_length,
            read_buffer_size: raw_config.read_buffer_size,
            shutdown_grace_period: raw_config.shutdown_grace_period,
            metrics: raw_config.metrics,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_connections == 0 {
            return Err(anyhow!("max_connections cannot be 0"));
        }
        if self.max_frame_length == 0 {
            return Err(anyhow!("max_frame_length cannot be 0"));
        }
        if self.read_buffer_size == 0 {
            return Err(anyhow!("read_buffer_size cannot be 0"));
        }
        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }
        Ok(())
    }
}
