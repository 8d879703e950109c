//! Configuration management for the screening web service

use crate::models::loader::DEFAULT_MODEL_NAMES;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file read when `ETHWEB_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on (`PORT` overrides)
    pub port: u16,
    /// Production mode hides error details and defaults logging to info
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            production: false,
        }
    }
}

/// Export directory configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding models/, preprocessors/ and results/
    pub export_root: PathBuf,
    /// Models to look for, in display order
    pub model_names: Vec<String>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            export_root: PathBuf::from("exports"),
            model_names: DEFAULT_MODEL_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Model runtime configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Number of threads for ONNX inference per model (default: 1)
    pub onnx_threads: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); debug mode lowers the default to debug
    pub level: Option<String>,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `ETHWEB_CONFIG` or the default path,
    /// then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var("ETHWEB_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load_from_path(path)?;
        config.apply_process_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific path; a missing file yields defaults.
    ///
    /// `ETHWEB__SECTION__KEY` variables override file values.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("ETHWEB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Apply the plain `PORT` and `APP_ENV` variables used by hosting platforms
    pub fn apply_process_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(env) = lookup("APP_ENV") {
            self.server.production = env.trim().eq_ignore_ascii_case("production");
        }
        Ok(())
    }

    /// Address the server binds to
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.server.host, self.server.port))
    }

    /// Effective log level
    pub fn log_level(&self) -> &str {
        match &self.logging.level {
            Some(level) => level,
            None if self.server.production => "info",
            None => "debug",
        }
    }
}
