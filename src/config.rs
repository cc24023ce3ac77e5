//! Configuration management for herakles-host-exporter.
//!
//! Configuration is resolved with the precedence CLI > environment > config
//! file > defaults. The environment variables `EXPORTER_HOST` and
//! `EXPORTER_PORT` are read once at startup; an unparsable port is fatal.

use crate::cli::{Args, ConfigFormat, LogLevel};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_INTERVAL_SECONDS: u64 = 5;
pub const DEFAULT_CPU_WINDOW_MS: u64 = 1000;
pub const DEFAULT_MOUNT_PATH: &str = "/";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Upper bound for the CPU measurement window.
pub const MAX_CPU_WINDOW_MS: u64 = 60_000;

pub const ENV_HOST: &str = "EXPORTER_HOST";
pub const ENV_PORT: &str = "EXPORTER_PORT";

/// Default config file locations, probed in order.
const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "/etc/herakles/host-exporter.yaml",
    "/etc/herakles/host-exporter.yml",
    "./herakles-host-exporter.yaml",
    "./herakles-host-exporter.yml",
];

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid port in {origin}: '{value}' is not an integer in 0-65535")]
    InvalidPort { origin: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

/// Exporter configuration. Unset fields fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub bind: Option<String>,
    pub port: Option<u16>,

    // Collection
    #[serde(alias = "interval-seconds")]
    pub interval_seconds: Option<u64>,
    #[serde(alias = "cpu-window-ms")]
    pub cpu_window_ms: Option<u64>,
    #[serde(alias = "mount-path")]
    pub mount_path: Option<PathBuf>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            interval_seconds: Some(DEFAULT_INTERVAL_SECONDS),
            cpu_window_ms: Some(DEFAULT_CPU_WINDOW_MS),
            mount_path: Some(PathBuf::from(DEFAULT_MOUNT_PATH)),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

impl Config {
    pub fn bind_addr(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.unwrap_or(DEFAULT_INTERVAL_SECONDS))
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.cpu_window_ms.unwrap_or(DEFAULT_CPU_WINDOW_MS))
    }

    pub fn mount_path(&self) -> &Path {
        self.mount_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_MOUNT_PATH))
    }

    /// Effective log level; unknown names are caught by validation.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(LogLevel::from_name)
            .unwrap_or(LogLevel::Info)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.bind_addr().trim().is_empty() {
        return Err(ConfigError::Invalid("bind address must not be empty".into()));
    }

    if cfg.interval_seconds == Some(0) {
        return Err(ConfigError::Invalid(
            "interval_seconds must be at least 1".into(),
        ));
    }

    match cfg.cpu_window_ms {
        Some(0) => {
            return Err(ConfigError::Invalid("cpu_window_ms must be at least 1".into()));
        }
        Some(ms) if ms > MAX_CPU_WINDOW_MS => {
            return Err(ConfigError::Invalid(format!(
                "cpu_window_ms must not exceed {} (got {})",
                MAX_CPU_WINDOW_MS, ms
            )));
        }
        _ => {}
    }

    if !cfg.mount_path().is_absolute() {
        return Err(ConfigError::Invalid(format!(
            "mount_path must be absolute, got '{}'",
            cfg.mount_path().display()
        )));
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_name(level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
                level
            )));
        }
    }

    Ok(())
}

/// Applies `EXPORTER_HOST` / `EXPORTER_PORT` from `lookup` onto `config`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_HOST) {
        config.bind = Some(host);
    }

    if let Some(raw) = lookup(ENV_PORT) {
        let port = raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort {
                origin: ENV_PORT,
                value: raw.clone(),
            })?;
        config.port = Some(port);
    }

    Ok(())
}

/// Resolves configuration from CLI args, the process environment, config
/// file and defaults.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    resolve_config_with_env(args, |key| std::env::var(key).ok())
}

/// Same as [`resolve_config`] with an explicit environment lookup.
pub fn resolve_config_with_env<F>(args: &Args, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    apply_env_overrides(&mut config, env)?;

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(interval) = args.interval {
        config.interval_seconds = Some(interval);
    }
    if let Some(window) = args.cpu_window_ms {
        config.cpu_window_ms = Some(window);
    }
    if let Some(mount) = &args.mount_path {
        config.mount_path = Some(mount.clone());
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(format!("{:?}", level).to_ascii_lowercase());
    }

    Ok(config)
}

/// Loads a config file; without an explicit path the default locations are
/// probed and a missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(found) => PathBuf::from(found),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let parse_err = |reason: String| ConfigError::Parse {
        path: path.display().to_string(),
        reason,
    };

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
    };

    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Serializes configuration in the requested format.
pub fn render_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
