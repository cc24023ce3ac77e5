//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.unwrap_or_else(|| PathBuf::from("herakles-host-exporter.yaml"));
    let content = generate_config(format, commented)?;

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Default configuration in `format`. Comments only apply to YAML.
pub fn generate_config(
    format: ConfigFormat,
    commented: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let content = render_config(&Config::default(), format)?;
    Ok(match format {
        ConfigFormat::Yaml if commented => add_config_comments(content),
        _ => content,
    })
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Host Exporter Configuration
# =====================================
#
# Precedence: CLI flags > EXPORTER_HOST / EXPORTER_PORT > this file > defaults
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind host (0.0.0.0 = all interfaces)
# port: 8000                   # HTTP port
#
# Collection
# ----------
# interval_seconds: 5          # Sleep between collection passes
# cpu_window_ms: 1000          # CPU measurement window (1-60000)
# mount_path: "/"              # Mount point for disk_*_bytes
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
