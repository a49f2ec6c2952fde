//! Common utilities for the simulation binary.
//!
//! This module contains:
//! - Logger initialization
//! - The file-backed run configuration (simulation values plus logging and output settings)
//! - Output path validation

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use swarmloc::SimulationConfig;

/// Log verbosity as written in configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Logging section of a configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Log file path; logs go to stderr when absent
    pub file: Option<String>,
}

/// Everything a run needs: the simulation values plus how to log and where to write results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory for `trials.csv` and `positions.csv`; nothing is written when absent
    pub output: Option<String>,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

fn config_format(path: &Path) -> Result<ConfigFormat> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => Ok(ConfigFormat::Toml),
        Some("json") => Ok(ConfigFormat::Json),
        Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
        _ => bail!(
            "Unsupported configuration file '{}': expected .toml, .json, .yaml or .yml",
            path.display()
        ),
    }
}

impl RunConfig {
    /// Reads a configuration file, choosing the format from its extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = config_format(path)?;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration '{}'", path.display()))?;
        let config = match format {
            ConfigFormat::Toml => toml::from_str(&text)?,
            ConfigFormat::Json => serde_json::from_str(&text)?,
            ConfigFormat::Yaml => serde_yaml::from_str(&text)?,
        };
        Ok(config)
    }

    /// Writes the configuration, choosing the format from the extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = match config_format(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create '{}'", path.display()))?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// Initialize the logger with the specified configuration.
///
/// # Arguments
/// * `log_level` - Log level string (off, error, warn, info, debug, trace)
/// * `log_file` - Optional path to log file (logs to stderr if None)
///
/// # Errors
/// Returns an error if the log file cannot be opened or logger initialization fails.
pub fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<()> {
    let level = log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', defaulting to 'info'", log_level);
        log::LevelFilter::Info
    });

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let target = Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.try_init()?;
    Ok(())
}

/// Validate output path and create it as a directory if needed.
///
/// # Errors
/// Returns an error if the path exists but is not a directory, or creation fails.
pub fn validate_output_path(output: &Path) -> io::Result<()> {
    if output.exists() && !output.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Output path '{}' is not a directory.", output.display()),
        ));
    }
    if !output.exists() {
        std::fs::create_dir_all(output)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, LogLevel::Info);
        assert!(logging.file.is_none());
    }

    #[test]
    fn test_config_round_trips_through_every_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            simulation: SimulationConfig {
                num_agents: 9,
                seed: Some(5),
                ranging_range: Some(4.5),
                ..Default::default()
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                file: Some("logs/run.log".to_string()),
            },
            output: Some("out".to_string()),
        };
        for name in ["run.toml", "run.json", "run.yaml"] {
            let path = dir.path().join(name);
            config.to_file(&path).unwrap();
            assert_eq!(RunConfig::from_file(&path).unwrap(), config, "{name}");
        }
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[simulation]\nnum_agents = 7\nstd_noise = 0.0\n").unwrap();
        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.simulation.num_agents, 7);
        assert_eq!(config.simulation.std_noise, 0.0);
        assert_eq!(
            config.simulation.communication_range,
            SimulationConfig::default().communication_range
        );
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(RunConfig::from_file("config.ini").is_err());
    }

    #[test]
    fn test_output_path_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(validate_output_path(&file).is_err());
        let nested = dir.path().join("a/b");
        validate_output_path(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
