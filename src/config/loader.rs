/// Configuration loading from TOML file
use std::path::Path;
use chrono_tz::Tz;
use crate::error::{Result, PipelineError};
use crate::types::Config;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::ConfigError(format!("Failed to read config file: {}", e)))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| PipelineError::ConfigError(format!("Failed to parse config: {}", e)))?;

    // Validate config
    validate_config(&config)?;

    Ok(config)
}

/// Resolve the display time zone name
pub fn display_timezone(config: &Config) -> Result<Tz> {
    config.display_timezone.parse::<Tz>().map_err(|_| {
        PipelineError::ConfigError(format!("Unknown display_timezone: {}", config.display_timezone))
    })
}

fn validate_config(config: &Config) -> Result<()> {
    // Validate thresholds
    if !config.more_threshold.is_finite() || config.more_threshold < 0.0 {
        return Err(PipelineError::ConfigError(
            format!("Invalid more_threshold: {}", config.more_threshold)
        ));
    }

    if !config.report_threshold.is_finite() || config.report_threshold < 0.0 {
        return Err(PipelineError::ConfigError(
            format!("Invalid report_threshold: {}", config.report_threshold)
        ));
    }

    // Validate locations
    if config.data_root.as_os_str().is_empty() {
        return Err(PipelineError::ConfigError("data_root is empty".to_string()));
    }

    if config.store_uri.trim().is_empty() {
        return Err(PipelineError::ConfigError("store_uri is empty".to_string()));
    }

    if let Some((scheme, _)) = config.store_uri.split_once("://") {
        if scheme != "sqlite" {
            return Err(PipelineError::ConfigError(
                format!("Unsupported store scheme: {}", scheme)
            ));
        }
    }

    display_timezone(config)?;

    Ok(())
}
