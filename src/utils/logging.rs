/// Tracing subscriber setup
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::{PipelineError, Result};
use crate::types::{LogFormat, LoggingConfig};

/// Install the global subscriber. RUST_LOG wins over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match (&config.file, config.format) {
        (None, LogFormat::Pretty) => builder.try_init(),
        (None, LogFormat::Json) => builder.json().try_init(),
        (Some(path), LogFormat::Pretty) => builder
            .with_writer(Mutex::new(open_log_file(path)?))
            .with_ansi(false)
            .try_init(),
        (Some(path), LogFormat::Json) => builder
            .json()
            .with_writer(Mutex::new(open_log_file(path)?))
            .try_init(),
    };

    installed.map_err(|e| PipelineError::ConfigError(format!("Failed to init logging: {}", e)))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(file)
}
