/// Core type definitions for the spike pipeline
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// One trade or liquidation event read from an aggregator snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
    /// +1 buy, -1 sell
    pub direction: i32,
    pub liquidation: i32,
}

/// One-minute aggregate, keyed by `bucket_start`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBar {
    pub bucket_start: DateTime<Utc>,
    /// Price of the last tick in the bucket
    pub close: f64,
    /// Sum of gated tick volumes
    pub volume: f64,
    /// Max direction seen
    pub direction: i32,
    /// Min liquidation flag seen
    pub liquidation: i32,
}

/// Bar whose volume reached the reporting threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    pub source_label: String,
    pub bucket_start: DateTime<Utc>,
    pub close: f64,
    pub volume: f64,
}

impl std::fmt::Display for Spike {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<25} - {} - {} - {}",
            self.source_label,
            self.bucket_start.format("%Y-%m-%d %H:%M:%S"),
            self.close,
            self.volume
        )
    }
}

/// Configuration for a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Thresholds
    /// Minimum per-tick volume counted in a bucket
    pub more_threshold: f64,
    /// Minimum bucket volume reported as a spike
    pub report_threshold: f64,

    // Locations
    pub data_root: PathBuf,
    pub store_uri: String,
    pub report_path: Option<PathBuf>,

    /// Fixed start date; when set the store watermark is not consulted
    pub start_date: Option<NaiveDate>,

    /// Time zone used only when printing the final watermark.
    /// The default `Etc/GMT-3` is a fixed UTC+3.
    pub display_timezone: String,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            more_threshold: 10.0,
            report_threshold: 200.0,
            data_root: PathBuf::from("data"),
            store_uri: "sqlite://DB/btc.db".to_string(),
            report_path: None,
            start_date: None,
            display_timezone: "Etc/GMT-3".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}
