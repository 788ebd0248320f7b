/// Outcome of one pipeline run
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::cursor::StartPoint;
use crate::types::Spike;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub today: NaiveDate,
    pub start: StartPoint,

    // File counters
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub persistence_failures: usize,

    // Row counters
    pub ticks_parsed: usize,
    pub rows_skipped: usize,
    pub bars_computed: usize,
    pub bars_inserted: usize,

    /// Spikes in discovery order
    pub spikes: Vec<Spike>,

    /// Latest stored bucket after the run
    pub watermark: Option<DateTime<Utc>>,

    /// Stopped at a file boundary before all files were seen
    pub interrupted: bool,
}

impl RunReport {
    pub fn new(run_id: Uuid, today: NaiveDate, start: StartPoint) -> Self {
        RunReport {
            run_id,
            today,
            start,
            files_discovered: 0,
            files_processed: 0,
            files_failed: 0,
            persistence_failures: 0,
            ticks_parsed: 0,
            rows_skipped: 0,
            bars_computed: 0,
            bars_inserted: 0,
            spikes: Vec::new(),
            watermark: None,
            interrupted: false,
        }
    }

    /// Watermark as wall-clock time in `tz`, for display only
    pub fn watermark_in(&self, tz: Tz) -> Option<String> {
        self.watermark
            .map(|ts| ts.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
