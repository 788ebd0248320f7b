/// Incremental start point derived from the store watermark
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::data::BarStore;
use crate::error::PipelineError;
use crate::pipeline::context::Clock;
use crate::utils::time::CURSOR_OVERLAP_MINUTES;

/// Why the run starts where it does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartOrigin {
    /// Latest stored bucket, minus the overlap
    Store { latest: DateTime<Utc> },
    /// Store holds no bars yet
    EmptyStore,
    /// Store could not be queried
    StoreError { reason: String },
    /// `start_date` set in configuration
    Configured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPoint {
    pub date: NaiveDate,
    pub origin: StartOrigin,
}

/// First date still to be processed. Never fails: an empty or unreadable
/// store degrades to today.
pub fn compute_start<S: BarStore, C: Clock>(store: &S, clock: &C) -> StartPoint {
    match store.get_latest() {
        Ok(Some(bar)) => {
            let date = (bar.bucket_start - TimeDelta::minutes(CURSOR_OVERLAP_MINUTES)).date_naive();
            info!("Found last record in store ({}), start date set to: {}", bar.bucket_start, date);
            StartPoint {
                date,
                origin: StartOrigin::Store { latest: bar.bucket_start },
            }
        }
        Ok(None) => {
            let date = clock.today();
            info!("No records found in store, starting from today: {}", date);
            StartPoint { date, origin: StartOrigin::EmptyStore }
        }
        Err(e) => {
            let fallback = PipelineError::CursorFallback(e.to_string());
            let date = clock.today();
            error!("{} ({}), starting from today: {}", fallback, fallback.error_code(), date);
            StartPoint {
                date,
                origin: StartOrigin::StoreError { reason: e.to_string() },
            }
        }
    }
}
