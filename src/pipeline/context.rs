/// Explicit per-run state handed to every pipeline step
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::data::BarStore;
use crate::types::Config;

/// Source of "today" for the cursor fallback
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Wall clock, UTC dates (aggregator file names are UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub struct RunContext<S: BarStore, C: Clock> {
    pub store: S,
    pub clock: C,
    pub config: Arc<Config>,
    pub run_id: Uuid,
    shutdown: Arc<AtomicBool>,
}

impl<S: BarStore, C: Clock> RunContext<S, C> {
    pub fn new(store: S, clock: C, config: Arc<Config>) -> Self {
        RunContext {
            store,
            clock,
            config,
            run_id: Uuid::new_v4(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned stop flag (e.g. set from a Ctrl+C handler)
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn stop_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
