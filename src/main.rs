/// Main entry point: one incremental ingestion run
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use aggr_spikes::{
    config::{display_timezone, load_config},
    data::SqliteBarStore,
    pipeline::{PipelineDriver, RunContext, RunReport, SystemClock},
    utils::init_logging,
    Config,
};

/// Exit status for an aborted run (128 + SIGINT)
const INTERRUPT_EXIT_CODE: i32 = 130;

/// Raise the stop flag; true if it was already raised
fn request_stop(shutdown: &AtomicBool) -> bool {
    shutdown.swap(true, Ordering::SeqCst)
}

/// Application state
pub struct SpikeApp {
    config: Arc<Config>,
    shutdown: Arc<AtomicBool>,
}

impl SpikeApp {
    pub fn new(config_path: &str) -> anyhow::Result<Self> {
        let config = load_config(config_path)
            .with_context(|| format!("loading {}", config_path))?;

        init_logging(&config.logging)?;
        info!("Configuration loaded from {}", config_path);

        Ok(SpikeApp {
            config: Arc::new(config),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub async fn run(&self) -> anyhow::Result<RunReport> {
        self.setup_shutdown_handler();

        let config = Arc::clone(&self.config);
        let shutdown = Arc::clone(&self.shutdown);

        // rusqlite and file decoding block; keep them off the async workers
        let report = tokio::task::spawn_blocking(move || -> anyhow::Result<RunReport> {
            let store = SqliteBarStore::open(&config.store_uri)?;
            let driver = PipelineDriver::from_config(&config);
            let mut ctx = RunContext::new(store, SystemClock, config).with_shutdown(shutdown);
            Ok(driver.run(&mut ctx))
        })
        .await??;

        if let Some(path) = &self.config.report_path {
            match report.write_json(path) {
                Ok(()) => info!("Run report written to {}", path.display()),
                Err(e) => error!("Failed to write run report {}: {}", path.display(), e),
            }
        }

        Ok(report)
    }

    /// First Ctrl+C stops the run at the next file boundary; a second one
    /// exits at once. The open file's transaction is never committed.
    fn setup_shutdown_handler(&self) {
        let shutdown = Arc::clone(&self.shutdown);

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if request_stop(&shutdown) {
                    error!("Second Ctrl+C - aborting without finishing current file");
                    std::process::exit(INTERRUPT_EXIT_CODE);
                }
                warn!("Ctrl+C received - finishing current file (press again to abort)");
            }
        });
    }

    fn print_summary(&self, report: &RunReport) -> anyhow::Result<()> {
        let tz = display_timezone(&self.config)?;

        println!("Start: {}", report.start.date);
        println!("Now: {}", report.today);
        println!("Files to process: {}", report.files_discovered);
        println!("Vol spikes:");
        for spike in &report.spikes {
            println!("{}", spike);
        }

        match report.watermark_in(tz) {
            Some(last) => println!("Last record (TZ={}): {}", tz.name(), last),
            None => println!("Last record: none"),
        }

        if report.files_failed > 0 || report.persistence_failures > 0 {
            warn!(
                "{} files unreadable, {} batches not committed - see log",
                report.files_failed, report.persistence_failures
            );
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CONFIG_PATH").ok())
        .unwrap_or_else(|| "config.toml".to_string());

    let app = SpikeApp::new(&config_path)?;

    let report = app.run().await?;
    app.print_summary(&report)?;

    Ok(())
}
