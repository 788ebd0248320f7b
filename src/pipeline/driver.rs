/// Sequential ingestion loop: discover → parse → resample → detect → upsert
use std::path::Path;

use tracing::{error, info, info_span, warn};

use crate::data::{discover_sources, source_label, BarStore, Resampler, SpikeDetector, TickReader, VolumeGate};
use crate::error::Result;
use crate::pipeline::context::{Clock, RunContext};
use crate::pipeline::cursor::{compute_start, StartOrigin, StartPoint};
use crate::pipeline::report::RunReport;
use crate::types::{AggregateBar, Config};

/// Bars computed from one source file
#[derive(Debug)]
struct ParsedFile {
    bars: Vec<AggregateBar>,
    ticks: usize,
    skipped: usize,
}

pub struct PipelineDriver {
    resampler: Resampler,
    detector: SpikeDetector,
}

impl PipelineDriver {
    pub fn new(resampler: Resampler, detector: SpikeDetector) -> Self {
        PipelineDriver { resampler, detector }
    }

    pub fn from_config(config: &Config) -> Self {
        PipelineDriver::new(
            Resampler::new(VolumeGate::new(config.more_threshold)),
            SpikeDetector::new(config.report_threshold),
        )
    }

    /// Process every eligible file best-effort. Per-file failures are
    /// logged and counted; they never abort the run.
    pub fn run<S: BarStore, C: Clock>(&self, ctx: &mut RunContext<S, C>) -> RunReport {
        let span = info_span!("run", run_id = %ctx.run_id);
        let _guard = span.enter();

        let today = ctx.clock.today();
        let start = self.start_point(ctx);
        info!("🚀 Start: {} ({:?})", start.date, start.origin);
        info!("Now: {}", today);

        let mut report = RunReport::new(ctx.run_id, today, start.clone());

        let files = discover_sources(&ctx.config.data_root, start.date);
        report.files_discovered = files.len();
        info!("📂 Files to process: {}", files.len());

        for (idx, path) in files.iter().enumerate() {
            if ctx.stop_requested() {
                warn!("Stop requested - ending run after {} of {} files", idx, files.len());
                report.interrupted = true;
                break;
            }

            info!("[{}/{}] Processing {}", idx + 1, files.len(), path.display());

            let parsed = match self.load_bars(path) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!("❌ Skipping {}: {} ({})", path.display(), e, e.error_code());
                    report.files_failed += 1;
                    continue;
                }
            };

            report.files_processed += 1;
            report.ticks_parsed += parsed.ticks;
            report.rows_skipped += parsed.skipped;
            report.bars_computed += parsed.bars.len();

            // Spikes are reported even if the batch below fails to commit
            report
                .spikes
                .extend(self.detector.detect(&source_label(path), &parsed.bars));

            match ctx.store.upsert_batch(&parsed.bars) {
                Ok(inserted) => report.bars_inserted += inserted,
                Err(e) => {
                    error!("❌ Error committing {}: {} ({})", path.display(), e, e.error_code());
                    report.persistence_failures += 1;
                }
            }
        }

        report.watermark = match ctx.store.get_latest() {
            Ok(latest) => latest.map(|bar| bar.bucket_start),
            Err(e) => {
                error!("Error reading last record: {}", e);
                None
            }
        };

        info!(
            "✅ Run complete: {} files ok, {} failed, {} bars inserted, {} spikes",
            report.files_processed,
            report.files_failed,
            report.bars_inserted,
            report.spikes.len()
        );

        report
    }

    fn start_point<S: BarStore, C: Clock>(&self, ctx: &RunContext<S, C>) -> StartPoint {
        match ctx.config.start_date {
            Some(date) => {
                info!("Using configured start date: {}", date);
                StartPoint { date, origin: StartOrigin::Configured }
            }
            None => compute_start(&ctx.store, &ctx.clock),
        }
    }

    fn load_bars(&self, path: &Path) -> Result<ParsedFile> {
        let mut reader = TickReader::open(path)?;
        let mut ticks = 0usize;

        let bars = self
            .resampler
            .resample(reader.by_ref().inspect(|_| ticks += 1));

        if let Some(e) = reader.take_error() {
            return Err(e);
        }

        Ok(ParsedFile {
            bars,
            ticks,
            skipped: reader.skipped_rows(),
        })
    }
}
