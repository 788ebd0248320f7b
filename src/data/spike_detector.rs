/// Flags bars whose volume reaches the reporting threshold
use std::path::Path;

use crate::types::{AggregateBar, Spike};

pub const DEFAULT_REPORT_THRESHOLD: f64 = 200.0;

#[derive(Debug, Clone, Copy)]
pub struct SpikeDetector {
    threshold: f64,
}

impl SpikeDetector {
    pub fn new(threshold: f64) -> Self {
        SpikeDetector { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Bars at or above the threshold, in input order
    pub fn detect(&self, source_label: &str, bars: &[AggregateBar]) -> Vec<Spike> {
        bars.iter()
            .filter(|bar| bar.volume >= self.threshold)
            .map(|bar| Spike {
                source_label: source_label.to_string(),
                bucket_start: bar.bucket_start,
                close: bar.close,
                volume: bar.volume,
            })
            .collect()
    }
}

impl Default for SpikeDetector {
    fn default() -> Self {
        SpikeDetector::new(DEFAULT_REPORT_THRESHOLD)
    }
}

/// Two innermost directories above a source file, e.g. `BINANCE/btcusdt`
pub fn source_label(path: &Path) -> String {
    let mut dirs = path
        .parent()
        .into_iter()
        .flat_map(|p| p.iter().rev())
        .take(2)
        .map(|segment| segment.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    dirs.reverse();
    dirs.join("/")
}
