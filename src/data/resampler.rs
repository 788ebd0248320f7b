/// Volume gate and one-minute resampling of ticks into aggregate bars
use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{AggregateBar, Tick};
use crate::utils::time::bucket_start;

/// Default minimum per-tick volume
pub const DEFAULT_MORE_THRESHOLD: f64 = 10.0;

/// Drops ticks too small to matter for spike detection
#[derive(Debug, Clone, Copy)]
pub struct VolumeGate {
    threshold: f64,
}

impl VolumeGate {
    pub fn new(threshold: f64) -> Self {
        VolumeGate { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn admits(&self, tick: &Tick) -> bool {
        tick.volume >= self.threshold
    }
}

impl Default for VolumeGate {
    fn default() -> Self {
        VolumeGate::new(DEFAULT_MORE_THRESHOLD)
    }
}

/// Bucket in progress.
///
/// The combinators are fixed (close=last, volume=sum, direction=max,
/// liquidation=min); stored bars and everything reading them assume them.
#[derive(Debug, Clone)]
struct PartialBar {
    bucket_start: DateTime<Utc>,
    last_tick_time: DateTime<Utc>,
    close: f64,
    volume: f64,
    direction: i32,
    liquidation: i32,
}

impl PartialBar {
    fn new(bucket_start: DateTime<Utc>, tick: &Tick) -> Self {
        PartialBar {
            bucket_start,
            last_tick_time: tick.timestamp,
            close: tick.price,
            volume: tick.volume,
            direction: tick.direction,
            liquidation: tick.liquidation,
        }
    }

    fn update(&mut self, tick: &Tick) {
        // Same-millisecond ticks: the later row wins
        if tick.timestamp >= self.last_tick_time {
            self.last_tick_time = tick.timestamp;
            self.close = tick.price;
        }
        self.volume += tick.volume;
        self.direction = self.direction.max(tick.direction);
        self.liquidation = self.liquidation.min(tick.liquidation);
    }

    fn to_bar(&self) -> AggregateBar {
        AggregateBar {
            bucket_start: self.bucket_start,
            close: self.close,
            volume: self.volume,
            direction: self.direction,
            liquidation: self.liquidation,
        }
    }
}

/// Groups gated ticks into one-minute bars
#[derive(Debug, Clone, Copy, Default)]
pub struct Resampler {
    gate: VolumeGate,
}

impl Resampler {
    pub fn new(gate: VolumeGate) -> Self {
        Resampler { gate }
    }

    pub fn gate(&self) -> VolumeGate {
        self.gate
    }

    /// Produce one bar per non-empty bucket, ordered by bucket start.
    /// Ticks need not arrive in time order.
    pub fn resample<I>(&self, ticks: I) -> Vec<AggregateBar>
    where
        I: IntoIterator<Item = Tick>,
    {
        let mut buckets: BTreeMap<DateTime<Utc>, PartialBar> = BTreeMap::new();
        let mut gated_out = 0usize;

        for tick in ticks {
            if !self.gate.admits(&tick) {
                gated_out += 1;
                continue;
            }

            let start = bucket_start(tick.timestamp);
            buckets
                .entry(start)
                .and_modify(|bar| bar.update(&tick))
                .or_insert_with(|| PartialBar::new(start, &tick));
        }

        debug!(
            "Resampled into {} bars ({} ticks below gate {})",
            buckets.len(),
            gated_out,
            self.gate.threshold()
        );

        buckets.values().map(PartialBar::to_bar).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, h, m, s).unwrap()
    }

    fn tick(timestamp: DateTime<Utc>, volume: f64, price: f64, direction: i32, liquidation: i32) -> Tick {
        Tick { timestamp, price, volume, direction, liquidation }
    }

    #[test]
    fn test_single_bucket_aggregation() {
        let ticks = vec![
            tick(at(0, 0, 5), 15.0, 100.0, 1, 0),
            tick(at(0, 0, 40), 20.0, 105.0, -1, 1),
        ];

        let bars = Resampler::new(VolumeGate::new(10.0)).resample(ticks);

        assert_eq!(bars, vec![AggregateBar {
            bucket_start: at(0, 0, 0),
            close: 105.0,
            volume: 35.0,
            direction: 1,
            liquidation: 0,
        }]);
    }

    #[test]
    fn test_gate_drops_small_ticks() {
        let ticks = vec![
            tick(at(0, 0, 5), 15.0, 100.0, 1, 0),
            tick(at(0, 0, 30), 5.0, 999.0, 1, 0),
            tick(at(0, 1, 10), 5.0, 101.0, 1, 0),
        ];

        let bars = Resampler::new(VolumeGate::new(10.0)).resample(ticks);

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 15.0);
        assert_eq!(bars[0].close, 100.0);
    }

    #[test]
    fn test_gate_is_inclusive() {
        let gate = VolumeGate::new(10.0);
        assert!(gate.admits(&tick(at(0, 0, 0), 10.0, 1.0, 1, 0)));
        assert!(!gate.admits(&tick(at(0, 0, 0), 9.99, 1.0, 1, 0)));
    }

    #[test]
    fn test_everything_gated_is_empty() {
        let ticks = vec![tick(at(0, 0, 5), 1.0, 100.0, 1, 0)];
        assert!(Resampler::default().resample(ticks).is_empty());
        assert!(Resampler::default().resample(Vec::new()).is_empty());
    }

    #[test]
    fn test_no_synthetic_empty_buckets() {
        let ticks = vec![
            tick(at(0, 0, 5), 12.0, 100.0, 1, 0),
            tick(at(0, 3, 5), 12.0, 103.0, 1, 0),
        ];

        let bars = Resampler::default().resample(ticks);

        let starts: Vec<_> = bars.iter().map(|b| b.bucket_start).collect();
        assert_eq!(starts, vec![at(0, 0, 0), at(0, 3, 0)]);
    }

    #[test]
    fn test_close_is_chronologically_last() {
        // Out-of-order input: the 00:00:50 tick is still the close
        let ticks = vec![
            tick(at(0, 0, 50), 12.0, 110.0, 1, 0),
            tick(at(0, 0, 10), 12.0, 90.0, 1, 0),
            tick(at(0, 1, 0), 12.0, 120.0, 1, 0),
        ];

        let bars = Resampler::default().resample(ticks);

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 110.0);
        assert_eq!(bars[0].volume, 24.0);
        assert_eq!(bars[1].bucket_start, at(0, 1, 0));
    }

    #[test]
    fn test_same_millisecond_tie_keeps_input_order() {
        let ts = at(0, 0, 20) + TimeDelta::milliseconds(250);
        let ticks = vec![
            tick(ts, 12.0, 100.0, -1, 1),
            tick(ts, 12.0, 101.0, -1, 1),
        ];

        let bars = Resampler::default().resample(ticks);

        assert_eq!(bars[0].close, 101.0);
        assert_eq!(bars[0].direction, -1);
        assert_eq!(bars[0].liquidation, 1);
    }

    #[test]
    fn test_far_future_ticks_share_one_bucket() {
        let base = crate::utils::time::from_epoch_millis(10_500_000_000_123).unwrap();
        let ticks = vec![
            tick(base, 12.0, 100.0, 1, 0),
            tick(base + TimeDelta::seconds(30), 12.0, 101.0, 1, 0),
        ];

        let bars = Resampler::default().resample(ticks);

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].bucket_start, bucket_start(base));
        assert_eq!(bars[0].bucket_start.timestamp_subsec_millis(), 0);
        assert_eq!(bars[0].close, 101.0);
        assert_eq!(bars[0].volume, 24.0);
    }
}
