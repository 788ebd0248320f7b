/// Reader for gzip-compressed aggregator snapshots
///
/// Each line holds five space-separated fields:
/// `epoch_millis close volume direction liquidation`.
/// Lines with a different field count are skipped. Empty or non-numeric
/// values inside a well-formed line read as zero so the tick still lands
/// in its bucket.
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder};
use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::types::Tick;
use crate::utils::time::from_epoch_millis;

pub const FIELD_COUNT: usize = 5;

/// Lazy, single-pass tick iterator over one source file
pub struct TickReader<R: Read> {
    path: PathBuf,
    records: csv::Reader<BufReader<GzDecoder<R>>>,
    record: ByteRecord,
    skipped: usize,
    error: Option<PipelineError>,
    done: bool,
}

impl TickReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PipelineError::source_unavailable(path, e))?;
        Self::from_gzip(file, path)
    }
}

impl<R: Read> TickReader<R> {
    /// Wrap a gzip stream. The header is read eagerly so a file that is not
    /// gzip at all fails here rather than on the first row.
    pub fn from_gzip(inner: R, path: &Path) -> Result<Self> {
        let mut decoded = BufReader::new(GzDecoder::new(inner));
        decoded
            .fill_buf()
            .map_err(|e| PipelineError::source_unavailable(path, e))?;

        let records = ReaderBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(decoded);

        Ok(TickReader {
            path: path.to_path_buf(),
            records,
            record: ByteRecord::new(),
            skipped: 0,
            error: None,
            done: false,
        })
    }

    /// Rows dropped for a bad field count or timestamp
    pub fn skipped_rows(&self) -> usize {
        self.skipped
    }

    /// Read or decompression failure that ended iteration early, if any
    pub fn take_error(&mut self) -> Option<PipelineError> {
        self.error.take()
    }
}

impl<R: Read> Iterator for TickReader<R> {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        if self.done {
            return None;
        }

        loop {
            match self.records.read_byte_record(&mut self.record) {
                Ok(true) => {
                    let line = self.record.position().map(|p| p.line()).unwrap_or(0);
                    match parse_record(&self.record, line) {
                        Ok(tick) => return Some(tick),
                        Err(skip) => {
                            self.skipped += 1;
                            debug!("{}: {}", self.path.display(), skip);
                        }
                    }
                }
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    self.error = Some(PipelineError::source_unavailable(&self.path, e));
                    return None;
                }
            }
        }
    }
}

fn parse_record(record: &ByteRecord, line: u64) -> Result<Tick> {
    if record.len() != FIELD_COUNT {
        return Err(PipelineError::ParseSkip {
            line,
            reason: format!("expected {} fields, found {}", FIELD_COUNT, record.len()),
        });
    }

    let millis: i64 = int_field(record, 0);
    let timestamp = from_epoch_millis(millis).ok_or_else(|| PipelineError::ParseSkip {
        line,
        reason: format!("timestamp {} out of range", millis),
    })?;

    Ok(Tick {
        timestamp,
        price: float_field(record, 1),
        volume: float_field(record, 2),
        direction: int_field(record, 3),
        liquidation: int_field(record, 4),
    })
}

fn field_str(record: &ByteRecord, idx: usize) -> Option<&str> {
    record
        .get(idx)
        .and_then(|raw| std::str::from_utf8(raw).ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn float_field(record: &ByteRecord, idx: usize) -> f64 {
    field_str(record, idx)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| !v.is_nan())
        .unwrap_or(0.0)
}

fn int_field<T>(record: &ByteRecord, idx: usize) -> T
where
    T: std::str::FromStr + TryFrom<i64> + Default,
{
    let Some(text) = field_str(record, idx) else {
        return T::default();
    };

    if let Ok(value) = text.parse::<T>() {
        return value;
    }

    // Integral values written as floats, e.g. "1.0"
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .and_then(|v| T::try_from(v as i64).ok())
        .unwrap_or_default()
}
