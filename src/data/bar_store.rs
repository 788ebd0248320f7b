/// Persistent storage for one-minute aggregate bars
///
/// Bars are keyed by `bucket_start` and written first-write-wins: a bucket
/// that already exists is never overwritten, even if a later file
/// recomputes it with different values.
use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::types::AggregateBar;
use crate::utils::time::{format_store_timestamp, parse_store_timestamp};

pub const MEMORY_LOCATION: &str = ":memory:";

/// Storage seam used by the cursor and the pipeline driver
pub trait BarStore {
    /// Bar with the greatest `bucket_start`, if any
    fn get_latest(&self) -> Result<Option<AggregateBar>>;

    fn exists(&self, bucket_start: DateTime<Utc>) -> Result<bool>;

    /// Insert every bar whose bucket is absent, in one atomic batch.
    /// Returns how many rows were actually inserted.
    fn upsert_batch(&mut self, bars: &[AggregateBar]) -> Result<usize>;

    fn count(&self) -> Result<usize>;
}

/// SQLite-backed bar store
pub struct SqliteBarStore {
    conn: Connection,
    location: String,
}

impl SqliteBarStore {
    /// Open `sqlite://<path>`, a bare path, or `:memory:`
    pub fn open(store_uri: &str) -> Result<Self> {
        let location = store_location(store_uri)?;

        let conn = if location == MEMORY_LOCATION {
            Connection::open_in_memory()?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = Path::new(&location).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Connection::open(&location)?
        };

        Self::with_connection(conn, location)
    }

    fn with_connection(conn: Connection, location: String) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS aggregate_bars (
                bucket_start TEXT PRIMARY KEY NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                direction INTEGER NOT NULL,
                liquidation INTEGER NOT NULL
            )",
        )?;

        info!("✅ Bar store ready at {}", location);

        Ok(SqliteBarStore { conn, location })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Every stored bar in time order
    pub fn load_all(&self) -> Result<Vec<AggregateBar>> {
        let mut stmt = self.conn.prepare(
            "SELECT bucket_start, close, volume, direction, liquidation
             FROM aggregate_bars ORDER BY bucket_start",
        )?;

        let bars = stmt
            .query_map([], row_to_bar)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(bars)
    }

    fn insert_batch(&mut self, bars: &[AggregateBar]) -> rusqlite::Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO aggregate_bars (bucket_start, close, volume, direction, liquidation)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(bucket_start) DO NOTHING",
            )?;

            for bar in bars {
                inserted += stmt.execute(params![
                    format_store_timestamp(bar.bucket_start),
                    bar.close,
                    bar.volume,
                    bar.direction,
                    bar.liquidation,
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }
}

impl BarStore for SqliteBarStore {
    fn get_latest(&self) -> Result<Option<AggregateBar>> {
        let latest = self
            .conn
            .query_row(
                "SELECT bucket_start, close, volume, direction, liquidation
                 FROM aggregate_bars ORDER BY bucket_start DESC LIMIT 1",
                [],
                row_to_bar,
            )
            .optional()?;

        Ok(latest)
    }

    fn exists(&self, bucket_start: DateTime<Utc>) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM aggregate_bars WHERE bucket_start = ?1")?;
        let found = stmt.exists([format_store_timestamp(bucket_start)])?;
        Ok(found)
    }

    fn upsert_batch(&mut self, bars: &[AggregateBar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }

        let inserted = self
            .insert_batch(bars)
            .map_err(|e| PipelineError::PersistenceFailure(e.to_string()))?;

        debug!("Committed {} of {} bars ({} already stored)", inserted, bars.len(), bars.len() - inserted);
        Ok(inserted)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM aggregate_bars", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_bar(row: &Row<'_>) -> rusqlite::Result<AggregateBar> {
    let text: String = row.get(0)?;
    let bucket_start = parse_store_timestamp(&text).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, "bucket_start".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(AggregateBar {
        bucket_start,
        close: row.get(1)?,
        volume: row.get(2)?,
        direction: row.get(3)?,
        liquidation: row.get(4)?,
    })
}

/// Strip the `sqlite://` scheme; other schemes are not supported
pub fn store_location(store_uri: &str) -> Result<String> {
    match store_uri.split_once("://") {
        Some(("sqlite", rest)) if !rest.is_empty() => Ok(rest.to_string()),
        Some((scheme, _)) => Err(PipelineError::ConfigError(format!(
            "Unsupported store uri: {}://",
            scheme
        ))),
        None if store_uri.is_empty() => {
            Err(PipelineError::ConfigError("store_uri is empty".to_string()))
        }
        None => Ok(store_uri.to_string()),
    }
}

/// In-memory bar store with the same first-write-wins semantics
#[derive(Debug, Default)]
pub struct MemoryBarStore {
    bars: BTreeMap<DateTime<Utc>, AggregateBar>,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> Vec<AggregateBar> {
        self.bars.values().cloned().collect()
    }
}

impl BarStore for MemoryBarStore {
    fn get_latest(&self) -> Result<Option<AggregateBar>> {
        Ok(self.bars.values().next_back().cloned())
    }

    fn exists(&self, bucket_start: DateTime<Utc>) -> Result<bool> {
        Ok(self.bars.contains_key(&bucket_start))
    }

    fn upsert_batch(&mut self, bars: &[AggregateBar]) -> Result<usize> {
        let mut inserted = 0;
        for bar in bars {
            if !self.bars.contains_key(&bar.bucket_start) {
                self.bars.insert(bar.bucket_start, bar.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.bars.len())
    }
}
