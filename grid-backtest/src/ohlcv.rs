//! OHLCV ingestion.
//!
//! Recognized column shapes: `(timestamp, open, high, low, close, volume)`
//! or `(open_time, open, high, low, close, volume)`, timestamps as
//! ISO-8601 or Unix-millisecond. Rows with any missing OHLC value are
//! dropped rather than failing the whole load.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::warn;

/// One OHLCV bar. Monetary fields are `Decimal` throughout, per
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// `true` for a candle that closes above where it opened — used to pick
    /// the intra-candle sweep order).
    pub fn is_up_bar(&self) -> bool {
        self.close >= self.open
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(millis) = raw.parse::<i64>() {
        // Millisecond epoch values are 13 digits around the present; a
        // 10-digit value is seconds, not milliseconds.
        return if raw.len() >= 13 {
            Utc.timestamp_millis_opt(millis).single()
        } else {
            Utc.timestamp_opt(millis, 0).single()
        };
    }
    None
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<Decimal>().ok()
}

/// Loads candles from a CSV file, recognizing either the
/// `(timestamp, open, high, low, close, volume)` or
/// `(open_time, open, high, low, close, volume.)` header shape.
/// Rows missing any of open/high/low/close are dropped with a warning.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening OHLCV CSV {}", path.display()))?;

    let headers = reader.headers().context("reading CSV header row")?.clone();
    let ts_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("timestamp") || h.eq_ignore_ascii_case("open_time"))
        .context("CSV must have a `timestamp` or `open_time` column")?;
    let col = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .with_context(|| format!("CSV missing required `{name}` column"))
    };
    let open_col = col("open")?;
    let high_col = col("high")?;
    let low_col = col("low")?;
    let close_col = col("close")?;
    let volume_col = headers.iter().position(|h| h.eq_ignore_ascii_case("volume"));

    let mut candles = Vec::new();
    let mut dropped = 0usize;
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading CSV row {row_idx}"))?;

        let parsed = (|| {
            let timestamp = parse_timestamp(record.get(ts_col)?)?;
            let open = parse_decimal(record.get(open_col)?)?;
            let high = parse_decimal(record.get(high_col)?)?;
            let low = parse_decimal(record.get(low_col)?)?;
            let close = parse_decimal(record.get(close_col)?)?;
            let volume = volume_col
                .and_then(|c| record.get(c))
                .and_then(parse_decimal)
                .unwrap_or(Decimal::ZERO);
            Some(Candle {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            })
        })();

        match parsed {
            Some(candle) => candles.push(candle),
            None => {
                dropped += 1;
                warn!(row = row_idx, "dropping CSV row with missing/invalid OHLC value");
            }
        }
    }

    if dropped > 0 {
        warn!(dropped, total = candles.len() + dropped, "dropped rows with missing OHLC values");
    }
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{contents}").unwrap();
        f
    }

    #[test]
    fn loads_timestamp_shape_with_iso8601() {
        let f = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T00:00:00Z,100,101,99,100.5,10\n\
             2024-01-01T01:00:00Z,100.5,102,100,101,12\n",
        );
        let candles = load_csv(f.path()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, Decimal::new(1005, 1));
    }

    #[test]
    fn loads_open_time_shape_with_millis() {
        let f = write_csv(
            "open_time,open,high,low,close,volume,extra\n\
             1704067200000,100,101,99,100.5,10,ignored\n",
        );
        let candles = load_csv(f.path()).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp.timestamp(), 1704067200);
    }

    #[test]
    fn drops_rows_with_missing_ohlc() {
        let f = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T00:00:00Z,100,101,99,100.5,10\n\
             2024-01-01T01:00:00Z,,102,100,101,12\n",
        );
        let candles = load_csv(f.path()).unwrap();
        assert_eq!(candles.len(), 1);
    }
}
