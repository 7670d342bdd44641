use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use meridian_domain::errors::DataFetchError;
use meridian_domain::repositories::market_data::{MarketDataRepository, OhlcvQuery};
use meridian_domain::value_objects::bar::Bar;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One file per symbol under `data_dir`, named `<symbol>.csv` with `/`
/// replaced by `-`. Rows outside the query's `[start, end]` are skipped;
/// ordering and deduplication are the engine's job.
#[derive(Debug, Clone)]
pub struct CsvMarketDataRepository {
    data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct OhlcvRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CsvMarketDataRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn file_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", symbol.replace('/', "-")))
    }
}

impl MarketDataRepository for CsvMarketDataRepository {
    fn fetch_historical(&self, query: &OhlcvQuery) -> Result<Vec<Bar>, DataFetchError> {
        let path = self.file_for(&query.symbol);
        let file = File::open(&path).map_err(|err| DataFetchError::Transport {
            symbol: query.symbol.clone(),
            message: format!("failed to open {}: {}", path.display(), err),
        })?;

        let mut reader = csv::Reader::from_reader(file);
        let mut bars = Vec::new();
        for row in reader.deserialize::<OhlcvRecord>() {
            let record = row.map_err(|err| DataFetchError::Parse {
                symbol: query.symbol.clone(),
                message: format!("bad CSV row in {}: {}", path.display(), err),
            })?;
            let timestamp =
                parse_timestamp(&record.timestamp).map_err(|message| DataFetchError::Parse {
                    symbol: query.symbol.clone(),
                    message,
                })?;
            if timestamp < query.start || timestamp > query.end {
                continue;
            }
            bars.push(Bar {
                symbol: query.symbol.clone(),
                timestamp,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            });
        }

        debug!(symbol = %query.symbol, rows = bars.len(), path = %path.display(), "loaded history");
        Ok(bars)
    }
}

fn parse_timestamp(value: &str) -> Result<i64, String> {
    if let Ok(epoch) = value.parse::<i64>() {
        return Ok(epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        let dt: DateTime<Utc> = Utc.from_utc_datetime(&naive);
        return Ok(dt.timestamp());
    }
    Err(format!("unsupported timestamp format: {}", value))
}
