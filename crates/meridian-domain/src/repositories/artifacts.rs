use crate::errors::ArtifactError;
use crate::services::analyzer::PerformanceMetrics;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::trade::TradeRecord;
use std::path::Path;

/// Port for persisting run outputs. The application layer decides what to
/// write; adapters decide how.
pub trait ArtifactWriter {
    fn ensure_dir(&self, dir: &Path) -> Result<(), ArtifactError>;

    fn write_trades_csv(&self, path: &Path, trades: &[TradeRecord]) -> Result<(), ArtifactError>;

    fn write_equity_csv(
        &self,
        path: &Path,
        equity_curve: &[EquityPoint],
    ) -> Result<(), ArtifactError>;

    fn write_summary_json(
        &self,
        path: &Path,
        summary: &RunSummary<'_>,
    ) -> Result<(), ArtifactError>;
}

/// What `summary.json` carries alongside the metrics.
#[derive(Debug, serde::Serialize)]
pub struct RunSummary<'a> {
    pub run_id: &'a str,
    pub mode: &'a str,
    pub symbols: &'a [String],
    pub initial_capital: f64,
    pub final_capital: f64,
    pub bars_processed: u64,
    pub dropped_bars: u64,
    pub expired_orders: u64,
    pub error: Option<String>,
    pub metrics: &'a PerformanceMetrics,
}
