use crate::config::Config;
use crate::shared::{
    log_run_outcome, record_engine_metrics, resolve_engine_config, resolve_timeframe,
    write_outputs,
};
use crate::AppError;
use meridian_domain::repositories::artifacts::ArtifactWriter;
use meridian_domain::repositories::market_data::MarketDataRepository;
use meridian_domain::services::engine::{
    BacktestOrchestrator, BacktestResult, HistoricalRequest, NoopControl,
};
use meridian_domain::services::strategy::Strategy;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;

#[derive(Debug)]
pub struct RunOutput {
    pub run_dir: PathBuf,
    pub result: BacktestResult,
}

/// Historical run use case: resolve configuration, drive the orchestrator
/// over `[start, end]`, write artifacts. Partial results from a failed run
/// are still written; the failure lands in `result.error` and `summary.json`.
pub fn run_backtest<S: Strategy>(
    config: &Config,
    out: Option<PathBuf>,
    market_data: &dyn MarketDataRepository,
    artifacts: &dyn ArtifactWriter,
    strategy: S,
) -> Result<RunOutput, AppError> {
    let _span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        timeframe = %config.run.timeframe,
        symbols = config.run.symbols.len()
    )
    .entered();

    let timeframe = resolve_timeframe(config)?;
    let engine_config = resolve_engine_config(config)?;
    if config.run.end < config.run.start {
        return Err(AppError::Config("run.end must be >= run.start".to_string()));
    }

    let request = HistoricalRequest {
        symbols: config.run.symbols.clone(),
        start: config.run.start,
        end: config.run.end,
        timeframe,
    };

    let mut orchestrator = BacktestOrchestrator::new(engine_config, strategy);
    let stage_start = Instant::now();
    let result = orchestrator.run_historical(market_data, &request, &NoopControl);
    record_engine_metrics(
        "meridian.backtest",
        &result,
        stage_start.elapsed().as_millis() as f64,
    );

    log_run_outcome(config, &result);
    let run_dir = write_outputs(config, "historical", out, &result, artifacts)?;
    Ok(RunOutput { run_dir, result })
}
