use crate::config::Config;
use crate::shared::{
    log_run_outcome, record_engine_metrics, resolve_engine_config, write_outputs,
};
use crate::AppError;
use meridian_domain::repositories::artifacts::ArtifactWriter;
use meridian_domain::repositories::market_feed::MarketFeedProvider;
use meridian_domain::services::engine::{BacktestOrchestrator, RealtimeRequest, RunControl};
use meridian_domain::services::strategy::Strategy;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info_span;

pub use crate::backtesting::RunOutput;

/// Realtime run use case: subscribe to the feed, stream for the configured
/// duration or until the stop signal, write artifacts. A disconnect yields
/// partial results with the error recorded, same as the historical path.
pub fn run_stream<S: Strategy>(
    config: &Config,
    out: Option<PathBuf>,
    provider: &dyn MarketFeedProvider,
    artifacts: &dyn ArtifactWriter,
    strategy: S,
    control: &dyn RunControl,
) -> Result<RunOutput, AppError> {
    let _span = info_span!(
        "run_stream",
        run_id = %config.run.run_id,
        symbols = config.run.symbols.len()
    )
    .entered();

    let stream = config
        .stream
        .as_ref()
        .ok_or_else(|| AppError::Config("[stream] section required for stream runs".to_string()))?;
    let engine_config = resolve_engine_config(config)?;

    let request = RealtimeRequest {
        symbols: config.run.symbols.clone(),
        duration: Duration::from_secs(stream.duration_secs),
    };

    let mut orchestrator = BacktestOrchestrator::new(engine_config, strategy);
    let stage_start = Instant::now();
    let result = orchestrator.run_realtime(provider, &request, control);
    record_engine_metrics(
        "meridian.stream",
        &result,
        stage_start.elapsed().as_millis() as f64,
    );

    log_run_outcome(config, &result);
    let run_dir = write_outputs(config, "realtime", out, &result, artifacts)?;
    Ok(RunOutput { run_dir, result })
}
