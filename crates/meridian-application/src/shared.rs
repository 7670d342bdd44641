use crate::config::Config;
use crate::AppError;
use meridian_domain::repositories::artifacts::{ArtifactWriter, RunSummary};
use meridian_domain::services::analyzer::AnalyzerConfig;
use meridian_domain::services::engine::{BacktestResult, EngineConfig, OrderPolicy};
use meridian_domain::services::execution::ExecutionConfig;
use meridian_domain::value_objects::timeframe::Timeframe;
use std::path::PathBuf;
use tracing::{info, warn};

pub fn resolve_timeframe(config: &Config) -> Result<Timeframe, AppError> {
    Timeframe::parse(&config.run.timeframe).map_err(AppError::Config)
}

pub fn resolve_engine_config(config: &Config) -> Result<EngineConfig, AppError> {
    let costs = &config.costs;
    if !costs.commission_rate.is_finite() || costs.commission_rate < 0.0 {
        return Err(AppError::Config(
            "costs.commission_rate must be finite and >= 0".to_string(),
        ));
    }
    if !costs.slippage_factor.is_finite() || costs.slippage_factor < 0.0 {
        return Err(AppError::Config(
            "costs.slippage_factor must be finite and >= 0".to_string(),
        ));
    }
    if config.run.initial_capital <= 0.0 {
        return Err(AppError::Config(
            "run.initial_capital must be > 0".to_string(),
        ));
    }
    let metrics = &config.metrics;
    if !(metrics.var_confidence > 0.0 && metrics.var_confidence < 1.0) {
        return Err(AppError::Config(
            "metrics.var_confidence must be in (0, 1)".to_string(),
        ));
    }
    if metrics.periods_per_year <= 0.0 {
        return Err(AppError::Config(
            "metrics.periods_per_year must be > 0".to_string(),
        ));
    }
    if config.run.symbols.is_empty() {
        return Err(AppError::Config("run.symbols must not be empty".to_string()));
    }

    Ok(EngineConfig {
        initial_capital: config.run.initial_capital,
        execution: ExecutionConfig {
            commission_rate: costs.commission_rate,
            slippage_model: costs.slippage_model,
            slippage_factor: costs.slippage_factor,
        },
        analyzer: AnalyzerConfig {
            risk_free_rate: metrics.risk_free_rate,
            periods_per_year: metrics.periods_per_year,
            var_confidence: metrics.var_confidence,
        },
        order_policy: OrderPolicy {
            kind: config.orders.kind,
            limit_offset_bps: config.orders.limit_offset_bps,
            expire_after_secs: config.orders.expire_after_secs,
        },
    })
}

pub fn log_run_outcome(config: &Config, result: &BacktestResult) {
    for (symbol, report) in &result.data_quality {
        if report.duplicates + report.out_of_order + report.invalid > 0 {
            warn!(
                symbol = %symbol,
                rows = report.rows,
                duplicates = report.duplicates,
                out_of_order = report.out_of_order,
                invalid = report.invalid,
                "dropped bad history rows"
            );
        }
    }
    match &result.error {
        Some(error) => warn!(
            run_id = %config.run.run_id,
            %error,
            bars = result.bars_processed,
            "run terminated early, partial results kept"
        ),
        None => info!(
            run_id = %config.run.run_id,
            bars = result.bars_processed,
            trades = result.trades.len(),
            final_capital = result.final_capital,
            "run complete"
        ),
    }
}

pub fn write_outputs(
    config: &Config,
    mode: &str,
    out: Option<PathBuf>,
    result: &BacktestResult,
    artifacts: &dyn ArtifactWriter,
) -> Result<PathBuf, AppError> {
    let base_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    let run_dir = base_dir.join(&config.run.run_id);
    artifacts.ensure_dir(&run_dir)?;

    artifacts.write_trades_csv(run_dir.join("trades.csv").as_path(), &result.trades)?;
    artifacts.write_equity_csv(run_dir.join("equity.csv").as_path(), &result.equity_curve)?;

    let summary = RunSummary {
        run_id: &config.run.run_id,
        mode,
        symbols: &config.run.symbols,
        initial_capital: config.run.initial_capital,
        final_capital: result.final_capital,
        bars_processed: result.bars_processed,
        dropped_bars: result.dropped_bars,
        expired_orders: result.expired_orders,
        error: result.error.as_ref().map(|err| err.to_string()),
        metrics: &result.metrics,
    };
    artifacts.write_summary_json(run_dir.join("summary.json").as_path(), &summary)?;

    Ok(run_dir)
}

pub fn record_engine_metrics(prefix: &str, result: &BacktestResult, engine_ms: f64) {
    metrics::histogram!(format!("{prefix}.engine_ms")).record(engine_ms);
    metrics::gauge!(format!("{prefix}.bars_processed")).set(result.bars_processed as f64);
    metrics::gauge!(format!("{prefix}.trades")).set(result.trades.len() as f64);
    metrics::gauge!(format!("{prefix}.bars_per_sec")).set(if engine_ms > 0.0 {
        result.bars_processed as f64 / (engine_ms / 1000.0)
    } else {
        0.0
    });
}
