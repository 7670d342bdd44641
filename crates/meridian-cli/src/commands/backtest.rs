use meridian_application::backtesting::run_backtest;
use meridian_application::config::load_config;
use meridian_domain::services::strategy::HoldStrategy;
use std::path::PathBuf;

pub(super) fn run(config_path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(&config_path)?;
    println!(
        "{}: backtest (run_id={}, symbols={}, timeframe={}, initial_capital={})",
        meridian_domain::engine_name(),
        config.run.run_id,
        config.run.symbols.join(","),
        config.run.timeframe,
        config.run.initial_capital
    );

    let overall_start = std::time::Instant::now();
    let repo = crate::infra::build_market_data_repo(&config);
    let artifacts = crate::infra::build_artifact_writer();

    let output = run_backtest(&config, out, &repo, &artifacts, HoldStrategy)
        .map_err(|err| err.to_string())?;

    if let Some(error) = &output.result.error {
        println!("run ended early: {error}");
    }
    println!("run output: {}", output.run_dir.display());
    println!(
        "{}: backtest total_ms={}",
        meridian_domain::engine_name(),
        overall_start.elapsed().as_millis()
    );
    Ok(())
}
