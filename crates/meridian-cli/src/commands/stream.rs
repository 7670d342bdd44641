use meridian_application::config::load_config;
use meridian_application::streaming::run_stream;
use meridian_domain::services::engine::NoopControl;
use meridian_domain::services::strategy::HoldStrategy;
use std::path::PathBuf;

pub(super) fn run(config_path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(&config_path)?;
    println!(
        "{}: stream (run_id={}, symbols={})",
        meridian_domain::engine_name(),
        config.run.run_id,
        config.run.symbols.join(",")
    );

    let overall_start = std::time::Instant::now();
    let provider = crate::infra::build_replay_provider(&config)?;
    let artifacts = crate::infra::build_artifact_writer();

    let output = run_stream(
        &config,
        out,
        &provider,
        &artifacts,
        HoldStrategy,
        &NoopControl,
    )
    .map_err(|err| err.to_string())?;

    if let Some(error) = &output.result.error {
        println!("stream ended early: {error}");
    }
    println!("run output: {}", output.run_dir.display());
    println!(
        "{}: stream total_ms={}",
        meridian_domain::engine_name(),
        overall_start.elapsed().as_millis()
    );
    Ok(())
}
