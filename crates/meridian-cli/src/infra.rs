use meridian_application::config::Config;
use meridian_domain::repositories::market_data::{MarketDataRepository, OhlcvQuery};
use meridian_domain::value_objects::bar::Bar;
use meridian_domain::value_objects::timeframe::Timeframe;
use meridian_infrastructure::artifacts::FilesystemArtifactWriter;
use meridian_infrastructure::csv_market_data::CsvMarketDataRepository;
use meridian_infrastructure::replay_feed::ReplayFeedProvider;
use std::time::Duration;

pub fn build_market_data_repo(config: &Config) -> CsvMarketDataRepository {
    CsvMarketDataRepository::new(config.paths.data_dir.clone())
}

pub fn build_artifact_writer() -> FilesystemArtifactWriter {
    FilesystemArtifactWriter::new()
}

/// Stream runs replay on-disk history through the realtime path, paced by
/// `stream.pace_ms`.
pub fn build_replay_provider(config: &Config) -> Result<ReplayFeedProvider, String> {
    let stream = config
        .stream
        .as_ref()
        .ok_or_else(|| "[stream] section required for stream runs".to_string())?;
    let timeframe = Timeframe::parse(&config.run.timeframe)?;
    let repo = build_market_data_repo(config);

    let mut bars: Vec<Bar> = Vec::new();
    for symbol in &config.run.symbols {
        let series = repo
            .fetch_historical(&OhlcvQuery {
                symbol: symbol.clone(),
                start: config.run.start,
                end: config.run.end,
                timeframe: timeframe.clone(),
            })
            .map_err(|err| err.to_string())?;
        bars.extend(series);
    }

    Ok(ReplayFeedProvider::new(
        bars,
        Duration::from_millis(stream.pace_ms),
        stream.queue_capacity,
    ))
}
