use meridian_domain::errors::ArtifactError;
use meridian_domain::repositories::artifacts::{ArtifactWriter, RunSummary};
use meridian_domain::value_objects::equity_point::EquityPoint;
use meridian_domain::value_objects::trade::TradeRecord;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactWriter;

impl FilesystemArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactWriter for FilesystemArtifactWriter {
    fn ensure_dir(&self, dir: &Path) -> Result<(), ArtifactError> {
        fs::create_dir_all(dir).map_err(|err| {
            ArtifactError(format!("failed to create dir {}: {}", dir.display(), err))
        })
    }

    fn write_trades_csv(&self, path: &Path, trades: &[TradeRecord]) -> Result<(), ArtifactError> {
        let mut writer = csv::Writer::from_path(path).map_err(|err| {
            ArtifactError(format!("failed to open {}: {}", path.display(), err))
        })?;
        for trade in trades {
            writer.serialize(trade).map_err(|err| {
                ArtifactError(format!("failed to write trade row: {}", err))
            })?;
        }
        writer
            .flush()
            .map_err(|err| ArtifactError(format!("failed to flush {}: {}", path.display(), err)))
    }

    fn write_equity_csv(
        &self,
        path: &Path,
        equity_curve: &[EquityPoint],
    ) -> Result<(), ArtifactError> {
        let mut writer = csv::Writer::from_path(path).map_err(|err| {
            ArtifactError(format!("failed to open {}: {}", path.display(), err))
        })?;
        for point in equity_curve {
            writer.serialize(point).map_err(|err| {
                ArtifactError(format!("failed to write equity row: {}", err))
            })?;
        }
        writer
            .flush()
            .map_err(|err| ArtifactError(format!("failed to flush {}: {}", path.display(), err)))
    }

    fn write_summary_json(
        &self,
        path: &Path,
        summary: &RunSummary<'_>,
    ) -> Result<(), ArtifactError> {
        let json = serde_json::to_string_pretty(summary)
            .map_err(|err| ArtifactError(format!("failed to encode summary: {}", err)))?;
        fs::write(path, json)
            .map_err(|err| ArtifactError(format!("failed to write {}: {}", path.display(), err)))
    }
}
