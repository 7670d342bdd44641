use meridian_domain::services::execution::SlippageModel;
use meridian_domain::value_objects::order::OrderKind;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub costs: CostsConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub stream: Option<StreamConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub symbols: Vec<String>,
    pub timeframe: String,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub data_dir: String,
    pub out_dir: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostsConfig {
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    #[serde(default = "default_slippage_model")]
    pub slippage_model: SlippageModel,
    #[serde(default = "default_slippage_factor")]
    pub slippage_factor: f64,
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self {
            commission_rate: default_commission_rate(),
            slippage_model: default_slippage_model(),
            slippage_factor: default_slippage_factor(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrdersConfig {
    #[serde(default = "default_order_kind")]
    pub kind: OrderKind,
    #[serde(default)]
    pub limit_offset_bps: f64,
    pub expire_after_secs: Option<i64>,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            kind: default_order_kind(),
            limit_offset_bps: 0.0,
            expire_after_secs: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    #[serde(default = "default_var_confidence")]
    pub var_confidence: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            periods_per_year: default_periods_per_year(),
            var_confidence: default_var_confidence(),
        }
    }
}

/// Realtime run bounds. `pace_ms` is how fast the replay feed emits bars.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    pub duration_secs: u64,
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_initial_capital() -> f64 {
    100_000.0
}

fn default_commission_rate() -> f64 {
    0.001
}

fn default_slippage_model() -> SlippageModel {
    SlippageModel::Basic
}

fn default_slippage_factor() -> f64 {
    0.0001
}

fn default_order_kind() -> OrderKind {
    OrderKind::Market
}

fn default_risk_free_rate() -> f64 {
    0.02
}

fn default_periods_per_year() -> f64 {
    252.0
}

fn default_var_confidence() -> f64 {
    0.95
}

fn default_pace_ms() -> u64 {
    0
}

fn default_queue_capacity() -> usize {
    1024
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))
}
