use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::trade::TradeRecord;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
    pub var_confidence: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            periods_per_year: 252.0,
            var_confidence: 0.95,
        }
    }
}

/// Complete risk/return snapshot of one run. Every field has a documented
/// zero default on empty or degenerate input; `sortino_ratio` is `None`
/// exactly when the return series is non-empty but has no downside, which
/// is a distinct outcome from "nothing to measure".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub net_pnl: f64,
    pub total_fees: f64,
    pub total_slippage: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_period_secs: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: f64,
    pub max_drawdown_duration_secs: i64,
    pub value_at_risk: f64,
    pub expected_shortfall: f64,
    pub calmar_ratio: f64,
    pub beta: f64,
    pub alpha: f64,
    pub r_squared: f64,
}

impl PerformanceMetrics {
    pub fn empty() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            total_pnl: 0.0,
            net_pnl: 0.0,
            total_fees: 0.0,
            total_slippage: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            avg_holding_period_secs: 0.0,
            total_return: 0.0,
            annualized_return: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: Some(0.0),
            max_drawdown: 0.0,
            max_drawdown_duration_secs: 0,
            value_at_risk: 0.0,
            expected_shortfall: 0.0,
            calmar_ratio: 0.0,
            beta: 0.0,
            alpha: 0.0,
            r_squared: 0.0,
        }
    }
}

/// Computes `PerformanceMetrics` from closed trades and the equity curve.
/// Stateless: calling twice with the same inputs yields the same output.
#[derive(Debug, Clone, Default)]
pub struct PerformanceAnalyzer {
    config: AnalyzerConfig,
}

impl PerformanceAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// `benchmark_returns` are (timestamp, return) pairs; beta/alpha/R² come
    /// from an inner join against the strategy's own return timestamps and
    /// stay 0/0/0 when no benchmark is supplied or fewer than two points
    /// align.
    pub fn calculate_metrics(
        &self,
        trades: &[TradeRecord],
        equity_curve: &[EquityPoint],
        benchmark_returns: Option<&[(i64, f64)]>,
    ) -> PerformanceMetrics {
        let mut metrics = PerformanceMetrics::empty();
        self.fill_trade_stats(&mut metrics, trades);

        let returns = tick_returns(equity_curve);
        let daily = resample_returns(equity_curve, day_bucket);

        self.fill_return_stats(&mut metrics, equity_curve, &daily);
        self.fill_tail_risk(&mut metrics, &returns);
        fill_drawdown(&mut metrics, equity_curve);

        metrics.calmar_ratio = if metrics.max_drawdown != 0.0 {
            metrics.annualized_return / metrics.max_drawdown
        } else {
            0.0
        };

        if let Some(benchmark) = benchmark_returns {
            fill_benchmark_stats(&mut metrics, &returns, benchmark, self.config.periods_per_year);
        }

        metrics
    }

    fn fill_trade_stats(&self, metrics: &mut PerformanceMetrics, trades: &[TradeRecord]) {
        metrics.total_trades = trades.len();
        if trades.is_empty() {
            return;
        }

        let mut wins = Vec::new();
        let mut losses = Vec::new();
        for trade in trades {
            metrics.total_fees += trade.fees;
            metrics.total_slippage += trade.slippage;
            metrics.total_pnl += trade.pnl + trade.fees + trade.slippage;
            metrics.avg_holding_period_secs += trade.holding_period_secs as f64;
            if trade.pnl > 0.0 {
                wins.push(trade.pnl);
            } else {
                losses.push(trade.pnl);
            }
        }

        metrics.net_pnl = metrics.total_pnl - metrics.total_fees - metrics.total_slippage;
        metrics.winning_trades = wins.len();
        metrics.losing_trades = losses.len();
        metrics.win_rate = wins.len() as f64 / trades.len() as f64;
        metrics.avg_holding_period_secs /= trades.len() as f64;

        if !wins.is_empty() {
            metrics.avg_win = wins.iter().sum::<f64>() / wins.len() as f64;
            metrics.largest_win = wins.iter().cloned().fold(f64::MIN, f64::max);
        }
        if !losses.is_empty() {
            metrics.avg_loss = losses.iter().sum::<f64>() / losses.len() as f64;
            metrics.largest_loss = losses.iter().cloned().fold(f64::MAX, f64::min);
        }
    }

    fn fill_return_stats(
        &self,
        metrics: &mut PerformanceMetrics,
        equity_curve: &[EquityPoint],
        daily: &[f64],
    ) {
        let (first, last) = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return,
        };

        if first.portfolio_value > 0.0 {
            metrics.total_return = last.portfolio_value / first.portfolio_value - 1.0;
        }
        let elapsed = (last.timestamp - first.timestamp) as f64;
        if elapsed > 0.0 && metrics.total_return > -1.0 {
            metrics.annualized_return =
                (1.0 + metrics.total_return).powf(SECONDS_PER_YEAR / elapsed) - 1.0;
        }

        let rf_per_period = self.config.risk_free_rate / self.config.periods_per_year;
        let excess: Vec<f64> = daily.iter().map(|r| r - rf_per_period).collect();

        metrics.sharpe_ratio = sharpe(&excess, self.config.periods_per_year);
        metrics.sortino_ratio = sortino(&excess, self.config.periods_per_year);
    }

    fn fill_tail_risk(&self, metrics: &mut PerformanceMetrics, returns: &[(i64, f64)]) {
        if returns.is_empty() {
            return;
        }
        let var = value_at_risk(returns, self.config.var_confidence);
        metrics.value_at_risk = var;
        let tail: Vec<f64> = returns
            .iter()
            .map(|(_, r)| *r)
            .filter(|r| *r <= -var)
            .collect();
        if !tail.is_empty() {
            metrics.expected_shortfall = -(tail.iter().sum::<f64>() / tail.len() as f64);
        }
    }
}

/// Per-tick returns from consecutive portfolio values.
pub fn tick_returns(equity_curve: &[EquityPoint]) -> Vec<(i64, f64)> {
    equity_curve
        .windows(2)
        .filter(|pair| pair[0].portfolio_value > 0.0)
        .map(|pair| {
            (
                pair[1].timestamp,
                pair[1].portfolio_value / pair[0].portfolio_value - 1.0,
            )
        })
        .collect()
}

fn day_bucket(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(86_400)
}

fn month_bucket(timestamp: i64) -> i64 {
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_default();
    i64::from(datetime.year()) * 100 + i64::from(datetime.month())
}

/// Fixed-window resampling: the equity curve collapses to its last value per
/// bucket, then returns come from consecutive bucket closes.
fn resample_returns(equity_curve: &[EquityPoint], bucket: fn(i64) -> i64) -> Vec<f64> {
    let mut closes: Vec<(i64, f64)> = Vec::new();
    for point in equity_curve {
        let key = bucket(point.timestamp);
        match closes.last_mut() {
            Some((last_key, value)) if *last_key == key => *value = point.portfolio_value,
            _ => closes.push((key, point.portfolio_value)),
        }
    }
    closes
        .windows(2)
        .filter(|pair| pair[0].1 > 0.0)
        .map(|pair| pair[1].1 / pair[0].1 - 1.0)
        .collect()
}

/// Daily returns series, one per calendar day with at least one equity point.
pub fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    resample_returns(equity_curve, day_bucket)
}

/// Monthly returns series, bucketed by calendar month (UTC).
pub fn monthly_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    resample_returns(equity_curve, month_bucket)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn sharpe(excess: &[f64], periods_per_year: f64) -> f64 {
    let std = sample_std(excess);
    if std == 0.0 {
        return 0.0;
    }
    periods_per_year.sqrt() * mean(excess) / std
}

/// `None` iff the series is non-empty but has no negative excess return.
fn sortino(excess: &[f64], periods_per_year: f64) -> Option<f64> {
    if excess.is_empty() {
        return Some(0.0);
    }
    let negatives: Vec<f64> = excess.iter().filter(|r| **r < 0.0).cloned().collect();
    if negatives.is_empty() {
        return None;
    }
    let downside =
        (negatives.iter().map(|r| r * r).sum::<f64>() / negatives.len() as f64).sqrt();
    if downside == 0.0 {
        return Some(0.0);
    }
    Some(periods_per_year.sqrt() * mean(excess) / downside)
}

/// Empirical percentile with linear interpolation, reported as a positive
/// loss magnitude.
fn value_at_risk(returns: &[(i64, f64)], confidence: f64) -> f64 {
    let mut sorted: Vec<f64> = returns.iter().map(|(_, r)| *r).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let quantile = (1.0 - confidence).clamp(0.0, 1.0);
    let rank = quantile * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let value = if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (rank - lower as f64) * (sorted[upper] - sorted[lower])
    };
    -value
}

fn fill_drawdown(metrics: &mut PerformanceMetrics, equity_curve: &[EquityPoint]) {
    let mut peak_value = f64::MIN;
    let mut peak_timestamp = 0;
    let mut worst = 0.0;
    let mut worst_duration = 0;

    for point in equity_curve {
        if point.portfolio_value >= peak_value {
            peak_value = point.portfolio_value;
            peak_timestamp = point.timestamp;
            continue;
        }
        if peak_value > 0.0 {
            let drawdown = (peak_value - point.portfolio_value) / peak_value;
            if drawdown > worst {
                worst = drawdown;
                worst_duration = point.timestamp - peak_timestamp;
            }
        }
    }

    metrics.max_drawdown = worst;
    metrics.max_drawdown_duration_secs = worst_duration;
}

fn fill_benchmark_stats(
    metrics: &mut PerformanceMetrics,
    returns: &[(i64, f64)],
    benchmark: &[(i64, f64)],
    periods_per_year: f64,
) {
    let mut strategy = Vec::new();
    let mut market = Vec::new();
    let mut cursor = benchmark.iter().peekable();
    for (timestamp, value) in returns {
        while let Some((bench_ts, _)) = cursor.peek() {
            if bench_ts < timestamp {
                cursor.next();
            } else {
                break;
            }
        }
        if let Some((bench_ts, bench_value)) = cursor.peek() {
            if bench_ts == timestamp {
                strategy.push(*value);
                market.push(*bench_value);
            }
        }
    }

    if strategy.len() < 2 {
        return;
    }

    let mean_s = mean(&strategy);
    let mean_m = mean(&market);
    let mut covariance = 0.0;
    let mut variance_m = 0.0;
    let mut variance_s = 0.0;
    for (s, m) in strategy.iter().zip(market.iter()) {
        covariance += (s - mean_s) * (m - mean_m);
        variance_m += (m - mean_m).powi(2);
        variance_s += (s - mean_s).powi(2);
    }
    if variance_m == 0.0 {
        return;
    }

    metrics.beta = covariance / variance_m;
    metrics.alpha = (mean_s - metrics.beta * mean_m) * periods_per_year;
    metrics.r_squared = if variance_s == 0.0 {
        0.0
    } else {
        (covariance * covariance) / (variance_m * variance_s)
    };
}
