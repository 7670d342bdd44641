pub mod control;

pub use control::{NoopControl, RunControl};

use crate::errors::{DataFetchError, RunError};
use crate::repositories::market_data::{MarketDataRepository, OhlcvQuery};
use crate::repositories::market_feed::MarketFeedProvider;
use crate::services::analyzer::{PerformanceAnalyzer, PerformanceMetrics};
use crate::services::execution::{ExecutionSimulator, FillDecision};
use crate::services::feed::{merge_timelines, sanitize_series, DataQualityReport, SnapshotSet};
use crate::services::ledger::PositionLedger;
use crate::services::strategy::Strategy;
use crate::value_objects::bar::Bar;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::order::{OrderKind, OrderRequest, TimeInForce};
use crate::value_objects::position::Position;
use crate::value_objects::side::Side;
use crate::value_objects::timeframe::Timeframe;
use crate::value_objects::trade::TradeRecord;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Where a run currently is. Historical runs pass through `Fetching` and
/// `Simulating`; realtime runs through `Subscribing` and `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Initializing,
    Fetching,
    Subscribing,
    Simulating,
    Streaming,
    Finalizing,
    Done,
}

/// How signals become orders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderPolicy {
    pub kind: OrderKind,
    /// For limit orders: buys are placed this many basis points below the
    /// signal bar's close, sells above. Ignored for market orders.
    pub limit_offset_bps: f64,
    /// Pending orders expire this many seconds after creation; `None` keeps
    /// them good till cancelled.
    pub expire_after_secs: Option<i64>,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            kind: OrderKind::Market,
            limit_offset_bps: 0.0,
            expire_after_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub execution: crate::services::execution::ExecutionConfig,
    pub analyzer: crate::services::analyzer::AnalyzerConfig,
    pub order_policy: OrderPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            execution: Default::default(),
            analyzer: Default::default(),
            order_policy: OrderPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalRequest {
    pub symbols: Vec<String>,
    pub start: i64,
    pub end: i64,
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeRequest {
    pub symbols: Vec<String>,
    pub duration: Duration,
}

/// Everything a run produced. Always returned, even on early termination;
/// `error` marks a partial run instead of discarding what was accumulated.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub final_positions: HashMap<String, Position>,
    pub final_capital: f64,
    pub bars_processed: u64,
    pub dropped_bars: u64,
    pub expired_orders: u64,
    pub data_quality: HashMap<String, DataQualityReport>,
    pub error: Option<RunError>,
}

struct SimState {
    ledger: PositionLedger,
    pending: Vec<OrderRequest>,
    next_order_id: u64,
    fresh: HashMap<String, Bar>,
    latest: HashMap<String, Bar>,
    equity_curve: Vec<EquityPoint>,
    trades: Vec<TradeRecord>,
    bars_processed: u64,
    dropped_bars: u64,
    expired_orders: u64,
}

impl SimState {
    fn new(initial_capital: f64) -> Self {
        Self {
            ledger: PositionLedger::new(initial_capital),
            pending: Vec::new(),
            next_order_id: 1,
            fresh: HashMap::new(),
            latest: HashMap::new(),
            equity_curve: Vec::new(),
            trades: Vec::new(),
            bars_processed: 0,
            dropped_bars: 0,
            expired_orders: 0,
        }
    }
}

/// Drives the per-timestamp loop for both run modes: align the tick's bars,
/// ask the strategy, validate orders, attempt fills oldest-first, update the
/// ledger, append one equity point. Strictly sequential; one tick finishes
/// before the next begins.
pub struct BacktestOrchestrator<S: Strategy> {
    config: EngineConfig,
    strategy: S,
    simulator: ExecutionSimulator,
    analyzer: PerformanceAnalyzer,
    phase: RunPhase,
}

impl<S: Strategy> BacktestOrchestrator<S> {
    pub fn new(config: EngineConfig, strategy: S) -> Self {
        let simulator = ExecutionSimulator::new(config.execution);
        let analyzer = PerformanceAnalyzer::new(config.analyzer);
        Self {
            config,
            strategy,
            simulator,
            analyzer,
            phase: RunPhase::Initializing,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: RunPhase) {
        debug!(?phase, "run phase");
        self.phase = phase;
    }

    /// Replays `[start, end]` history for the requested symbols. A fetch
    /// failure for any symbol is fatal to the run and returns an empty
    /// result carrying the error.
    pub fn run_historical(
        &mut self,
        repository: &dyn MarketDataRepository,
        request: &HistoricalRequest,
        control: &dyn RunControl,
    ) -> BacktestResult {
        self.set_phase(RunPhase::Fetching);
        let mut state = SimState::new(self.config.initial_capital);
        let mut quality = HashMap::new();

        let fetched = fetch_all(repository, request);
        let mut series = Vec::with_capacity(fetched.len());
        for outcome in fetched {
            match outcome {
                Ok((symbol, bars)) => {
                    let (clean, report) = sanitize_series(bars);
                    debug!(symbol = %symbol, rows = report.rows, kept = clean.len(), "history loaded");
                    quality.insert(symbol, report);
                    series.push(clean);
                }
                Err(err) => {
                    self.set_phase(RunPhase::Done);
                    return self.finalize(state, quality, None, Some(err.into()));
                }
            }
        }

        // Single-symbol runs use that symbol's own closes as the benchmark.
        let benchmark = if request.symbols.len() == 1 {
            Some(close_returns(&series[0]))
        } else {
            None
        };

        let ticks = merge_timelines(series);
        self.set_phase(RunPhase::Simulating);
        for tick in &ticks {
            if control.should_stop() {
                break;
            }
            self.process_tick(&mut state, tick.timestamp, &tick.bars);
        }

        self.set_phase(RunPhase::Finalizing);
        let result = self.finalize(state, quality, benchmark, None);
        self.set_phase(RunPhase::Done);
        result
    }

    /// Streams live bars for at most `duration`, checking the stop signal
    /// between ticks. Bars sharing a timestamp are drained into one tick;
    /// bars at or before an already-processed timestamp are dropped and
    /// counted. A disconnect finalizes with whatever was accumulated.
    pub fn run_realtime(
        &mut self,
        provider: &dyn MarketFeedProvider,
        request: &RealtimeRequest,
        control: &dyn RunControl,
    ) -> BacktestResult {
        self.set_phase(RunPhase::Subscribing);
        let mut state = SimState::new(self.config.initial_capital);

        let mut feed = match provider.subscribe(&request.symbols) {
            Ok(feed) => feed,
            Err(err) => {
                self.set_phase(RunPhase::Done);
                return self.finalize(state, HashMap::new(), None, Some(err.into()));
            }
        };

        self.set_phase(RunPhase::Streaming);
        let deadline = Instant::now() + request.duration;
        let mut carry: Option<Bar> = None;
        let mut last_tick_ts: Option<i64> = None;
        let mut error: Option<RunError> = None;

        'run: while error.is_none() {
            if control.should_stop() || Instant::now() >= deadline {
                break;
            }

            let head = match carry.take() {
                Some(bar) => bar,
                None => {
                    let timeout = poll_timeout(deadline);
                    match feed.recv(timeout) {
                        Ok(Some(bar)) => bar,
                        Ok(None) => continue,
                        Err(err) => {
                            error = Some(err.into());
                            break;
                        }
                    }
                }
            };
            if last_tick_ts.is_some_and(|ts| head.timestamp <= ts) {
                state.dropped_bars += 1;
                continue;
            }

            let mut group = vec![head];
            loop {
                match feed.recv(Duration::from_millis(10)) {
                    Ok(Some(bar)) => {
                        if bar.timestamp == group[0].timestamp {
                            group.push(bar);
                        } else if bar.timestamp < group[0].timestamp {
                            state.dropped_bars += 1;
                        } else {
                            carry = Some(bar);
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        // process what arrived, then finalize
                        last_tick_ts = Some(group[0].timestamp);
                        self.process_tick(&mut state, group[0].timestamp, &group);
                        error = Some(err.into());
                        continue 'run;
                    }
                }
            }

            last_tick_ts = Some(group[0].timestamp);
            self.process_tick(&mut state, group[0].timestamp, &group);
        }

        feed.close();
        self.set_phase(RunPhase::Finalizing);
        let result = self.finalize(state, HashMap::new(), None, error);
        self.set_phase(RunPhase::Done);
        result
    }

    fn process_tick(&mut self, state: &mut SimState, timestamp: i64, bars: &[Bar]) {
        state.fresh.clear();
        for bar in bars {
            state.bars_processed += 1;
            state.fresh.insert(bar.symbol.clone(), bar.clone());
            state.latest.insert(bar.symbol.clone(), bar.clone());
        }

        let snapshot = SnapshotSet::new(timestamp, &state.fresh, &state.latest);
        let signals = match self.strategy.analyze(&snapshot) {
            Ok(signals) => signals,
            Err(err) => {
                warn!(%timestamp, error = %err, "strategy failed, tick skipped");
                Vec::new()
            }
        };
        drop(snapshot);

        for signal in signals {
            // No fresh bar means no new order evaluation for that symbol.
            let Some(bar) = state.fresh.get(&signal.symbol) else {
                continue;
            };
            let quantity = self.strategy.size_position(&signal, state.ledger.capital());
            if quantity <= 0.0 {
                continue;
            }

            let policy = self.config.order_policy;
            let time_in_force = match policy.expire_after_secs {
                Some(secs) => TimeInForce::GoodTillTime {
                    expires_at: timestamp + secs,
                },
                None => TimeInForce::GoodTillCancelled,
            };
            let id = state.next_order_id;
            let order = match policy.kind {
                OrderKind::Market => OrderRequest::market(
                    id,
                    signal.symbol.clone(),
                    signal.side,
                    quantity,
                    time_in_force,
                    timestamp,
                ),
                OrderKind::Limit => {
                    let offset = policy.limit_offset_bps / 10_000.0;
                    let limit_price = match signal.side {
                        Side::Buy => bar.close * (1.0 - offset),
                        Side::Sell => bar.close * (1.0 + offset),
                    };
                    OrderRequest::limit(
                        id,
                        signal.symbol.clone(),
                        signal.side,
                        quantity,
                        limit_price,
                        time_in_force,
                        timestamp,
                    )
                }
            };
            match order {
                Ok(order) => {
                    state.next_order_id += 1;
                    debug!(
                        order_id = order.id,
                        symbol = %order.symbol,
                        side = ?order.side,
                        quantity = order.quantity,
                        "order submitted"
                    );
                    state.pending.push(order);
                }
                Err(err) => {
                    warn!(symbol = %signal.symbol, error = %err, "order rejected");
                }
            }
        }

        // Fill pass, oldest order first. Orders whose symbol has no fresh
        // bar this tick stay pending unless their deadline has passed.
        let mut index = 0;
        while index < state.pending.len() {
            if state.pending[index].expires_before(timestamp) {
                let order = state.pending.remove(index);
                debug!(order_id = order.id, symbol = %order.symbol, "order expired");
                state.expired_orders += 1;
                continue;
            }
            let decision = {
                let order = &state.pending[index];
                match state.fresh.get(&order.symbol) {
                    Some(bar) => self.simulator.try_fill(order, bar),
                    None => FillDecision::Pending,
                }
            };
            match decision {
                FillDecision::Filled(fill) => {
                    state.pending.remove(index);
                    debug!(
                        order_id = fill.order_id,
                        symbol = %fill.symbol,
                        price = fill.price,
                        "order filled"
                    );
                    let (_, trade) = state.ledger.apply_fill(&fill);
                    if let Some(trade) = trade {
                        state.trades.push(trade);
                    }
                }
                FillDecision::Pending => index += 1,
                FillDecision::Expired => {
                    let order = state.pending.remove(index);
                    debug!(order_id = order.id, symbol = %order.symbol, "order expired");
                    state.expired_orders += 1;
                }
            }
        }

        let mut market_value = 0.0;
        let mut unrealized = 0.0;
        for position in state.ledger.open_positions() {
            if let Some(bar) = state.latest.get(&position.symbol) {
                market_value += position.quantity * bar.close;
                unrealized += (bar.close - position.average_price) * position.quantity;
            }
        }
        state.equity_curve.push(EquityPoint {
            timestamp,
            portfolio_value: state.ledger.capital() + market_value,
            capital: state.ledger.capital(),
            unrealized_pnl: unrealized,
            realized_pnl: state.ledger.realized_pnl(),
        });
    }

    fn finalize(
        &self,
        state: SimState,
        data_quality: HashMap<String, DataQualityReport>,
        benchmark: Option<Vec<(i64, f64)>>,
        error: Option<RunError>,
    ) -> BacktestResult {
        let metrics = self.analyzer.calculate_metrics(
            &state.trades,
            &state.equity_curve,
            benchmark.as_deref(),
        );
        BacktestResult {
            metrics,
            equity_curve: state.equity_curve,
            trades: state.trades,
            final_positions: state.ledger.positions(),
            final_capital: state.ledger.capital(),
            bars_processed: state.bars_processed,
            dropped_bars: state.dropped_bars,
            expired_orders: state.expired_orders,
            data_quality,
            error,
        }
    }
}

fn poll_timeout(deadline: Instant) -> Duration {
    deadline
        .saturating_duration_since(Instant::now())
        .min(Duration::from_millis(250))
}

fn close_returns(bars: &[Bar]) -> Vec<(i64, f64)> {
    bars.windows(2)
        .filter(|pair| pair[0].close > 0.0)
        .map(|pair| (pair[1].timestamp, pair[1].close / pair[0].close - 1.0))
        .collect()
}

fn fetch_all(
    repository: &dyn MarketDataRepository,
    request: &HistoricalRequest,
) -> Vec<Result<(String, Vec<Bar>), DataFetchError>> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = request
            .symbols
            .iter()
            .map(|symbol| {
                let query = OhlcvQuery {
                    symbol: symbol.clone(),
                    start: request.start,
                    end: request.end,
                    timeframe: request.timeframe.clone(),
                };
                let symbol = symbol.clone();
                (
                    symbol,
                    scope.spawn(move || repository.fetch_historical(&query)),
                )
            })
            .collect();

        handles
            .into_iter()
            .map(|(symbol, handle)| match handle.join() {
                Ok(Ok(bars)) => Ok((symbol, bars)),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(DataFetchError::Transport {
                    symbol,
                    message: "fetch thread panicked".to_string(),
                }),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FeedError, StrategyError};
    use crate::repositories::market_feed::MarketFeed;
    use crate::services::execution::ExecutionConfig;
    use crate::value_objects::signal::Signal;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn bar(symbol: &str, timestamp: i64, close: f64) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timestamp,
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 10.0,
        }
    }

    struct FakeRepository {
        series: HashMap<String, Vec<Bar>>,
        failing: Option<String>,
    }

    impl MarketDataRepository for FakeRepository {
        fn fetch_historical(&self, query: &OhlcvQuery) -> Result<Vec<Bar>, DataFetchError> {
            if self.failing.as_deref() == Some(query.symbol.as_str()) {
                return Err(DataFetchError::Transport {
                    symbol: query.symbol.clone(),
                    message: "connection reset".to_string(),
                });
            }
            Ok(self.series.get(&query.symbol).cloned().unwrap_or_default())
        }
    }

    /// Emits a pre-planned list of signals per tick; sizes every signal to a
    /// fixed quantity.
    struct ScriptedStrategy {
        script: VecDeque<Result<Vec<Signal>, StrategyError>>,
        quantity: f64,
    }

    impl ScriptedStrategy {
        fn new(script: Vec<Result<Vec<Signal>, StrategyError>>, quantity: f64) -> Self {
            Self {
                script: script.into(),
                quantity,
            }
        }
    }

    impl Strategy for ScriptedStrategy {
        fn name(&self) -> &str {
            "scripted"
        }

        fn analyze(&mut self, _snapshot: &SnapshotSet<'_>) -> Result<Vec<Signal>, StrategyError> {
            self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        fn size_position(&self, _signal: &Signal, _capital: f64) -> f64 {
            self.quantity
        }
    }

    fn signal(symbol: &str, side: Side) -> Signal {
        Signal {
            symbol: symbol.to_string(),
            side,
            confidence: 1.0,
        }
    }

    fn request(symbols: &[&str]) -> HistoricalRequest {
        HistoricalRequest {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            start: 0,
            end: 1_000,
            timeframe: Timeframe::parse("1m").unwrap(),
        }
    }

    fn engine_config() -> EngineConfig {
        EngineConfig {
            initial_capital: 100_000.0,
            execution: ExecutionConfig {
                commission_rate: 0.001,
                slippage_model: crate::services::execution::SlippageModel::Basic,
                slippage_factor: 0.0,
            },
            ..EngineConfig::default()
        }
    }

    #[test]
    fn buy_then_sell_round_trip_matches_hand_computed_result() {
        let repo = FakeRepository {
            series: HashMap::from([(
                "BTC-USDT".to_string(),
                vec![bar("BTC-USDT", 60, 50_000.0), bar("BTC-USDT", 120, 51_000.0)],
            )]),
            failing: None,
        };
        let strategy = ScriptedStrategy::new(
            vec![
                Ok(vec![signal("BTC-USDT", Side::Buy)]),
                Ok(vec![signal("BTC-USDT", Side::Sell)]),
            ],
            1.0,
        );
        let mut orchestrator = BacktestOrchestrator::new(engine_config(), strategy);
        let result = orchestrator.run_historical(&repo, &request(&["BTC-USDT"]), &NoopControl);

        assert!(result.error.is_none());
        assert_eq!(result.trades.len(), 1);
        assert!((result.trades[0].pnl - 899.0).abs() < 1e-9);
        assert!((result.final_capital - 100_899.0).abs() < 1e-9);
        assert_eq!(result.metrics.total_trades, 1);
        assert!((result.metrics.win_rate - 1.0).abs() < 1e-9);
        assert_eq!(result.final_positions["BTC-USDT"].quantity, 0.0);
    }

    #[test]
    fn market_order_never_sees_the_next_bar() {
        // bar 2's close is wildly different; the fill must use bar 1's.
        let repo = FakeRepository {
            series: HashMap::from([(
                "BTC-USDT".to_string(),
                vec![bar("BTC-USDT", 60, 100.0), bar("BTC-USDT", 120, 10_000.0)],
            )]),
            failing: None,
        };
        let strategy =
            ScriptedStrategy::new(vec![Ok(vec![signal("BTC-USDT", Side::Buy)])], 1.0);
        let mut orchestrator = BacktestOrchestrator::new(engine_config(), strategy);
        let result = orchestrator.run_historical(&repo, &request(&["BTC-USDT"]), &NoopControl);

        let position = &result.final_positions["BTC-USDT"];
        assert_eq!(position.average_price, 100.0);
    }

    #[test]
    fn strategy_error_skips_one_tick_and_the_run_continues() {
        let repo = FakeRepository {
            series: HashMap::from([(
                "BTC-USDT".to_string(),
                vec![
                    bar("BTC-USDT", 60, 100.0),
                    bar("BTC-USDT", 120, 101.0),
                    bar("BTC-USDT", 180, 102.0),
                ],
            )]),
            failing: None,
        };
        let strategy = ScriptedStrategy::new(
            vec![
                Err(StrategyError("model diverged".to_string())),
                Ok(vec![signal("BTC-USDT", Side::Buy)]),
            ],
            1.0,
        );
        let mut orchestrator = BacktestOrchestrator::new(engine_config(), strategy);
        let result = orchestrator.run_historical(&repo, &request(&["BTC-USDT"]), &NoopControl);

        assert!(result.error.is_none());
        assert_eq!(result.equity_curve.len(), 3);
        assert_eq!(result.final_positions["BTC-USDT"].average_price, 101.0);
    }

    #[test]
    fn fetch_failure_is_fatal_and_clearly_marked() {
        let repo = FakeRepository {
            series: HashMap::new(),
            failing: Some("ETH-USDT".to_string()),
        };
        let strategy = ScriptedStrategy::new(vec![], 1.0);
        let mut orchestrator = BacktestOrchestrator::new(engine_config(), strategy);
        let result =
            orchestrator.run_historical(&repo, &request(&["BTC-USDT", "ETH-USDT"]), &NoopControl);

        assert!(matches!(result.error, Some(RunError::DataFetch(_))));
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.metrics, PerformanceMetrics::empty());
    }

    #[test]
    fn missing_symbol_at_a_tick_carries_its_last_price_forward() {
        let repo = FakeRepository {
            series: HashMap::from([
                (
                    "AAA".to_string(),
                    vec![bar("AAA", 60, 100.0), bar("AAA", 180, 120.0)],
                ),
                (
                    "BBB".to_string(),
                    vec![bar("BBB", 60, 10.0), bar("BBB", 120, 10.0)],
                ),
            ]),
            failing: None,
        };
        let strategy =
            ScriptedStrategy::new(vec![Ok(vec![signal("AAA", Side::Buy)])], 1.0);
        let mut orchestrator = BacktestOrchestrator::new(engine_config(), strategy);
        let result = orchestrator
            .run_historical(&repo, &request(&["AAA", "BBB"]), &NoopControl);

        // union timeline 60, 120, 180; AAA has no bar at 120 so its value
        // carries at 100 there, then marks at 120.
        assert_eq!(result.equity_curve.len(), 3);
        let at_120 = &result.equity_curve[1];
        assert!((at_120.unrealized_pnl - 0.0).abs() < 1e-9);
        let at_180 = &result.equity_curve[2];
        assert!((at_180.unrealized_pnl - 20.0).abs() < 1e-9);
    }

    #[test]
    fn equity_timestamps_are_strictly_increasing_and_gapless() {
        let repo = FakeRepository {
            series: HashMap::from([(
                "BTC-USDT".to_string(),
                vec![
                    bar("BTC-USDT", 60, 100.0),
                    bar("BTC-USDT", 120, 101.0),
                    bar("BTC-USDT", 180, 99.0),
                ],
            )]),
            failing: None,
        };
        let strategy = ScriptedStrategy::new(vec![], 1.0);
        let mut orchestrator = BacktestOrchestrator::new(engine_config(), strategy);
        let result = orchestrator.run_historical(&repo, &request(&["BTC-USDT"]), &NoopControl);

        let timestamps: Vec<i64> = result.equity_curve.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![60, 120, 180]);
    }

    struct ScriptedFeed {
        events: VecDeque<Result<Option<Bar>, FeedError>>,
        closed: bool,
    }

    impl MarketFeed for ScriptedFeed {
        fn recv(&mut self, _timeout: Duration) -> Result<Option<Bar>, FeedError> {
            self.events
                .pop_front()
                .unwrap_or_else(|| Err(FeedError::Disconnected("end of script".to_string())))
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    struct ScriptedProvider {
        events: Mutex<Option<VecDeque<Result<Option<Bar>, FeedError>>>>,
    }

    impl MarketFeedProvider for ScriptedProvider {
        fn subscribe(
            &self,
            _symbols: &[String],
        ) -> Result<Box<dyn MarketFeed>, FeedError> {
            let events = self
                .events
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| FeedError::Subscribe("already subscribed".to_string()))?;
            Ok(Box::new(ScriptedFeed {
                events,
                closed: false,
            }))
        }
    }

    #[test]
    fn realtime_disconnect_finalizes_with_partial_results() {
        let provider = ScriptedProvider {
            events: Mutex::new(Some(VecDeque::from([
                Ok(Some(bar("BTC-USDT", 60, 100.0))),
                Ok(None),
                Ok(Some(bar("BTC-USDT", 120, 101.0))),
                Ok(None),
                Err(FeedError::Disconnected("socket closed".to_string())),
            ]))),
        };
        let strategy =
            ScriptedStrategy::new(vec![Ok(vec![signal("BTC-USDT", Side::Buy)])], 1.0);
        let mut orchestrator = BacktestOrchestrator::new(engine_config(), strategy);
        let result = orchestrator.run_realtime(
            &provider,
            &RealtimeRequest {
                symbols: vec!["BTC-USDT".to_string()],
                duration: Duration::from_secs(5),
            },
            &NoopControl,
        );

        assert!(matches!(result.error, Some(RunError::Feed(_))));
        assert_eq!(result.equity_curve.len(), 2);
        assert_eq!(result.final_positions["BTC-USDT"].quantity, 1.0);
    }

    #[test]
    fn realtime_drops_bars_at_or_before_the_last_processed_timestamp() {
        let provider = ScriptedProvider {
            events: Mutex::new(Some(VecDeque::from([
                Ok(Some(bar("BTC-USDT", 120, 100.0))),
                Ok(None),
                Ok(Some(bar("BTC-USDT", 60, 99.0))),
                Ok(Some(bar("BTC-USDT", 120, 100.5))),
                Ok(Some(bar("BTC-USDT", 180, 101.0))),
                Ok(None),
                Err(FeedError::Disconnected("end".to_string())),
            ]))),
        };
        let strategy = ScriptedStrategy::new(vec![], 1.0);
        let mut orchestrator = BacktestOrchestrator::new(engine_config(), strategy);
        let result = orchestrator.run_realtime(
            &provider,
            &RealtimeRequest {
                symbols: vec!["BTC-USDT".to_string()],
                duration: Duration::from_secs(5),
            },
            &NoopControl,
        );

        assert_eq!(result.dropped_bars, 2);
        let timestamps: Vec<i64> = result.equity_curve.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![120, 180]);
    }

    #[test]
    fn stop_signal_is_honored_between_ticks() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let provider = ScriptedProvider {
            events: Mutex::new(Some(VecDeque::from([Ok(Some(bar(
                "BTC-USDT", 60, 100.0,
            )))]))),
        };
        let stop = AtomicBool::new(false);
        stop.store(true, Ordering::Relaxed);
        let strategy = ScriptedStrategy::new(vec![], 1.0);
        let mut orchestrator = BacktestOrchestrator::new(engine_config(), strategy);
        let result = orchestrator.run_realtime(
            &provider,
            &RealtimeRequest {
                symbols: vec!["BTC-USDT".to_string()],
                duration: Duration::from_secs(60),
            },
            &stop,
        );

        assert!(result.error.is_none());
        assert!(result.equity_curve.is_empty());
    }

    #[test]
    fn expiring_limit_order_is_removed_and_counted() {
        // limit far below market never crosses; expires after one minute
        let repo = FakeRepository {
            series: HashMap::from([(
                "BTC-USDT".to_string(),
                vec![
                    bar("BTC-USDT", 60, 100.0),
                    bar("BTC-USDT", 120, 100.0),
                    bar("BTC-USDT", 300, 100.0),
                ],
            )]),
            failing: None,
        };
        let strategy =
            ScriptedStrategy::new(vec![Ok(vec![signal("BTC-USDT", Side::Buy)])], 1.0);
        let mut config = engine_config();
        config.order_policy = OrderPolicy {
            kind: OrderKind::Limit,
            limit_offset_bps: 500.0,
            expire_after_secs: Some(60),
        };
        let mut orchestrator = BacktestOrchestrator::new(config, strategy);
        let result = orchestrator.run_historical(&repo, &request(&["BTC-USDT"]), &NoopControl);

        assert_eq!(result.expired_orders, 1);
        assert!(result.trades.is_empty());
        assert!(!result.final_positions.contains_key("BTC-USDT"));
    }
}
