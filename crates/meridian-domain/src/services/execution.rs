use crate::value_objects::bar::Bar;
use crate::value_objects::fill::Fill;
use crate::value_objects::order::{OrderKind, OrderRequest};
use crate::value_objects::side::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlippageModel {
    /// Fixed fraction of the fill price.
    Basic,
    /// Scales with order notional relative to the bar's volume; falls back
    /// to the basic model on zero-volume bars.
    VolumeBased,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionConfig {
    pub commission_rate: f64,
    pub slippage_model: SlippageModel,
    pub slippage_factor: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            commission_rate: 0.001,
            slippage_model: SlippageModel::Basic,
            slippage_factor: 0.0001,
        }
    }
}

/// Outcome of evaluating one order against one bar.
#[derive(Debug, Clone, PartialEq)]
pub enum FillDecision {
    Filled(Fill),
    /// Conditions not met; re-evaluate on the next bar.
    Pending,
    /// Time-in-force deadline passed before the order could fill.
    Expired,
}

/// Decides fill/no-fill, fill price, fee, and slippage for one order against
/// the current bar. Uses only that bar's own data: a market order fills at
/// the bar close, never at a price from a later bar.
#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    config: ExecutionConfig,
}

impl ExecutionSimulator {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn try_fill(&self, order: &OrderRequest, bar: &Bar) -> FillDecision {
        if order.expires_before(bar.timestamp) {
            return FillDecision::Expired;
        }

        let price = match self.fill_price(order, bar) {
            Some(price) => price,
            None => return FillDecision::Pending,
        };

        let fee = order.quantity * price * self.config.commission_rate;
        let slippage = self.slippage(order.quantity, price, bar);

        FillDecision::Filled(Fill {
            order_id: order.id,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price,
            fee,
            slippage,
            timestamp: bar.timestamp,
        })
    }

    fn fill_price(&self, order: &OrderRequest, bar: &Bar) -> Option<f64> {
        match order.kind {
            OrderKind::Market => Some(bar.close),
            OrderKind::Limit => {
                let limit = order.limit_price?;
                let crossed = match order.side {
                    Side::Buy => bar.low <= limit,
                    Side::Sell => bar.high >= limit,
                };
                // A crossed limit fills at the limit price, not at the extreme.
                crossed.then_some(limit)
            }
        }
    }

    fn slippage(&self, quantity: f64, price: f64, bar: &Bar) -> f64 {
        let base = price * self.config.slippage_factor;
        match self.config.slippage_model {
            SlippageModel::Basic => base.abs(),
            SlippageModel::VolumeBased => {
                if bar.volume > 0.0 {
                    let volume_ratio = (quantity * price) / bar.volume;
                    (base * (1.0 + volume_ratio)).abs()
                } else {
                    base.abs()
                }
            }
        }
    }
}
