use crate::errors::OrderValidationError;
use crate::value_objects::side::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
}

/// Expiry is a hard cutoff: a pending order whose deadline has passed is
/// dropped and reported as expired, never evaluated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    GoodTillCancelled,
    GoodTillTime { expires_at: i64 },
}

/// An order as submitted to the execution simulator. Never mutated after
/// creation; lifecycle changes (fill, expiry) are separate events.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub id: u64,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub time_in_force: TimeInForce,
    pub created_at: i64,
}

impl OrderRequest {
    pub fn market(
        id: u64,
        symbol: String,
        side: Side,
        quantity: f64,
        time_in_force: TimeInForce,
        created_at: i64,
    ) -> Result<Self, OrderValidationError> {
        validate_quantity(quantity)?;
        Ok(Self {
            id,
            symbol,
            side,
            kind: OrderKind::Market,
            quantity,
            limit_price: None,
            time_in_force,
            created_at,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn limit(
        id: u64,
        symbol: String,
        side: Side,
        quantity: f64,
        limit_price: f64,
        time_in_force: TimeInForce,
        created_at: i64,
    ) -> Result<Self, OrderValidationError> {
        validate_quantity(quantity)?;
        if !limit_price.is_finite() || limit_price <= 0.0 {
            return Err(OrderValidationError::NonPositiveLimitPrice(limit_price));
        }
        Ok(Self {
            id,
            symbol,
            side,
            kind: OrderKind::Limit,
            quantity,
            limit_price: Some(limit_price),
            time_in_force,
            created_at,
        })
    }

    pub fn expires_before(&self, timestamp: i64) -> bool {
        match self.time_in_force {
            TimeInForce::GoodTillCancelled => false,
            TimeInForce::GoodTillTime { expires_at } => timestamp > expires_at,
        }
    }
}

fn validate_quantity(quantity: f64) -> Result<(), OrderValidationError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(OrderValidationError::NonPositiveQuantity(quantity));
    }
    Ok(())
}
