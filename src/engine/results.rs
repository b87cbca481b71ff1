//! Batch results and engine-level errors.

use crate::eligibility::Outcome;
use crate::liquidation::LiquidationOutcome;
use crate::oracle::OracleError;
use crate::types::{AccountId, AssetId, MarketId, OrderId, Quote};

/// Result of one keeper execution batch. Outcomes are reported in input
/// order; the refund is the unspent oracle fee, returned exactly once per
/// call regardless of how many orders were processed.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<(OrderId, Outcome)>,
    pub refund: Quote,
}

impl BatchReport {
    pub fn executed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_executed())
            .count()
    }
}

/// One position to liquidate, addressed by its owning tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationTarget {
    pub user: AccountId,
    pub asset: AssetId,
    pub market: MarketId,
}

/// Result of one keeper liquidation batch.
#[derive(Debug, Clone)]
pub struct LiquidationReport {
    pub outcomes: Vec<(LiquidationTarget, LiquidationOutcome)>,
    pub refund: Quote,
}

impl LiquidationReport {
    pub fn liquidated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_liquidated())
            .count()
    }
}

/// Errors that abort an entire engine call. Per-item failures never surface
/// here; they land in the report outcomes instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("caller is not a whitelisted keeper")]
    NotKeeper,

    #[error("caller is not the engine admin")]
    Unauthorized,

    #[error("order processing is paused")]
    ProcessingPaused,

    #[error("engine call re-entered while another call is in progress")]
    ReenteredCall,

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("order {order_id:?} rejected: {reason}")]
    OrderRejected { order_id: OrderId, reason: String },

    #[error("account {user:?} does not own order {order_id:?}")]
    NotOrderOwner { order_id: OrderId, user: AccountId },

    #[error("expected {expected} trail references, got {got}")]
    TrailRefMismatch { expected: usize, got: usize },

    #[error("liquidation fee of {0} exceeds 10000 bps")]
    FeeOutOfRange(u32),
}
