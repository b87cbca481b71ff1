//! Audit events.
//!
//! Every committed keeper action leaves a trace here: skipped executions,
//! cancellations, liquidations and their failures, and admin parameter
//! changes. Events are serializable so a host can drain and persist them.

use crate::types::{AccountId, AssetId, Bps, MarketId, OrderId, Price, Quote, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// An order stayed in the book because a transient condition blocked it.
    ExecutionSkipped {
        order_id: OrderId,
        market: MarketId,
        price: Price,
        publish_time: Timestamp,
        reason: String,
    },
    /// An order was removed from the book with a terminal reason.
    OrderCancelled {
        order_id: OrderId,
        market: MarketId,
        price: Price,
        publish_time: Timestamp,
        reason: String,
    },
    /// A liquidation target could not be settled.
    LiquidationError {
        user: AccountId,
        asset: AssetId,
        market: MarketId,
        reason: String,
    },
    /// A position was force-closed.
    Liquidated {
        user: AccountId,
        asset: AssetId,
        market: MarketId,
        side: Side,
        size: Decimal,
        margin: Quote,
        margin_usd: Quote,
        price: Price,
        fee: Quote,
        pnl: Quote,
        funding_fee: Quote,
    },
    /// A trailing stop fired; records the reference it trailed against.
    TrailingStopExecuted {
        order_id: OrderId,
        market: MarketId,
        trail_reference: Price,
        price: Price,
    },
    KeeperUpdated {
        keeper: AccountId,
        allowed: bool,
    },
    LiquidationFeeUpdated {
        fee: Bps,
    },
    ReferenceMandatoryUpdated {
        mandatory: bool,
    },
}

impl EventPayload {
    /// Short tag used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::ExecutionSkipped { .. } => "execution-skipped",
            EventPayload::OrderCancelled { .. } => "order-cancelled",
            EventPayload::LiquidationError { .. } => "liquidation-error",
            EventPayload::Liquidated { .. } => "liquidated",
            EventPayload::TrailingStopExecuted { .. } => "trailing-stop-executed",
            EventPayload::KeeperUpdated { .. } => "keeper-updated",
            EventPayload::LiquidationFeeUpdated { .. } => "liquidation-fee-updated",
            EventPayload::ReferenceMandatoryUpdated { .. } => "reference-mandatory-updated",
        }
    }
}
