//! Liquidation decision logic.
//!
//! A position is force-closed when unrealized loss has eroded the configured
//! fraction of its margin. The test is inclusive: a pnl sitting exactly at
//! the negative threshold liquidates. The settlement sequencing that follows
//! a positive decision lives in the engine; this module only decides and
//! describes.

use crate::types::{AccountId, AssetId, Bps, MarketId, Price, Quote, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// floor(margin * threshold_bps / 10000): the loss a position may carry
/// before it is liquidatable.
pub fn liquidation_threshold(margin: Quote, threshold: Bps) -> Quote {
    Quote::new(threshold.floor_of(margin.value()))
}

/// Inclusive breach test: liquidate iff `pnl <= -threshold`.
pub fn breaches_margin(pnl: Quote, margin: Quote, threshold: Bps) -> bool {
    pnl.value() <= -liquidation_threshold(margin, threshold).value()
}

/// Combined liquidation + trading fee:
/// floor(size * (trading_fee_bps + liquidation_fee_bps) / 10000).
pub fn liquidation_fee(size: Decimal, trading_fee: Bps, liquidation_fee: Bps) -> Quote {
    let combined = Bps::new(trading_fee.value() + liquidation_fee.value());
    Quote::new(combined.floor_of(size))
}

/// Why a liquidation attempt did not settle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidationSkip {
    /// No open position for the (user, asset, market) tuple.
    NoPosition,
    /// Price batch older than the market's maximum price age.
    Stale,
    /// Resolved price is zero.
    NoPrice,
    /// Resolved price outside the reference band. Hard error here: a
    /// liquidation must never act on a suspect price, in contrast to the
    /// soft skip the execution path uses.
    ReferenceDeviation,
    /// Margin not breached. No event is emitted for this.
    NotLiquidatable,
    /// A collaborator rejected part of the settlement.
    Collaborator(String),
}

impl fmt::Display for LiquidationSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidationSkip::NoPosition => f.write_str("position"),
            LiquidationSkip::Stale => f.write_str("stale"),
            LiquidationSkip::NoPrice => f.write_str("no-price"),
            LiquidationSkip::ReferenceDeviation => f.write_str("reference-price-deviation"),
            LiquidationSkip::NotLiquidatable => f.write_str("not-liquidatable"),
            LiquidationSkip::Collaborator(reason) => f.write_str(reason),
        }
    }
}

/// Full financial summary of one settled liquidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationRecord {
    pub user: AccountId,
    pub asset: AssetId,
    pub market: MarketId,
    pub side: Side,
    pub size: Decimal,
    pub margin: Quote,
    /// Best-effort USD value of the margin. A failed secondary lookup yields
    /// zero; it never blocks settlement.
    pub margin_usd: Quote,
    pub price: Price,
    pub fee: Quote,
    pub pnl: Quote,
    pub funding_fee: Quote,
}

/// Per-target outcome of a liquidation batch item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LiquidationOutcome {
    Liquidated(LiquidationRecord),
    Skipped(LiquidationSkip),
}

impl LiquidationOutcome {
    pub fn is_liquidated(&self) -> bool {
        matches!(self, LiquidationOutcome::Liquidated(_))
    }
}
