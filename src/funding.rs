//! Funding accrual service contract.
//!
//! Funding arithmetic lives outside the engine. The engine's only obligation
//! is ordering: on liquidation the tracker must be updated while the position
//! still counts toward open interest, i.e. strictly before the OI decrement.

use crate::types::{AssetId, MarketId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

#[derive(Debug, Clone, thiserror::Error)]
pub enum FundingError {
    #[error("funding tracker rejected market {0:?}")]
    Rejected(MarketId),
}

pub trait FundingTracker {
    /// Settle funding accrual for a market up to now.
    fn update_funding_tracker(
        &mut self,
        asset: AssetId,
        market: MarketId,
    ) -> Result<(), FundingError>;
}

/// In-memory tracker. Each update bumps a per-market index and a counter so
/// tests can assert both that updates happened and how often.
#[derive(Debug, Clone, Default)]
pub struct FundingBook {
    index: HashMap<(AssetId, MarketId), Decimal>,
    updates: HashMap<(AssetId, MarketId), u64>,
}

impl FundingBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self, asset: AssetId, market: MarketId) -> Decimal {
        self.index
            .get(&(asset, market))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn update_count(&self, asset: AssetId, market: MarketId) -> u64 {
        self.updates.get(&(asset, market)).copied().unwrap_or(0)
    }
}

impl FundingTracker for FundingBook {
    fn update_funding_tracker(
        &mut self,
        asset: AssetId,
        market: MarketId,
    ) -> Result<(), FundingError> {
        let index = self.index.entry((asset, market)).or_insert(Decimal::ZERO);
        *index += dec!(0.0001);
        *self.updates.entry((asset, market)).or_insert(0) += 1;
        Ok(())
    }
}
