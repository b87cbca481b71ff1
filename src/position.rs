// 4.0: open positions and the position store contract.
// positions are owned by an external collaborator. the engine never mutates
// one directly; it asks the store to increase, decrease or remove, and the
// store reports failures that the engine turns into cancellations.

use crate::order::Order;
use crate::types::{AccountId, AssetId, MarketId, Price, Quote, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An open position as read from the position store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub owner: AccountId,
    pub asset: AssetId,
    pub market: MarketId,
    pub side: Side,
    pub size: Decimal,
    pub margin: Quote,
    pub entry_price: Price,
    /// Funding index at the last settlement for this position.
    pub funding_index: Decimal,
}

/// What the store reports for a position at a given price.
#[derive(Debug, Clone, Copy)]
pub struct PnlBreakdown {
    pub pnl: Quote,
    pub funding_fee: Quote,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PositionError {
    #[error("no position for account {0:?}")]
    NotFound(AccountId),

    #[error("order size {size} exceeds open position size {open}")]
    OverReduce { size: Decimal, open: Decimal },

    #[error("order size {size} below market minimum {minimum}")]
    BelowMinSize { size: Decimal, minimum: Decimal },

    #[error("increase must match the open position side")]
    SideMismatch,
}

/// The position store contract the engine consumes.
pub trait PositionStore {
    fn get_position(&self, owner: AccountId, asset: AssetId, market: MarketId)
        -> Option<Position>;

    /// PnL and outstanding funding fee for a hypothetical close at `price`.
    #[allow(clippy::too_many_arguments)]
    fn get_pnl(
        &self,
        asset: AssetId,
        market: MarketId,
        side: Side,
        price: Price,
        entry_price: Price,
        size: Decimal,
        funding_index: Decimal,
    ) -> Result<PnlBreakdown, PositionError>;

    /// Open or add to a position from an executed order.
    fn increase_position(
        &mut self,
        order: &Order,
        price: Price,
        actor: AccountId,
    ) -> Result<(), PositionError>;

    /// Reduce an opposing position from an executed order.
    fn decrease_position(
        &mut self,
        order: &Order,
        price: Price,
        trailing_close: bool,
        actor: AccountId,
    ) -> Result<(), PositionError>;

    /// Credit a trading or liquidation fee.
    fn credit_fee(
        &mut self,
        user: AccountId,
        asset: AssetId,
        market: MarketId,
        fee: Quote,
        is_liquidation: bool,
    ) -> Result<(), PositionError>;

    /// Remove `size` from the market's open interest on `side`.
    fn decrement_open_interest(
        &mut self,
        asset: AssetId,
        market: MarketId,
        size: Decimal,
        side: Side,
    ) -> Result<(), PositionError>;

    /// Drop a position entirely (liquidation endpoint).
    fn remove(
        &mut self,
        owner: AccountId,
        asset: AssetId,
        market: MarketId,
    ) -> Result<(), PositionError>;
}

/// In-memory position store with weighted-average entries, linear pnl and a
/// per-market funding index.
#[derive(Debug, Clone)]
pub struct PositionBook {
    positions: HashMap<(AccountId, AssetId, MarketId), Position>,
    funding_index: HashMap<(AssetId, MarketId), Decimal>,
    open_interest: HashMap<(AssetId, MarketId, Side), Decimal>,
    fees_collected: Quote,
    min_size: Decimal,
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionBook {
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
            funding_index: HashMap::new(),
            open_interest: HashMap::new(),
            fees_collected: Quote::zero(),
            min_size: Decimal::ZERO,
        }
    }

    pub fn set_min_size(&mut self, min_size: Decimal) {
        self.min_size = min_size;
    }

    pub fn set_funding_index(&mut self, asset: AssetId, market: MarketId, index: Decimal) {
        self.funding_index.insert((asset, market), index);
    }

    pub fn current_funding_index(&self, asset: AssetId, market: MarketId) -> Decimal {
        self.funding_index
            .get(&(asset, market))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn open_interest(&self, asset: AssetId, market: MarketId, side: Side) -> Decimal {
        self.open_interest
            .get(&(asset, market, side))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn fees_collected(&self) -> Quote {
        self.fees_collected
    }

    /// Seed a position directly, bypassing order flow. For tests and the
    /// simulator.
    pub fn seed(&mut self, position: Position) {
        let key = (position.owner, position.asset, position.market);
        let oi = self
            .open_interest
            .entry((position.asset, position.market, position.side))
            .or_insert(Decimal::ZERO);
        *oi += position.size;
        self.positions.insert(key, position);
    }
}

impl PositionStore for PositionBook {
    fn get_position(
        &self,
        owner: AccountId,
        asset: AssetId,
        market: MarketId,
    ) -> Option<Position> {
        self.positions.get(&(owner, asset, market)).cloned()
    }

    fn get_pnl(
        &self,
        asset: AssetId,
        market: MarketId,
        side: Side,
        price: Price,
        entry_price: Price,
        size: Decimal,
        funding_index: Decimal,
    ) -> Result<PnlBreakdown, PositionError> {
        // longs gain when price rises, shorts when it falls
        let pnl = side.sign() * size * (price.value() - entry_price.value());

        // positive index delta means longs pay, shorts earn
        let index_delta = self.current_funding_index(asset, market) - funding_index;
        let funding_fee = side.sign() * size * index_delta;

        Ok(PnlBreakdown {
            pnl: Quote::new(pnl),
            funding_fee: Quote::new(funding_fee),
        })
    }

    fn increase_position(
        &mut self,
        order: &Order,
        price: Price,
        _actor: AccountId,
    ) -> Result<(), PositionError> {
        if order.size < self.min_size {
            return Err(PositionError::BelowMinSize {
                size: order.size,
                minimum: self.min_size,
            });
        }

        let key = (order.owner, order.asset, order.market);
        let funding_index = self.current_funding_index(order.asset, order.market);

        match self.positions.get_mut(&key) {
            Some(position) => {
                if position.side != order.side {
                    return Err(PositionError::SideMismatch);
                }
                // weighted-average entry price across the old and new size
                let total = position.size + order.size;
                let weighted = position.size * position.entry_price.value()
                    + order.size * price.value();
                position.entry_price = Price::new_unchecked(weighted / total);
                position.size = total;
                position.margin = position.margin.add(order.margin);
                position.funding_index = funding_index;
            }
            None => {
                self.positions.insert(
                    key,
                    Position {
                        owner: order.owner,
                        asset: order.asset,
                        market: order.market,
                        side: order.side,
                        size: order.size,
                        margin: order.margin,
                        entry_price: price,
                        funding_index,
                    },
                );
            }
        }

        let oi = self
            .open_interest
            .entry((order.asset, order.market, order.side))
            .or_insert(Decimal::ZERO);
        *oi += order.size;

        Ok(())
    }

    fn decrease_position(
        &mut self,
        order: &Order,
        _price: Price,
        _trailing_close: bool,
        _actor: AccountId,
    ) -> Result<(), PositionError> {
        let key = (order.owner, order.asset, order.market);
        let position = self
            .positions
            .get_mut(&key)
            .ok_or(PositionError::NotFound(order.owner))?;

        if position.size < order.size {
            return Err(PositionError::OverReduce {
                size: order.size,
                open: position.size,
            });
        }

        let position_side = position.side;
        // margin comes off pro-rata with the closed size
        let released = Quote::new(position.margin.value() * order.size / position.size);
        position.margin = position.margin.sub(released);
        position.size -= order.size;

        if position.size.is_zero() {
            self.positions.remove(&key);
        }

        let oi = self
            .open_interest
            .entry((order.asset, order.market, position_side))
            .or_insert(Decimal::ZERO);
        *oi = (*oi - order.size).max(Decimal::ZERO);

        Ok(())
    }

    fn credit_fee(
        &mut self,
        _user: AccountId,
        _asset: AssetId,
        _market: MarketId,
        fee: Quote,
        _is_liquidation: bool,
    ) -> Result<(), PositionError> {
        self.fees_collected = self.fees_collected.add(fee);
        Ok(())
    }

    fn decrement_open_interest(
        &mut self,
        asset: AssetId,
        market: MarketId,
        size: Decimal,
        side: Side,
    ) -> Result<(), PositionError> {
        let oi = self
            .open_interest
            .entry((asset, market, side))
            .or_insert(Decimal::ZERO);
        *oi = (*oi - size).max(Decimal::ZERO);
        Ok(())
    }

    fn remove(
        &mut self,
        owner: AccountId,
        asset: AssetId,
        market: MarketId,
    ) -> Result<(), PositionError> {
        self.positions
            .remove(&(owner, asset, market))
            .map(|_| ())
            .ok_or(PositionError::NotFound(owner))
    }
}
