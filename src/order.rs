//! Pending orders and the order store contract.
//!
//! The engine never creates orders. It reads them from a store owned by the
//! order-submission component, decides their fate, and tells the store to
//! cancel or consume them. The store also owns the per-type time-to-live
//! configuration and the processing pause switch.

use crate::types::{AccountId, AssetId, Bps, MarketId, OrderId, Price, Quote, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Order type. Market orders fill immediately at the resolved price; the
/// trigger types wait for a directional condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    TrailingStop,
}

impl OrderType {
    /// Trigger orders get the long TTL; market orders the short one.
    pub fn is_trigger(&self) -> bool {
        !matches!(self, OrderType::Market)
    }
}

/// A pending order as read from the order store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: AccountId,
    pub asset: AssetId,
    pub market: MarketId,
    pub side: Side,
    pub size: Decimal,
    pub margin: Quote,
    pub order_type: OrderType,
    /// Trigger price for limit/stop orders; optional protective bound for
    /// market orders. None means no trigger/bound.
    pub price: Option<Price>,
    pub expiry: Option<Timestamp>,
    /// One-cancels-other link: executing this order cancels that one.
    pub cancel_order_id: Option<OrderId>,
    pub reduce_only: bool,
    /// Trailing distance in bps. Only meaningful for trailing stops.
    pub trail_bps: Option<Bps>,
    pub created_at: Timestamp,
}

impl Order {
    pub fn new_market(
        id: OrderId,
        owner: AccountId,
        asset: AssetId,
        market: MarketId,
        side: Side,
        size: Decimal,
        margin: Quote,
        protective_price: Option<Price>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner,
            asset,
            market,
            side,
            size,
            margin,
            order_type: OrderType::Market,
            price: protective_price,
            expiry: None,
            cancel_order_id: None,
            reduce_only: false,
            trail_bps: None,
            created_at,
        }
    }

    pub fn new_limit(
        id: OrderId,
        owner: AccountId,
        asset: AssetId,
        market: MarketId,
        side: Side,
        size: Decimal,
        margin: Quote,
        trigger_price: Price,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner,
            asset,
            market,
            side,
            size,
            margin,
            order_type: OrderType::Limit,
            price: Some(trigger_price),
            expiry: None,
            cancel_order_id: None,
            reduce_only: false,
            trail_bps: None,
            created_at,
        }
    }

    pub fn new_stop(
        id: OrderId,
        owner: AccountId,
        asset: AssetId,
        market: MarketId,
        side: Side,
        size: Decimal,
        margin: Quote,
        trigger_price: Price,
        created_at: Timestamp,
    ) -> Self {
        Self {
            order_type: OrderType::Stop,
            ..Self::new_limit(
                id, owner, asset, market, side, size, margin, trigger_price, created_at,
            )
        }
    }

    pub fn new_trailing_stop(
        id: OrderId,
        owner: AccountId,
        asset: AssetId,
        market: MarketId,
        side: Side,
        size: Decimal,
        margin: Quote,
        trail_bps: Bps,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner,
            asset,
            market,
            side,
            size,
            margin,
            order_type: OrderType::TrailingStop,
            price: None,
            expiry: None,
            cancel_order_id: None,
            reduce_only: true,
            trail_bps: Some(trail_bps),
            created_at,
        }
    }

    pub fn with_expiry(mut self, expiry: Timestamp) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_cancel_order(mut self, linked: OrderId) -> Self {
        self.cancel_order_id = Some(linked);
        self
    }

    pub fn as_reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    /// Seconds this order has been pending.
    pub fn age(&self, now: Timestamp) -> i64 {
        now.seconds_since(self.created_at)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expiry, Some(expiry) if now >= expiry)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderError {
    #[error("order {0:?} not found")]
    NotFound(OrderId),
}

/// The order store contract the engine consumes.
pub trait OrderStore {
    /// Look up a pending order. A stored zero-size order is a broken record
    /// and must read back as absent.
    fn get(&self, id: OrderId) -> Option<Order>;

    /// Consume an order that just executed.
    fn remove(&mut self, id: OrderId) -> Result<Order, OrderError>;

    /// Cancel an order with a reason, attributed to the acting caller.
    fn cancel(&mut self, id: OrderId, reason: &str, actor: AccountId) -> Result<Order, OrderError>;

    /// TTL for market orders, in seconds.
    fn max_market_order_ttl(&self) -> i64;

    /// TTL for limit/stop/trailing-stop orders, in seconds.
    fn max_trigger_order_ttl(&self) -> i64;

    /// When paused, no batch is processed at all.
    fn is_processing_paused(&self) -> bool;
}

pub const DEFAULT_MARKET_ORDER_TTL: i64 = 30 * 60;
pub const DEFAULT_TRIGGER_ORDER_TTL: i64 = 180 * 24 * 60 * 60;

/// In-memory order store. Keeps a cancellation journal so tests and the
/// simulator can audit why orders disappeared.
#[derive(Debug, Clone)]
pub struct OrderVault {
    orders: HashMap<OrderId, Order>,
    cancelled: Vec<(OrderId, String, AccountId)>,
    market_order_ttl: i64,
    trigger_order_ttl: i64,
    paused: bool,
}

impl Default for OrderVault {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderVault {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
            cancelled: Vec::new(),
            market_order_ttl: DEFAULT_MARKET_ORDER_TTL,
            trigger_order_ttl: DEFAULT_TRIGGER_ORDER_TTL,
            paused: false,
        }
    }

    pub fn insert(&mut self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn set_market_order_ttl(&mut self, secs: i64) {
        self.market_order_ttl = secs;
    }

    pub fn set_trigger_order_ttl(&mut self, secs: i64) {
        self.trigger_order_ttl = secs;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Cancellation journal: (order, reason, actor), oldest first.
    pub fn cancellations(&self) -> &[(OrderId, String, AccountId)] {
        &self.cancelled
    }
}

impl OrderStore for OrderVault {
    fn get(&self, id: OrderId) -> Option<Order> {
        self.orders
            .get(&id)
            .filter(|order| !order.size.is_zero())
            .cloned()
    }

    fn remove(&mut self, id: OrderId) -> Result<Order, OrderError> {
        self.orders.remove(&id).ok_or(OrderError::NotFound(id))
    }

    fn cancel(&mut self, id: OrderId, reason: &str, actor: AccountId) -> Result<Order, OrderError> {
        let order = self.orders.remove(&id).ok_or(OrderError::NotFound(id))?;
        self.cancelled.push((id, reason.to_string(), actor));
        Ok(order)
    }

    fn max_market_order_ttl(&self) -> i64 {
        self.market_order_ttl
    }

    fn max_trigger_order_ttl(&self) -> i64 {
        self.trigger_order_ttl
    }

    fn is_processing_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order(id: u64) -> Order {
        Order::new_limit(
            OrderId(id),
            AccountId(1),
            AssetId(1),
            MarketId(1),
            Side::Long,
            dec!(10),
            Quote::new(dec!(100)),
            Price::new_unchecked(dec!(1900)),
            Timestamp::from_secs(0),
        )
    }

    #[test]
    fn zero_size_order_reads_as_absent() {
        let mut vault = OrderVault::new();
        let mut order = sample_order(1);
        order.size = Decimal::ZERO;
        vault.insert(order);

        assert!(vault.contains(OrderId(1)));
        assert!(vault.get(OrderId(1)).is_none());
    }

    #[test]
    fn cancel_journals_reason_and_actor() {
        let mut vault = OrderVault::new();
        vault.insert(sample_order(1));

        vault.cancel(OrderId(1), "expired", AccountId(9)).unwrap();

        assert!(!vault.contains(OrderId(1)));
        let (id, reason, actor) = &vault.cancellations()[0];
        assert_eq!(*id, OrderId(1));
        assert_eq!(reason, "expired");
        assert_eq!(*actor, AccountId(9));

        let again = vault.cancel(OrderId(1), "expired", AccountId(9));
        assert!(matches!(again, Err(OrderError::NotFound(_))));
    }

    #[test]
    fn expiry_and_age() {
        let order = sample_order(1).with_expiry(Timestamp::from_secs(100));

        assert!(!order.is_expired(Timestamp::from_secs(99)));
        assert!(order.is_expired(Timestamp::from_secs(100)));
        assert_eq!(order.age(Timestamp::from_secs(45)), 45);
    }

    #[test]
    fn trailing_stop_is_reduce_only_trigger() {
        let order = Order::new_trailing_stop(
            OrderId(2),
            AccountId(1),
            AssetId(1),
            MarketId(1),
            Side::Short,
            dec!(5),
            Quote::new(dec!(50)),
            Bps::new(200),
            Timestamp::from_secs(0),
        );

        assert!(order.order_type.is_trigger());
        assert!(order.reduce_only);
        assert_eq!(order.trail_bps.unwrap().value(), 200);
    }
}
