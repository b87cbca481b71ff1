//! Market and asset configuration.
//!
//! Configuration is owned by an external store and immutable for the duration
//! of a batch call. The engine reads it and, on liquidation, credits the
//! trader's realized loss back through the same store.

use crate::types::{AccountId, AssetId, Bps, FeedId, MarketId, Quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-market execution parameters. Immutable during a single batch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub id: MarketId,
    /// Human-readable name (e.g., "ETH-PERP")
    pub name: String,
    /// Primary oracle feed for this market.
    pub feed_id: FeedId,
    /// Bid/ask spread applied to every resolved price.
    pub spread: Bps,
    /// Orders younger than this are not executable yet.
    pub min_order_age: i64,
    /// Quotes older than this are too stale to act on.
    pub max_price_age: i64,
    /// Maximum tolerated deviation from the reference price.
    pub max_reference_deviation: Bps,
    /// When set, a missing reference price blocks execution instead of
    /// failing open.
    pub reference_required: bool,
    /// Fraction of margin that unrealized loss may erode before force-close.
    pub liquidation_threshold: Bps,
    pub trading_fee: Bps,
}

impl MarketConfig {
    /// A representative ETH perpetual used by the simulator and tests.
    pub fn eth_perp() -> Self {
        Self {
            id: MarketId(1),
            name: "ETH-PERP".to_string(),
            feed_id: FeedId(1),
            spread: Bps::new(100),
            min_order_age: 0,
            max_price_age: 60,
            max_reference_deviation: Bps::new(200),
            reference_required: false,
            liquidation_threshold: Bps::new(5000),
            trading_fee: Bps::new(10),
        }
    }
}

/// Per-asset parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub id: AssetId,
    pub symbol: String,
    /// Token decimals, used to scale raw margin units into a USD value for
    /// event enrichment.
    pub decimals: u32,
    pub min_size: Decimal,
    /// Secondary feed used for reference-price bounding and USD valuation.
    pub reference_feed_id: FeedId,
}

impl AssetConfig {
    /// 10^decimals, the divisor from raw token units to whole tokens.
    pub fn unit_scale(&self) -> Decimal {
        Decimal::from(10u64.pow(self.decimals))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MarketError {
    #[error("market {0:?} not found")]
    MarketNotFound(MarketId),

    #[error("asset {0:?} not found")]
    AssetNotFound(AssetId),

    #[error("{field} of {value} exceeds 10000 bps")]
    BpsOutOfRange { field: &'static str, value: u32 },
}

/// The configuration store contract the engine consumes.
pub trait MarketStore {
    fn get_market(&self, id: MarketId) -> Result<MarketConfig, MarketError>;
    fn get_asset(&self, id: AssetId) -> Result<AssetConfig, MarketError>;

    /// Credit a liquidated trader's realized loss (margin minus fee) to the
    /// pool backing this market.
    fn credit_trader_loss(
        &mut self,
        user: AccountId,
        asset: AssetId,
        market: MarketId,
        amount: Quote,
    ) -> Result<(), MarketError>;
}

/// In-memory configuration store. Bps fields that express a fraction are
/// validated loudly at registration; a silently wrapped parameter here would
/// corrupt every price downstream.
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    markets: HashMap<MarketId, MarketConfig>,
    assets: HashMap<AssetId, AssetConfig>,
    loss_pool: HashMap<(AssetId, MarketId), Quote>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_market(&mut self, config: MarketConfig) -> Result<MarketId, MarketError> {
        for (field, bps) in [
            ("spread", config.spread),
            ("max_reference_deviation", config.max_reference_deviation),
            ("liquidation_threshold", config.liquidation_threshold),
            ("trading_fee", config.trading_fee),
        ] {
            if bps.value() > 10_000 {
                return Err(MarketError::BpsOutOfRange {
                    field,
                    value: bps.value(),
                });
            }
        }
        let id = config.id;
        self.markets.insert(id, config);
        Ok(id)
    }

    pub fn add_asset(&mut self, config: AssetConfig) -> AssetId {
        let id = config.id;
        self.assets.insert(id, config);
        id
    }

    /// Accumulated trader losses credited against a market's pool.
    pub fn pool_balance(&self, asset: AssetId, market: MarketId) -> Quote {
        self.loss_pool
            .get(&(asset, market))
            .copied()
            .unwrap_or_else(Quote::zero)
    }
}

impl MarketStore for MarketRegistry {
    fn get_market(&self, id: MarketId) -> Result<MarketConfig, MarketError> {
        self.markets
            .get(&id)
            .cloned()
            .ok_or(MarketError::MarketNotFound(id))
    }

    fn get_asset(&self, id: AssetId) -> Result<AssetConfig, MarketError> {
        self.assets
            .get(&id)
            .cloned()
            .ok_or(MarketError::AssetNotFound(id))
    }

    fn credit_trader_loss(
        &mut self,
        _user: AccountId,
        asset: AssetId,
        market: MarketId,
        amount: Quote,
    ) -> Result<(), MarketError> {
        let balance = self
            .loss_pool
            .entry((asset, market))
            .or_insert_with(Quote::zero);
        *balance = balance.add(amount);
        Ok(())
    }
}
