// Oracle price service.
//
// The engine is agnostic to whether quotes come from Pyth, Chainlink, a CEX
// aggregator or a custom oracle. It consumes two things: a metered batch draw
// (every quote in one call shares a single publish clock) and a lower-frequency
// reference price used to bound the executable price. Reference staleness is
// the oracle's problem, not the engine's.

use crate::types::{FeedId, Price, Quote, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One batch of raw quotes. Parallel (feed, price) entries plus a single
/// publish timestamp: all quotes drawn in one call share one freshness clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBatch {
    pub entries: Vec<(FeedId, Price)>,
    pub published_at: Timestamp,
}

impl PriceBatch {
    pub fn new(entries: Vec<(FeedId, Price)>, published_at: Timestamp) -> Self {
        Self {
            entries,
            published_at,
        }
    }

    /// Raw price for a feed. Absent feed resolves to zero, which downstream
    /// logic treats as "no price".
    pub fn price_for(&self, feed: FeedId) -> Price {
        self.entries
            .iter()
            .find(|(id, _)| *id == feed)
            .map(|(_, price)| *price)
            .unwrap_or_else(Price::zero)
    }

    /// Whole seconds since this batch was published.
    pub fn age(&self, now: Timestamp) -> i64 {
        now.seconds_since(self.published_at)
    }
}

/// A successful batch draw: the quotes plus the unspent portion of the
/// prepaid lookup fee.
#[derive(Debug, Clone)]
pub struct PriceDraw {
    pub batch: PriceBatch,
    pub refund: Quote,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("prepaid fee {provided} below required {required}")]
    InsufficientFee { required: Quote, provided: Quote },

    #[error("no reference price published for feed {0:?}")]
    ReferenceUnavailable(FeedId),

    #[error("reference price for feed {0:?} is stale")]
    StaleReference(FeedId),
}

/// The oracle contract the engine consumes.
pub trait OracleClient {
    /// Draw one batch of raw quotes for the given feeds. The caller prepays
    /// the lookup fee; the unspent portion comes back in the draw.
    fn get_prices(&mut self, feeds: &[FeedId], fee_prepaid: Quote)
        -> Result<PriceDraw, OracleError>;

    /// Secondary, lower-frequency reference price. Staleness is enforced here,
    /// inside the oracle component.
    fn get_reference_price(&self, feed: FeedId, now: Timestamp) -> Result<Price, OracleError>;
}

/// In-memory oracle. Feeds are posted by tests and the simulator; the batch
/// draw meters a flat per-feed fee and refunds the rest.
#[derive(Debug, Clone)]
pub struct OracleHub {
    prices: HashMap<FeedId, Price>,
    published_at: Timestamp,
    reference: HashMap<FeedId, (Price, Timestamp)>,
    max_reference_age: i64,
    fee_per_feed: Quote,
}

impl OracleHub {
    pub fn new(fee_per_feed: Quote, max_reference_age: i64) -> Self {
        Self {
            prices: HashMap::new(),
            published_at: Timestamp::from_secs(0),
            reference: HashMap::new(),
            max_reference_age,
            fee_per_feed,
        }
    }

    /// Post a raw quote. The publish clock applies to every posted feed.
    pub fn post_price(&mut self, feed: FeedId, price: Price) {
        self.prices.insert(feed, price);
    }

    pub fn set_published_at(&mut self, at: Timestamp) {
        self.published_at = at;
    }

    pub fn post_reference(&mut self, feed: FeedId, price: Price, at: Timestamp) {
        self.reference.insert(feed, (price, at));
    }

    pub fn clear_reference(&mut self, feed: FeedId) {
        self.reference.remove(&feed);
    }

    pub fn fee_per_feed(&self) -> Quote {
        self.fee_per_feed
    }
}

impl OracleClient for OracleHub {
    fn get_prices(
        &mut self,
        feeds: &[FeedId],
        fee_prepaid: Quote,
    ) -> Result<PriceDraw, OracleError> {
        let required = Quote::new(
            self.fee_per_feed.value() * rust_decimal::Decimal::from(feeds.len() as u64),
        );
        if fee_prepaid < required {
            return Err(OracleError::InsufficientFee {
                required,
                provided: fee_prepaid,
            });
        }

        let entries = feeds
            .iter()
            .map(|feed| {
                let price = self.prices.get(feed).copied().unwrap_or_else(Price::zero);
                (*feed, price)
            })
            .collect();

        Ok(PriceDraw {
            batch: PriceBatch::new(entries, self.published_at),
            refund: fee_prepaid.sub(required),
        })
    }

    fn get_reference_price(&self, feed: FeedId, now: Timestamp) -> Result<Price, OracleError> {
        let (price, posted_at) = self
            .reference
            .get(&feed)
            .copied()
            .ok_or(OracleError::ReferenceUnavailable(feed))?;

        if now.seconds_since(posted_at) > self.max_reference_age {
            return Err(OracleError::StaleReference(feed));
        }

        Ok(price)
    }
}
