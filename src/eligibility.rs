// 3.0: the per-order trigger state machine. evaluated once per order, in
// strict order; the first failing check decides the outcome. everything here
// is pure: the orchestrator resolves prices and looks up collaborators, this
// module only decides.
//
// the skip/cancel split is the contract. a Skip leaves the order pending for
// the next batch; a Cancel removes it. getting one wrong either strands dead
// orders or destroys live ones.

use crate::market::MarketConfig;
use crate::order::{Order, OrderType};
use crate::pricing::within_reference_bounds;
use crate::types::{Price, Side, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-fatal outcome. The order survives and is retried on a later call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Order younger than the market's minimum age.
    Early,
    /// Quote (or trail reference) older than the market's maximum price age.
    Stale,
    /// Trailing stop has no usable reference price.
    NoReferencePrice,
    /// Resolved price outside the reference band. Execution path only; the
    /// liquidation path treats the same condition as a hard error.
    ReferenceDeviation,
    /// Limit/stop trigger condition not met.
    NoExecution,
    /// Price has not crossed the trailing bound yet.
    NoTrailingStopExecution,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Early => "early",
            SkipReason::Stale => "stale",
            SkipReason::NoReferencePrice => "no-ref-price",
            SkipReason::ReferenceDeviation => "reference-price-deviation",
            SkipReason::NoExecution => "no-execution",
            SkipReason::NoTrailingStopExecution => "no-trailing-stop-execution",
        };
        f.write_str(s)
    }
}

/// Fatal outcome. The order is removed from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// Unknown id or zero size.
    NotFound,
    Expired,
    /// Older than the type-specific TTL.
    TooOld,
    /// Resolved price is zero (feed absent from the batch).
    NoPrice,
    /// Trigger order carries no trigger price.
    NoTriggerPrice,
    /// Market order's protective bound violated.
    Protected,
    /// Trailing stop without a positive trailing percentage.
    NoTrailingStopPercentage,
    /// Invalid position delta (e.g. reduce-only with nothing to reduce).
    Reduce,
    /// The linked one-cancels-other cancellation failed; the failure
    /// propagates to the triggering order.
    Linked(String),
    /// A collaborator rejected the fill; its reason is forwarded verbatim.
    Collaborator(String),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::NotFound => f.write_str("no-order"),
            CancelReason::Expired => f.write_str("expired"),
            CancelReason::TooOld => f.write_str("too-old"),
            CancelReason::NoPrice => f.write_str("no-price"),
            CancelReason::NoTriggerPrice => f.write_str("no-execution-price"),
            CancelReason::Protected => f.write_str("protected"),
            CancelReason::NoTrailingStopPercentage => f.write_str("no-trailing-stop-percentage"),
            CancelReason::Reduce => f.write_str("reduce"),
            CancelReason::Linked(reason) => f.write_str(reason),
            CancelReason::Collaborator(reason) => f.write_str(reason),
        }
    }
}

/// Per-order outcome of a batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Executed,
    /// No state change; the order remains pending.
    Skipped(SkipReason),
    /// The order was removed from storage.
    Cancelled(CancelReason),
}

impl Outcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Outcome::Executed)
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Outcome::Executed => None,
            Outcome::Skipped(reason) => Some(reason.to_string()),
            Outcome::Cancelled(reason) => Some(reason.to_string()),
        }
    }
}

/// What the pure machine tells the orchestrator to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    /// All checks passed; proceed to OCO and position delta.
    Proceed,
    Skip(SkipReason),
    Cancel(CancelReason),
}

/// Trailing reference supplied by the keeper: the moving price the trail is
/// measured from, with its own publish time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrailRef {
    pub price: Price,
    pub published_at: Timestamp,
}

/// Everything the trigger machine needs, resolved by the orchestrator.
#[derive(Debug, Clone)]
pub struct TriggerContext<'a> {
    pub order: &'a Order,
    pub market: &'a MarketConfig,
    pub now: Timestamp,
    /// TTL for market orders, from the order store.
    pub market_order_ttl: i64,
    /// TTL for trigger orders, from the order store.
    pub trigger_order_ttl: i64,
    /// Publish time of the price batch being acted on.
    pub batch_published_at: Timestamp,
    /// Resolved, spread-adjusted executable price. Zero means no price.
    pub price: Price,
    /// Reference price for deviation bounding. Zero means unavailable.
    pub reference_price: Price,
    /// Whether a missing reference blocks execution instead of failing open.
    pub reference_mandatory: bool,
    /// Trail reference for trailing stops. None on the plain execution path.
    pub trail: Option<TrailRef>,
}

/// Run the trigger state machine for one order.
///
/// Check order is part of the contract: expiry, then TTL, then minimum age,
/// then batch freshness, then price presence, then reference bounding, then
/// the type-specific trigger.
pub fn evaluate_trigger(ctx: &TriggerContext<'_>) -> TriggerDecision {
    let order = ctx.order;

    if order.is_expired(ctx.now) {
        return TriggerDecision::Cancel(CancelReason::Expired);
    }

    let ttl = if order.order_type.is_trigger() {
        ctx.trigger_order_ttl
    } else {
        ctx.market_order_ttl
    };
    if order.age(ctx.now) > ttl {
        return TriggerDecision::Cancel(CancelReason::TooOld);
    }

    if order.age(ctx.now) < ctx.market.min_order_age {
        return TriggerDecision::Skip(SkipReason::Early);
    }

    if ctx.now.seconds_since(ctx.batch_published_at) > ctx.market.max_price_age {
        return TriggerDecision::Skip(SkipReason::Stale);
    }

    if ctx.price.is_zero() {
        return TriggerDecision::Cancel(CancelReason::NoPrice);
    }

    if !within_reference_bounds(
        ctx.market.max_reference_deviation,
        ctx.reference_price,
        ctx.price,
        ctx.reference_mandatory,
    ) {
        return TriggerDecision::Skip(SkipReason::ReferenceDeviation);
    }

    match order.order_type {
        OrderType::Market => check_protective_bound(order, ctx.price),
        OrderType::Limit | OrderType::Stop => check_directional_trigger(order, ctx.price),
        OrderType::TrailingStop => check_trailing_stop(ctx),
    }
}

// market orders fill unconditionally unless a protective price says the fill
// got worse than the trader tolerates
fn check_protective_bound(order: &Order, price: Price) -> TriggerDecision {
    let Some(bound) = order.price else {
        return TriggerDecision::Proceed;
    };

    let worse = match order.side {
        Side::Long => price.value() > bound.value(),
        Side::Short => price.value() < bound.value(),
    };

    if worse {
        TriggerDecision::Cancel(CancelReason::Protected)
    } else {
        TriggerDecision::Proceed
    }
}

fn check_directional_trigger(order: &Order, price: Price) -> TriggerDecision {
    let Some(trigger) = order.price else {
        return TriggerDecision::Cancel(CancelReason::NoTriggerPrice);
    };

    let met = match (order.order_type, order.side) {
        // limit buy fills at or below the trigger, limit sell at or above
        (OrderType::Limit, Side::Long) => price.value() <= trigger.value(),
        (OrderType::Limit, Side::Short) => price.value() >= trigger.value(),
        // stop buy fires at or above the trigger, stop sell at or below
        (OrderType::Stop, Side::Long) => price.value() >= trigger.value(),
        (OrderType::Stop, Side::Short) => price.value() <= trigger.value(),
        _ => unreachable!("directional trigger only handles limit and stop"),
    };

    if met {
        TriggerDecision::Proceed
    } else {
        TriggerDecision::Skip(SkipReason::NoExecution)
    }
}

fn check_trailing_stop(ctx: &TriggerContext<'_>) -> TriggerDecision {
    let order = ctx.order;

    // a fraction above 10000 bps would push the short-side bound negative
    // and strand the order in a permanent skip
    let trail_bps = match order.trail_bps {
        Some(bps) if !bps.is_zero() && bps.value() <= 10_000 => bps,
        _ => return TriggerDecision::Cancel(CancelReason::NoTrailingStopPercentage),
    };

    // never trigger-evaluate against a missing or zero reference
    let Some(trail) = ctx.trail else {
        return TriggerDecision::Skip(SkipReason::NoReferencePrice);
    };
    if trail.price.is_zero() {
        return TriggerDecision::Skip(SkipReason::NoReferencePrice);
    }
    if ctx.now.seconds_since(trail.published_at) > ctx.market.max_price_age {
        return TriggerDecision::Skip(SkipReason::Stale);
    }

    let past_trail = match order.side {
        Side::Long => ctx.price.value() >= trail_bps.upper_bound(trail.price.value()),
        Side::Short => ctx.price.value() <= trail_bps.lower_bound(trail.price.value()),
    };

    if past_trail {
        TriggerDecision::Proceed
    } else {
        TriggerDecision::Skip(SkipReason::NoTrailingStopExecution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, AssetId, Bps, MarketId, OrderId, Quote};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn market() -> MarketConfig {
        let mut config = MarketConfig::eth_perp();
        config.min_order_age = 0;
        config.max_price_age = 60;
        config
    }

    fn limit_long(trigger: Decimal) -> Order {
        Order::new_limit(
            OrderId(1),
            AccountId(1),
            AssetId(1),
            MarketId(1),
            Side::Long,
            dec!(10),
            Quote::new(dec!(100)),
            Price::new_unchecked(trigger),
            Timestamp::from_secs(0),
        )
    }

    fn ctx<'a>(order: &'a Order, market: &'a MarketConfig, price: Decimal) -> TriggerContext<'a> {
        TriggerContext {
            order,
            market,
            now: Timestamp::from_secs(10),
            market_order_ttl: 1800,
            trigger_order_ttl: 15_552_000,
            batch_published_at: Timestamp::from_secs(10),
            price: Price::new_unchecked(price),
            reference_price: Price::zero(),
            reference_mandatory: false,
            trail: None,
        }
    }

    #[test]
    fn limit_buy_executes_below_trigger() {
        let market = market();
        let order = limit_long(dec!(1900));

        // better than limit: proceed
        assert_eq!(evaluate_trigger(&ctx(&order, &market, dec!(1880))), TriggerDecision::Proceed);
        // at the limit: proceed
        assert_eq!(evaluate_trigger(&ctx(&order, &market, dec!(1900))), TriggerDecision::Proceed);
        // worse than limit: soft skip, order survives
        assert_eq!(
            evaluate_trigger(&ctx(&order, &market, dec!(1920))),
            TriggerDecision::Skip(SkipReason::NoExecution)
        );
    }

    #[test]
    fn stop_directions() {
        let market = market();

        let mut stop_long = limit_long(dec!(2000));
        stop_long.order_type = OrderType::Stop;
        assert_eq!(evaluate_trigger(&ctx(&stop_long, &market, dec!(2010))), TriggerDecision::Proceed);
        assert_eq!(
            evaluate_trigger(&ctx(&stop_long, &market, dec!(1990))),
            TriggerDecision::Skip(SkipReason::NoExecution)
        );

        let mut stop_short = limit_long(dec!(2000));
        stop_short.order_type = OrderType::Stop;
        stop_short.side = Side::Short;
        assert_eq!(evaluate_trigger(&ctx(&stop_short, &market, dec!(1990))), TriggerDecision::Proceed);
        assert_eq!(
            evaluate_trigger(&ctx(&stop_short, &market, dec!(2010))),
            TriggerDecision::Skip(SkipReason::NoExecution)
        );
    }

    #[test]
    fn limit_sell_executes_at_or_above_trigger() {
        let market = market();
        let mut order = limit_long(dec!(2000));
        order.side = Side::Short;

        assert_eq!(evaluate_trigger(&ctx(&order, &market, dec!(2000))), TriggerDecision::Proceed);
        assert_eq!(
            evaluate_trigger(&ctx(&order, &market, dec!(1999))),
            TriggerDecision::Skip(SkipReason::NoExecution)
        );
    }

    #[test]
    fn expired_beats_everything() {
        let market = market();
        let order = limit_long(dec!(1900)).with_expiry(Timestamp::from_secs(5));

        // price is zero too, but expiry is checked first
        let mut c = ctx(&order, &market, dec!(0));
        c.price = Price::zero();
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Cancel(CancelReason::Expired));
    }

    #[test]
    fn too_old_per_type_ttl() {
        let market = market();

        let mut market_order = limit_long(dec!(1900));
        market_order.order_type = OrderType::Market;
        market_order.price = None;
        let mut c = ctx(&market_order, &market, dec!(2000));
        c.now = Timestamp::from_secs(1801);
        c.batch_published_at = c.now;
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Cancel(CancelReason::TooOld));

        // the same age is fine for a trigger order
        let trigger_order = limit_long(dec!(1900));
        let mut c = ctx(&trigger_order, &market, dec!(1880));
        c.now = Timestamp::from_secs(1801);
        c.batch_published_at = c.now;
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Proceed);
    }

    #[test]
    fn young_order_skips_early() {
        let mut market = market();
        market.min_order_age = 30;
        let order = limit_long(dec!(1900));

        let mut c = ctx(&order, &market, dec!(1880));
        c.now = Timestamp::from_secs(29);
        c.batch_published_at = c.now;
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Skip(SkipReason::Early));

        c.now = Timestamp::from_secs(30);
        c.batch_published_at = c.now;
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Proceed);
    }

    #[test]
    fn stale_batch_skips() {
        let market = market();
        let order = limit_long(dec!(1900));

        let mut c = ctx(&order, &market, dec!(1880));
        c.batch_published_at = Timestamp::from_secs(10);
        c.now = Timestamp::from_secs(71);
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Skip(SkipReason::Stale));
    }

    #[test]
    fn zero_price_cancels() {
        let market = market();
        let order = limit_long(dec!(1900));

        let mut c = ctx(&order, &market, dec!(1));
        c.price = Price::zero();
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Cancel(CancelReason::NoPrice));
    }

    #[test]
    fn reference_deviation_is_a_soft_skip() {
        let market = market();
        let order = limit_long(dec!(1900));

        // reference 2000, band [1960, 2040]; price 1880 is outside
        let mut c = ctx(&order, &market, dec!(1880));
        c.reference_price = Price::new_unchecked(dec!(2000));
        assert_eq!(
            evaluate_trigger(&c),
            TriggerDecision::Skip(SkipReason::ReferenceDeviation)
        );
    }

    #[test]
    fn protected_market_order() {
        let market = market();
        let mut order = limit_long(dec!(2000));
        order.order_type = OrderType::Market;

        // long fill above the protective bound is cancelled
        assert_eq!(
            evaluate_trigger(&ctx(&order, &market, dec!(2001))),
            TriggerDecision::Cancel(CancelReason::Protected)
        );
        assert_eq!(evaluate_trigger(&ctx(&order, &market, dec!(2000))), TriggerDecision::Proceed);

        // without a bound the market order always proceeds
        order.price = None;
        assert_eq!(evaluate_trigger(&ctx(&order, &market, dec!(9999))), TriggerDecision::Proceed);
    }

    #[test]
    fn trailing_stop_machine() {
        let market = market();
        let mut order = limit_long(dec!(0));
        order.order_type = OrderType::TrailingStop;
        order.price = None;
        order.trail_bps = Some(Bps::new(200));

        let trail = TrailRef {
            price: Price::new_unchecked(dec!(2000)),
            published_at: Timestamp::from_secs(10),
        };

        // bound for a long is 2000 * 10200 / 10000 = 2040
        let mut c = ctx(&order, &market, dec!(2050));
        c.trail = Some(trail);
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Proceed);

        let mut c = ctx(&order, &market, dec!(2030));
        c.trail = Some(trail);
        assert_eq!(
            evaluate_trigger(&c),
            TriggerDecision::Skip(SkipReason::NoTrailingStopExecution)
        );

        // missing trail reference is a skip, not a cancel
        let c = ctx(&order, &market, dec!(2050));
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Skip(SkipReason::NoReferencePrice));

        // zero trail reference likewise
        let mut c = ctx(&order, &market, dec!(2050));
        c.trail = Some(TrailRef {
            price: Price::zero(),
            published_at: Timestamp::from_secs(10),
        });
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Skip(SkipReason::NoReferencePrice));

        // stale trail reference
        let mut c = ctx(&order, &market, dec!(2050));
        c.trail = Some(TrailRef {
            price: Price::new_unchecked(dec!(2000)),
            published_at: Timestamp::from_secs(10),
        });
        c.now = Timestamp::from_secs(71);
        c.batch_published_at = c.now;
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Skip(SkipReason::Stale));

        // missing percentage is fatal
        order.trail_bps = None;
        let mut c = ctx(&order, &market, dec!(2050));
        c.trail = Some(trail);
        assert_eq!(
            evaluate_trigger(&c),
            TriggerDecision::Cancel(CancelReason::NoTrailingStopPercentage)
        );

        // so is a percentage past 10000 bps; 10000 itself is the legal limit
        order.trail_bps = Some(Bps::new(10_001));
        let mut c = ctx(&order, &market, dec!(2050));
        c.trail = Some(trail);
        assert_eq!(
            evaluate_trigger(&c),
            TriggerDecision::Cancel(CancelReason::NoTrailingStopPercentage)
        );

        order.trail_bps = Some(Bps::new(10_000));
        let mut c = ctx(&order, &market, dec!(4100));
        c.trail = Some(trail);
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Proceed);
    }

    #[test]
    fn trailing_stop_short_direction() {
        let market = market();
        let mut order = limit_long(dec!(0));
        order.order_type = OrderType::TrailingStop;
        order.price = None;
        order.side = Side::Short;
        order.trail_bps = Some(Bps::new(200));

        let trail = TrailRef {
            price: Price::new_unchecked(dec!(2000)),
            published_at: Timestamp::from_secs(10),
        };

        // bound for a short is 2000 * 9800 / 10000 = 1960
        let mut c = ctx(&order, &market, dec!(1950));
        c.trail = Some(trail);
        assert_eq!(evaluate_trigger(&c), TriggerDecision::Proceed);

        let mut c = ctx(&order, &market, dec!(1970));
        c.trail = Some(trail);
        assert_eq!(
            evaluate_trigger(&c),
            TriggerDecision::Skip(SkipReason::NoTrailingStopExecution)
        );
    }
}
