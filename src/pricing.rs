// 2.0: price resolution and reference bounding. both are pure functions and
// both sides of the engine (execution and liquidation) go through them. the
// asymmetric spread is intentional: every fill pays an implicit taker cost in
// the protocol's favor.

use crate::oracle::PriceBatch;
use crate::types::{Bps, FeedId, Price};
use rust_decimal::Decimal;

/// Resolve one executable price from a batch.
///
/// Locates the market's feed in the batch (absence yields a raw price of
/// zero, which callers treat as "no price") and applies the configured spread:
/// `spread = floor(raw * bps / 10000)`, added when `maximise` is set,
/// subtracted otherwise. `maximise` is true whenever the side needing the
/// price benefits from a higher post-spread price: a long order buying in, or
/// a short position being closed against its holder.
pub fn resolve_price(batch: &PriceBatch, feed: FeedId, spread: Bps, maximise: bool) -> Price {
    let raw = batch.price_for(feed);
    if raw.is_zero() {
        return Price::zero();
    }

    let adjustment = spread.floor_of(raw.value());
    let value = if maximise {
        raw.value() + adjustment
    } else {
        (raw.value() - adjustment).max(Decimal::ZERO)
    };

    Price::new_unchecked(value)
}

/// Check a resolved price against an independent reference price.
///
/// Fail-open when the reference is not mandatory and either the reference
/// price is zero (feed unavailable or unset) or the deviation is unconfigured.
/// Otherwise the price must lie in the inclusive band
/// `[floor(ref*(10000-dev)/10000), floor(ref*(10000+dev)/10000)]`.
///
/// Both the execution and liquidation paths call this; they react differently
/// to a failure (soft skip vs hard error) and that policy lives in the caller.
pub fn within_reference_bounds(
    max_deviation: Bps,
    reference: Price,
    price: Price,
    mandatory: bool,
) -> bool {
    if !mandatory && (reference.is_zero() || max_deviation.is_zero()) {
        return true;
    }

    let lower = max_deviation.lower_bound(reference.value());
    let upper = max_deviation.upper_bound(reference.value());
    price.value() >= lower && price.value() <= upper
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use rust_decimal_macros::dec;

    fn batch(price: Decimal) -> PriceBatch {
        PriceBatch::new(
            vec![(FeedId(1), Price::new_unchecked(price))],
            Timestamp::from_secs(0),
        )
    }

    #[test]
    fn spread_applied_per_maximise_flag() {
        // raw 2000, 1% spread: 2020 maximised, 1980 minimised
        let b = batch(dec!(2000));
        let spread = Bps::new(100);

        assert_eq!(resolve_price(&b, FeedId(1), spread, true).value(), dec!(2020));
        assert_eq!(resolve_price(&b, FeedId(1), spread, false).value(), dec!(1980));
    }

    #[test]
    fn spread_floors() {
        // 3 bps of 999 floors to 0, so both directions resolve to the raw price
        let b = batch(dec!(999));
        let spread = Bps::new(3);

        assert_eq!(resolve_price(&b, FeedId(1), spread, true).value(), dec!(999));
        assert_eq!(resolve_price(&b, FeedId(1), spread, false).value(), dec!(999));
    }

    #[test]
    fn absent_feed_resolves_to_zero() {
        let b = batch(dec!(2000));
        let resolved = resolve_price(&b, FeedId(42), Bps::new(100), true);
        assert!(resolved.is_zero());
    }

    #[test]
    fn zero_spread_is_identity() {
        let b = batch(dec!(2000));
        assert_eq!(resolve_price(&b, FeedId(1), Bps::zero(), true).value(), dec!(2000));
        assert_eq!(resolve_price(&b, FeedId(1), Bps::zero(), false).value(), dec!(2000));
    }

    #[test]
    fn bounds_inclusive_at_both_edges() {
        let reference = Price::new_unchecked(dec!(2000));
        let dev = Bps::new(200);

        // band is [1960, 2040], inclusive
        assert!(within_reference_bounds(dev, reference, Price::new_unchecked(dec!(1960)), true));
        assert!(within_reference_bounds(dev, reference, Price::new_unchecked(dec!(2040)), true));
        assert!(!within_reference_bounds(dev, reference, Price::new_unchecked(dec!(1959)), true));
        assert!(!within_reference_bounds(dev, reference, Price::new_unchecked(dec!(2041)), true));
    }

    #[test]
    fn fail_open_when_not_mandatory() {
        let price = Price::new_unchecked(dec!(2000));

        // zero reference, not mandatory: pass
        assert!(within_reference_bounds(Bps::new(200), Price::zero(), price, false));
        // zero deviation, not mandatory: pass
        assert!(within_reference_bounds(Bps::zero(), Price::new_unchecked(dec!(1)), price, false));
    }

    #[test]
    fn mandatory_blocks_zero_reference() {
        let price = Price::new_unchecked(dec!(2000));

        // mandatory with no reference: the band is [0, 0], price fails
        assert!(!within_reference_bounds(Bps::new(200), Price::zero(), price, true));
        // mandatory with zero deviation: band collapses to the reference itself
        assert!(within_reference_bounds(
            Bps::zero(),
            Price::new_unchecked(dec!(2000)),
            price,
            true
        ));
        assert!(!within_reference_bounds(
            Bps::zero(),
            Price::new_unchecked(dec!(1999)),
            price,
            true
        ));
    }
}
