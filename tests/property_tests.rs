//! Property-based tests for the pricing and liquidation math.
//!
//! These tests verify invariants hold under random inputs.

use exec_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;

// Strategies for generating test data
fn raw_price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(Decimal::from)
}

fn bps_strategy() -> impl Strategy<Value = u32> {
    1u32..=10_000u32
}

fn batch_for(raw: Decimal) -> PriceBatch {
    PriceBatch::new(
        vec![(FeedId(1), Price::new_unchecked(raw))],
        Timestamp::from_secs(0),
    )
}

proptest! {
    /// A maximised price is never below raw, a minimised one never above,
    /// and the two sit symmetric around raw by the floored spread.
    #[test]
    fn resolved_price_brackets_raw(
        raw in raw_price_strategy(),
        spread_bps in 0u32..=10_000u32,
    ) {
        let batch = batch_for(raw);
        let spread = Bps::new(spread_bps);

        let ask = resolve_price(&batch, FeedId(1), spread, true);
        let bid = resolve_price(&batch, FeedId(1), spread, false);

        prop_assert!(ask.value() >= raw);
        prop_assert!(bid.value() <= raw);

        let adjustment = spread.floor_of(raw);
        prop_assert_eq!(ask.value() - raw, adjustment);
        prop_assert_eq!(raw - bid.value(), adjustment);
    }

    /// Resolved prices never go negative, whatever the spread.
    #[test]
    fn resolved_price_never_negative(
        raw in raw_price_strategy(),
        spread_bps in 0u32..=10_000u32,
    ) {
        let batch = batch_for(raw);
        let bid = resolve_price(&batch, FeedId(1), Bps::new(spread_bps), false);
        prop_assert!(bid.value() >= Decimal::ZERO);
    }

    /// The reference band is inclusive at both edges and exclusive just
    /// outside them.
    #[test]
    fn reference_band_edges_inclusive(
        reference in raw_price_strategy(),
        dev_bps in bps_strategy(),
    ) {
        let dev = Bps::new(dev_bps);
        let reference = Price::new_unchecked(reference);

        let lower = dev.lower_bound(reference.value());
        let upper = dev.upper_bound(reference.value());

        prop_assert!(within_reference_bounds(dev, reference, Price::new_unchecked(lower), true));
        prop_assert!(within_reference_bounds(dev, reference, Price::new_unchecked(upper), true));
        prop_assert!(!within_reference_bounds(
            dev,
            reference,
            Price::new_unchecked(upper + Decimal::ONE),
            true
        ));
        if lower >= Decimal::ONE {
            prop_assert!(!within_reference_bounds(
                dev,
                reference,
                Price::new_unchecked(lower - Decimal::ONE),
                true
            ));
        }
    }

    /// A zero reference always passes when not mandatory and always fails
    /// when mandatory (no positive price fits a [0, 0] band).
    #[test]
    fn zero_reference_fail_open_split(
        price in raw_price_strategy(),
        dev_bps in bps_strategy(),
    ) {
        let dev = Bps::new(dev_bps);
        let price = Price::new_unchecked(price);

        prop_assert!(within_reference_bounds(dev, Price::zero(), price, false));
        prop_assert!(!within_reference_bounds(dev, Price::zero(), price, true));
    }

    /// The margin breach test fires exactly at the negative threshold and
    /// not one unit inside it.
    #[test]
    fn breach_boundary_exact(
        margin in 1i64..1_000_000i64,
        threshold_bps in bps_strategy(),
    ) {
        let margin = Quote::new(Decimal::from(margin));
        let threshold = Bps::new(threshold_bps);
        let limit = liquidation_threshold(margin, threshold);

        prop_assert!(breaches_margin(limit.negate(), margin, threshold));
        prop_assert!(!breaches_margin(
            Quote::new(limit.negate().value() + Decimal::ONE),
            margin,
            threshold
        ));
    }

    /// The combined liquidation fee is a floored, non-negative fraction of
    /// the size whenever the combined rate stays within 10000 bps.
    #[test]
    fn fee_is_floored_and_bounded(
        size in 1i64..1_000_000i64,
        trading_bps in 0u32..=5_000u32,
        liq_bps in 0u32..=5_000u32,
    ) {
        let size = Decimal::from(size);
        let fee = liquidation_fee(size, Bps::new(trading_bps), Bps::new(liq_bps));

        prop_assert!(fee.value() >= Decimal::ZERO);
        prop_assert!(fee.value() <= size);
        // floor: the fee is an integer for integer sizes
        prop_assert_eq!(fee.value(), fee.value().floor());
    }
}
