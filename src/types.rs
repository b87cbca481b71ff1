// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, sides, prices, quote amounts, basis points, timestamps. each is a newtype so
// the compiler catches type mixups between feeds, markets, orders and accounts.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

/// Fixed-size key identifying one oracle price stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedId(pub u64);

// Long = profit when price goes up. Short = profit when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => dec!(1),
            Side::Short => dec!(-1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

// 1.1: price in quote currency per unit of base. zero is a real state here:
// an absent oracle feed resolves to Price::zero() and downstream checks treat
// that as "no price". negative prices are rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value >= Decimal::ZERO);
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: quote currency amount. margin, pnl, fees, refunds all use this. signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote(Decimal);

impl Quote {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn add(&self, other: Quote) -> Self {
        Self(self.0 + other.0)
    }

    pub fn sub(&self, other: Quote) -> Self {
        Self(self.0 - other.0)
    }

    pub fn negate(&self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Quote {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quote {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// 1.3: basis points. 100 bps = 1%. all bps math floors, matching the venue's
// integer division: floor(value * bps / 10000). the floor is part of the
// contract, not a rounding preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bps(u32);

impl Bps {
    pub fn new(bps: u32) -> Self {
        Self(bps)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// floor(value * bps / 10000)
    pub fn floor_of(&self, value: Decimal) -> Decimal {
        (value * Decimal::from(self.0) / dec!(10000)).floor()
    }

    /// floor(value * (10000 - bps) / 10000). lower edge of a deviation band.
    pub fn lower_bound(&self, value: Decimal) -> Decimal {
        let factor = Decimal::from(10_000i64 - i64::from(self.0));
        (value * factor / dec!(10000)).floor()
    }

    /// floor(value * (10000 + bps) / 10000). upper edge of a deviation band.
    pub fn upper_bound(&self, value: Decimal) -> Decimal {
        let factor = Decimal::from(10_000i64 + i64::from(self.0));
        (value * factor / dec!(10000)).floor()
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

// 1.4: unix timestamp in seconds. order ages, expiries and price freshness
// all compare in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Seconds elapsed since `earlier`. Negative if `earlier` is in the future.
    pub fn seconds_since(&self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_rejects_negative() {
        assert!(Price::new(dec!(-1)).is_none());
        assert!(Price::new(dec!(0)).unwrap().is_zero());
        assert_eq!(Price::new(dec!(2000)).unwrap().value(), dec!(2000));
    }

    #[test]
    fn bps_floor_division() {
        // 1% of 2000 is exactly 20
        assert_eq!(Bps::new(100).floor_of(dec!(2000)), dec!(20));
        // 3 bps of 999 is 0.2997, floored to 0
        assert_eq!(Bps::new(3).floor_of(dec!(999)), dec!(0));
        // 50 bps of 1001 is 5.005, floored to 5
        assert_eq!(Bps::new(50).floor_of(dec!(1001)), dec!(5));
    }

    #[test]
    fn bps_band_edges() {
        // 200 bps band around 2000: [1960, 2040]
        let dev = Bps::new(200);
        assert_eq!(dev.lower_bound(dec!(2000)), dec!(1960));
        assert_eq!(dev.upper_bound(dec!(2000)), dec!(2040));
    }

    #[test]
    fn bps_band_edges_floor() {
        // 1 bps band around 999: 999 * 9999 / 10000 = 998.9001 -> 998
        let dev = Bps::new(1);
        assert_eq!(dev.lower_bound(dec!(999)), dec!(998));
        assert_eq!(dev.upper_bound(dec!(999)), dec!(999));
    }

    #[test]
    fn timestamp_elapsed() {
        let t0 = Timestamp::from_secs(1_000);
        let t1 = Timestamp::from_secs(1_030);
        assert_eq!(t1.seconds_since(t0), 30);
        assert_eq!(t0.seconds_since(t1), -30);
    }
}
