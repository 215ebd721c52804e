// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, prices, amounts, leverage, timestamps. each is a newtype so the compiler catches type mixups.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitId(pub u64);

// 1.1: update interval counter. interval i covers (end(i-1), end(i)] and its
// settlement price is sampled at end(i). interval 0 is the genesis marker and
// never settles; commits always target an id >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntervalId(pub u64);

impl IntervalId {
    pub const GENESIS: IntervalId = IntervalId(0);

    pub fn next(&self) -> IntervalId {
        IntervalId(self.0 + 1)
    }

    pub fn offset(&self, intervals: u64) -> IntervalId {
        IntervalId(self.0 + intervals)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for IntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Long = gains when the tracked price goes up. Short = gains when it goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

// 1.2: the six queueable intents. plain mints take settlement asset in, plain
// burns retire exposure tokens, the two switch types burn one side and mint
// the other in a single settlement without the asset ever leaving the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitType {
    LongMint,
    LongBurn,
    ShortMint,
    ShortBurn,
    LongBurnShortMint,
    ShortBurnLongMint,
}

impl CommitType {
    /// Side whose exposure tokens this commit retires, if any.
    pub fn burn_side(&self) -> Option<Side> {
        match self {
            CommitType::LongBurn | CommitType::LongBurnShortMint => Some(Side::Long),
            CommitType::ShortBurn | CommitType::ShortBurnLongMint => Some(Side::Short),
            CommitType::LongMint | CommitType::ShortMint => None,
        }
    }

    /// Side whose exposure tokens this commit creates, if any.
    pub fn mint_side(&self) -> Option<Side> {
        match self {
            CommitType::LongMint | CommitType::ShortBurnLongMint => Some(Side::Long),
            CommitType::ShortMint | CommitType::LongBurnShortMint => Some(Side::Short),
            CommitType::LongBurn | CommitType::ShortBurn => None,
        }
    }

    /// True for the two plain mint types, which move settlement asset into the pool.
    pub fn takes_settlement(&self) -> bool {
        matches!(self, CommitType::LongMint | CommitType::ShortMint)
    }

    /// True for the burn-then-mint-opposite-side pair.
    pub fn is_switch(&self) -> bool {
        matches!(
            self,
            CommitType::LongBurnShortMint | CommitType::ShortBurnLongMint
        )
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommitType::LongMint => "long-mint",
            CommitType::LongBurn => "long-burn",
            CommitType::ShortMint => "short-mint",
            CommitType::ShortBurn => "short-burn",
            CommitType::LongBurnShortMint => "long-burn-short-mint",
            CommitType::ShortBurnLongMint => "short-burn-long-mint",
        };
        write!(f, "{s}")
    }
}

// 1.3: tracked-market price. must be positive; a zero or negative sample is a
// feed fault, never a settleable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
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

// 1.4: settlement-asset amount. deposits, side balances, fees, claim rewards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
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

    pub fn mul(&self, factor: Decimal) -> Self {
        Self(self.0 * factor)
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

impl Sum for Quote {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc.add(q))
    }
}

impl<'a> Sum<&'a Quote> for Quote {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc.add(*q))
    }
}

// 1.5: exposure-token amount. long and short tokens share the unit type; the
// ledger keys keep the sides apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTokens(Decimal);

impl PoolTokens {
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

    pub fn add(&self, other: PoolTokens) -> Self {
        Self(self.0 + other.0)
    }

    pub fn sub(&self, other: PoolTokens) -> Self {
        Self(self.0 - other.0)
    }
}

impl fmt::Display for PoolTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for PoolTokens {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PoolTokens {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// 1.6: leverage multiplier. must be >= 1x. scales the price move fed into the
// value-transfer sigmoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leverage(Decimal);

impl Leverage {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value >= Decimal::ONE);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Leverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

// 1.7: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn add_millis(&self, ms: i64) -> Self {
        Self(self.0 + ms)
    }

    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Caller capability, checked at the top of each engine operation.
/// Stands in for the address/role checks of a deployed system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Caller {
    User(UserId),
    Keeper,
    Governance,
}

impl Caller {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Caller::User(id) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn commit_type_sides() {
        assert_eq!(CommitType::LongMint.mint_side(), Some(Side::Long));
        assert_eq!(CommitType::LongMint.burn_side(), None);
        assert!(CommitType::LongMint.takes_settlement());

        assert_eq!(CommitType::ShortBurn.burn_side(), Some(Side::Short));
        assert_eq!(CommitType::ShortBurn.mint_side(), None);
        assert!(!CommitType::ShortBurn.takes_settlement());

        assert_eq!(CommitType::LongBurnShortMint.burn_side(), Some(Side::Long));
        assert_eq!(CommitType::LongBurnShortMint.mint_side(), Some(Side::Short));
        assert!(CommitType::LongBurnShortMint.is_switch());
        assert!(!CommitType::LongBurnShortMint.takes_settlement());
    }

    #[test]
    fn price_rejects_non_positive() {
        assert!(Price::new(dec!(50000)).is_some());
        assert!(Price::new(Decimal::ZERO).is_none());
        assert!(Price::new(dec!(-1)).is_none());
    }

    #[test]
    fn leverage_floor() {
        assert!(Leverage::new(dec!(1)).is_some());
        assert!(Leverage::new(dec!(0.5)).is_none());
        assert_eq!(Leverage::new(dec!(3)).unwrap().to_string(), "3x");
    }

    #[test]
    fn quote_sum() {
        let total: Quote = [Quote::new(dec!(1)), Quote::new(dec!(2.5))].iter().sum();
        assert_eq!(total.value(), dec!(3.5));
    }

    #[test]
    fn interval_id_arithmetic() {
        let id = IntervalId(4);
        assert_eq!(id.next(), IntervalId(5));
        assert_eq!(id.offset(3), IntervalId(7));
        assert!(IntervalId(2) < IntervalId(3));
    }
}
