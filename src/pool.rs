//! Pool configuration and state.
//!
//! A pool is one leveraged long/short pair over a tracked market: two balances
//! of settlement asset, two exposure token supplies, a commit queue, and the
//! price history its lazy aggregation folds against.

use crate::aggregation::UserAggregateBalance;
use crate::commit_queue::CommitQueue;
use crate::intervals::IntervalSchedule;
use crate::math;
use crate::types::{IntervalId, Leverage, PoolId, PoolTokens, Price, Quote, Side, Timestamp, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static pool configuration (immutable after creation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub id: PoolId,
    /// Human-readable name (e.g., "3-ETH/USD")
    pub name: String,
    /// Multiplier applied to the price move in the value transfer
    pub leverage: Leverage,
    /// Length of one update interval
    pub update_interval_ms: i64,
    /// Trailing window before an interval boundary in which commits defer
    pub front_running_interval_ms: i64,
    /// Fraction of each side's balance skimmed per settled interval
    pub fee_rate: Decimal,
    /// Minimum commit amount (settlement asset for mints, tokens for burns)
    pub min_commit_size: Decimal,
    /// Maximum number of live commitments in the queue
    pub max_queue_length: usize,
    /// Work bound per call, for both the settlement sweep and the lazy
    /// aggregation fold
    pub max_iterations: usize,
}

impl PoolConfig {
    /// Default 3x ETH/USD pool: hourly intervals, five-minute front-running
    /// window.
    pub fn eth_3x() -> Self {
        Self {
            id: PoolId(1),
            name: "3-ETH/USD".to_string(),
            leverage: Leverage::new_unchecked(dec!(3)),
            update_interval_ms: 3_600_000,
            front_running_interval_ms: 300_000,
            fee_rate: dec!(0.0005),
            min_commit_size: dec!(1),
            max_queue_length: 10_000,
            max_iterations: 5,
        }
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.update_interval_ms <= 0 {
            return Err(PoolError::InvalidConfig("update interval must be positive"));
        }
        if self.front_running_interval_ms < 0 {
            return Err(PoolError::InvalidConfig(
                "front-running interval must not be negative",
            ));
        }
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(PoolError::InvalidConfig("fee rate must be in [0, 1)"));
        }
        if self.min_commit_size < Decimal::ZERO {
            return Err(PoolError::InvalidConfig(
                "minimum commit size must not be negative",
            ));
        }
        if self.max_queue_length == 0 {
            return Err(PoolError::InvalidConfig("queue length limit must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(PoolError::InvalidConfig("work bound must be positive"));
        }
        Ok(())
    }

    /// Reject commit amounts below the configured minimum.
    pub fn validate_commit_amount(&self, amount: Decimal) -> Result<(), PoolError> {
        if amount < self.min_commit_size {
            return Err(PoolError::AmountBelowMinimum {
                amount,
                minimum: self.min_commit_size,
            });
        }
        Ok(())
    }
}

/// Token prices recorded at the settlement of one interval, after the value
/// transfer and fee skim, before that interval's commit aggregates execute.
/// Lazy aggregation replays user records against these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPrices {
    pub long_price: Decimal,
    pub short_price: Decimal,
}

impl SettlementPrices {
    pub fn price_of(&self, side: Side) -> Decimal {
        match side {
            Side::Long => self.long_price,
            Side::Short => self.short_price,
        }
    }
}

/// Dynamic pool state (changes with commits and settlements)
#[derive(Debug, Clone)]
pub struct PoolState {
    pub config: PoolConfig,
    /// Anchor of the interval grid; interval i ends at genesis + i * U
    pub genesis: Timestamp,
    pub long_balance: Quote,
    pub short_balance: Quote,
    /// Notional supplies: include tokens minted at settlement but not yet
    /// claimed to a wallet
    pub long_token_supply: PoolTokens,
    pub short_token_supply: PoolTokens,
    /// Burn shadows: tokens already retired at commit time whose value leaves
    /// the side balance only when their interval settles
    pub pending_long_burn: PoolTokens,
    pub pending_short_burn: PoolTokens,
    pub last_settled_interval: IntervalId,
    pub last_settled_price: Price,
    /// Set by the invariant breaker or governance; blocks every mutating call
    pub paused: bool,
    pub queue: CommitQueue,
    /// Realized settlement prices per settled interval
    pub price_history: HashMap<IntervalId, SettlementPrices>,
    pub aggregate_balances: HashMap<UserId, UserAggregateBalance>,
    /// Lifetime fees skimmed from this pool
    pub total_fees: Quote,
}

impl PoolState {
    pub fn new(config: PoolConfig, genesis: Timestamp, initial_price: Price) -> Self {
        Self {
            config,
            genesis,
            long_balance: Quote::zero(),
            short_balance: Quote::zero(),
            long_token_supply: PoolTokens::zero(),
            short_token_supply: PoolTokens::zero(),
            pending_long_burn: PoolTokens::zero(),
            pending_short_burn: PoolTokens::zero(),
            last_settled_interval: IntervalId::GENESIS,
            last_settled_price: initial_price,
            paused: false,
            queue: CommitQueue::new(),
            price_history: HashMap::new(),
            aggregate_balances: HashMap::new(),
            total_fees: Quote::zero(),
        }
    }

    pub fn schedule(&self) -> IntervalSchedule {
        IntervalSchedule::new(
            self.genesis,
            self.config.update_interval_ms,
            self.config.front_running_interval_ms,
        )
    }

    pub fn ensure_active(&self) -> Result<(), PoolError> {
        if self.paused {
            return Err(PoolError::Paused(self.config.id));
        }
        Ok(())
    }

    pub fn side_balance(&self, side: Side) -> Quote {
        match side {
            Side::Long => self.long_balance,
            Side::Short => self.short_balance,
        }
    }

    pub fn set_side_balance(&mut self, side: Side, balance: Quote) {
        match side {
            Side::Long => self.long_balance = balance,
            Side::Short => self.short_balance = balance,
        }
    }

    pub fn token_supply(&self, side: Side) -> PoolTokens {
        match side {
            Side::Long => self.long_token_supply,
            Side::Short => self.short_token_supply,
        }
    }

    pub fn add_token_supply(&mut self, side: Side, amount: PoolTokens) {
        match side {
            Side::Long => self.long_token_supply = self.long_token_supply.add(amount),
            Side::Short => self.short_token_supply = self.short_token_supply.add(amount),
        }
    }

    pub fn sub_token_supply(&mut self, side: Side, amount: PoolTokens) {
        match side {
            Side::Long => self.long_token_supply = self.long_token_supply.sub(amount),
            Side::Short => self.short_token_supply = self.short_token_supply.sub(amount),
        }
    }

    pub fn pending_burn(&self, side: Side) -> PoolTokens {
        match side {
            Side::Long => self.pending_long_burn,
            Side::Short => self.pending_short_burn,
        }
    }

    pub fn add_pending_burn(&mut self, side: Side, amount: PoolTokens) {
        match side {
            Side::Long => self.pending_long_burn = self.pending_long_burn.add(amount),
            Side::Short => self.pending_short_burn = self.pending_short_burn.add(amount),
        }
    }

    pub fn sub_pending_burn(&mut self, side: Side, amount: PoolTokens) {
        match side {
            Side::Long => self.pending_long_burn = self.pending_long_burn.sub(amount),
            Side::Short => self.pending_short_burn = self.pending_short_burn.sub(amount),
        }
    }

    /// Supply used for pricing: live tokens plus the burn shadow, which still
    /// owns its share of the side balance until its interval settles.
    pub fn effective_supply(&self, side: Side) -> PoolTokens {
        self.token_supply(side).add(self.pending_burn(side))
    }

    pub fn token_price(&self, side: Side) -> Decimal {
        math::token_price(self.side_balance(side), self.effective_supply(side))
    }

    pub fn current_prices(&self) -> SettlementPrices {
        SettlementPrices {
            long_price: self.token_price(Side::Long),
            short_price: self.token_price(Side::Short),
        }
    }

    /// Both sides together; what the vault must at least hold.
    pub fn total_balance(&self) -> Quote {
        self.long_balance.add(self.short_balance)
    }

    pub fn upkeep_due(&self, now: Timestamp) -> bool {
        self.schedule().upkeep_due(self.last_settled_interval, now)
    }

    pub fn target_interval(&self, now: Timestamp) -> IntervalId {
        self.schedule().target_interval(self.last_settled_interval, now)
    }

    pub fn aggregate_balance(&self, user: UserId) -> UserAggregateBalance {
        self.aggregate_balances.get(&user).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    #[error("commit amount {amount} below minimum {minimum}")]
    AmountBelowMinimum { amount: Decimal, minimum: Decimal },

    #[error("commit queue full: limit {limit}")]
    QueueFull { limit: usize },

    #[error("invalid pool config: {0}")]
    InvalidConfig(&'static str),

    #[error("pool {0:?} is paused")]
    Paused(PoolId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn eth_3x_defaults() {
        let config = PoolConfig::eth_3x();
        assert_eq!(config.name, "3-ETH/USD");
        assert_eq!(config.leverage.value(), dec!(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_config() {
        let mut config = PoolConfig::eth_3x();
        config.fee_rate = dec!(1);
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidConfig(_))
        ));

        let mut config = PoolConfig::eth_3x();
        config.update_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = PoolConfig::eth_3x();
        config.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn commit_amount_minimum() {
        let config = PoolConfig::eth_3x();
        assert!(config.validate_commit_amount(dec!(1)).is_ok());
        assert!(matches!(
            config.validate_commit_amount(dec!(0.5)),
            Err(PoolError::AmountBelowMinimum { .. })
        ));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = PoolConfig::eth_3x();
        let json = serde_json::to_string(&config).unwrap();
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, config.name);
        assert_eq!(back.leverage.value(), config.leverage.value());
        assert_eq!(back.fee_rate, config.fee_rate);
    }

    #[test]
    fn fresh_pool_state() {
        let pool = PoolState::new(
            PoolConfig::eth_3x(),
            Timestamp::from_millis(0),
            Price::new_unchecked(dec!(2000)),
        );

        assert_eq!(pool.last_settled_interval, IntervalId::GENESIS);
        assert!(!pool.paused);
        assert_eq!(pool.total_balance(), Quote::zero());
        // empty sides price at par
        assert_eq!(pool.token_price(Side::Long), Decimal::ONE);
        assert_eq!(pool.token_price(Side::Short), Decimal::ONE);
    }

    #[test]
    fn effective_supply_includes_burn_shadow() {
        let mut pool = PoolState::new(
            PoolConfig::eth_3x(),
            Timestamp::from_millis(0),
            Price::new_unchecked(dec!(2000)),
        );
        pool.long_balance = Quote::new(dec!(1000));
        pool.long_token_supply = PoolTokens::new(dec!(800));
        pool.add_pending_burn(Side::Long, PoolTokens::new(dec!(200)));

        assert_eq!(pool.effective_supply(Side::Long).value(), dec!(1000));
        assert_eq!(pool.token_price(Side::Long), Decimal::ONE);
    }

    #[test]
    fn paused_pool_reports_error() {
        let mut pool = PoolState::new(
            PoolConfig::eth_3x(),
            Timestamp::from_millis(0),
            Price::new_unchecked(dec!(2000)),
        );
        assert!(pool.ensure_active().is_ok());

        pool.paused = true;
        assert!(matches!(pool.ensure_active(), Err(PoolError::Paused(_))));
    }

    #[test]
    fn upkeep_due_follows_schedule() {
        let pool = PoolState::new(
            PoolConfig::eth_3x(),
            Timestamp::from_millis(0),
            Price::new_unchecked(dec!(2000)),
        );

        assert!(!pool.upkeep_due(Timestamp::from_millis(3_599_999)));
        assert!(pool.upkeep_due(Timestamp::from_millis(3_600_000)));
    }
}
