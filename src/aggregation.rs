// 5.0: lazy aggregation. a user's settled pending records are folded into an
// aggregate balance on demand, oldest interval first, at most max_iterations
// records per call. partial progress is preserved, so the fold is resumable
// and calling it again never double-counts.

use crate::commit_queue::AggregateCommits;
use crate::math::{settlement_for_tokens, switch_output, tokens_for_settlement};
use crate::pool::{PoolState, SettlementPrices};
use crate::types::{PoolTokens, Quote, Side, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's settled entitlement not yet claimed to their wallet: exposure
/// tokens from executed mints and settlement asset from executed burns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAggregateBalance {
    pub long_tokens: PoolTokens,
    pub short_tokens: PoolTokens,
    pub settlement: Quote,
}

impl UserAggregateBalance {
    pub fn is_empty(&self) -> bool {
        self.long_tokens.is_zero() && self.short_tokens.is_zero() && self.settlement.is_zero()
    }

    pub fn side_tokens(&self, side: Side) -> PoolTokens {
        match side {
            Side::Long => self.long_tokens,
            Side::Short => self.short_tokens,
        }
    }

    pub fn sub_side_tokens(&mut self, side: Side, amount: PoolTokens) {
        match side {
            Side::Long => self.long_tokens = self.long_tokens.sub(amount),
            Side::Short => self.short_tokens = self.short_tokens.sub(amount),
        }
    }

    pub fn add_side_tokens(&mut self, side: Side, amount: PoolTokens) {
        match side {
            Side::Long => self.long_tokens = self.long_tokens.add(amount),
            Side::Short => self.short_tokens = self.short_tokens.add(amount),
        }
    }
}

// 5.1: fold one interval's record into a balance at that interval's realized
// prices. mints buy tokens at the recorded price, burns release value at it,
// switches convert across sides through the settlement asset.
pub fn fold_record(
    balance: &mut UserAggregateBalance,
    record: &AggregateCommits,
    prices: &SettlementPrices,
) {
    if !record.long_mint_settlement.is_zero() {
        let minted =
            tokens_for_settlement(Quote::new(record.long_mint_settlement), prices.long_price);
        balance.long_tokens = balance.long_tokens.add(minted);
    }
    if !record.short_mint_settlement.is_zero() {
        let minted =
            tokens_for_settlement(Quote::new(record.short_mint_settlement), prices.short_price);
        balance.short_tokens = balance.short_tokens.add(minted);
    }
    if !record.long_burn_tokens.is_zero() {
        let released =
            settlement_for_tokens(PoolTokens::new(record.long_burn_tokens), prices.long_price);
        balance.settlement = balance.settlement.add(released);
    }
    if !record.short_burn_tokens.is_zero() {
        let released =
            settlement_for_tokens(PoolTokens::new(record.short_burn_tokens), prices.short_price);
        balance.settlement = balance.settlement.add(released);
    }
    if !record.long_burn_short_mint_tokens.is_zero() {
        let switched = switch_output(
            PoolTokens::new(record.long_burn_short_mint_tokens),
            prices.long_price,
            prices.short_price,
        );
        balance.short_tokens = balance.short_tokens.add(switched);
    }
    if !record.short_burn_long_mint_tokens.is_zero() {
        let switched = switch_output(
            PoolTokens::new(record.short_burn_long_mint_tokens),
            prices.short_price,
            prices.long_price,
        );
        balance.long_tokens = balance.long_tokens.add(switched);
    }
}

// 5.2: fold up to max_iterations of the user's oldest settled pending records.
// returns how many intervals were folded; zero means nothing was due.
pub fn update_aggregate_balance(pool: &mut PoolState, user: UserId) -> usize {
    let last_settled = pool.last_settled_interval;
    let bound = pool.config.max_iterations;
    let drained = pool.queue.drain_settled_pending(user, last_settled, bound);
    if drained.is_empty() {
        return 0;
    }

    let mut balance = pool.aggregate_balances.remove(&user).unwrap_or_default();
    for (interval, record) in &drained {
        // every settled interval records its prices before the pool advances
        let prices = pool.price_history.get(interval).copied().unwrap_or(SettlementPrices {
            long_price: Decimal::ONE,
            short_price: Decimal::ONE,
        });
        fold_record(&mut balance, record, &prices);
    }
    pool.aggregate_balances.insert(user, balance);
    drained.len()
}

// 5.3: zero out and return the user's aggregate balance. callers fold first
// and then move the returned amounts out through the ledger.
pub fn take_balance(pool: &mut PoolState, user: UserId) -> UserAggregateBalance {
    pool.aggregate_balances.remove(&user).unwrap_or_default()
}

// 5.4: what the user would hold if every settled record were folded right now.
// unbounded and read-only; the true entitlement for tests and inspection.
pub fn total_entitlement(pool: &PoolState, user: UserId) -> UserAggregateBalance {
    let mut balance = pool.aggregate_balance(user);
    let Some(pending) = pool.queue.user_pending(user) else {
        return balance;
    };
    for (interval, record) in pending {
        if *interval > pool.last_settled_interval {
            break;
        }
        let prices = pool.price_history.get(interval).copied().unwrap_or(SettlementPrices {
            long_price: Decimal::ONE,
            short_price: Decimal::ONE,
        });
        fold_record(&mut balance, record, &prices);
    }
    balance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolConfig;
    use crate::types::{CommitType, IntervalId, Price, Timestamp};
    use rust_decimal_macros::dec;

    fn pool_with_history(max_iterations: usize) -> PoolState {
        let mut config = PoolConfig::eth_3x();
        config.max_iterations = max_iterations;
        PoolState::new(
            config,
            Timestamp::from_millis(0),
            Price::new_unchecked(dec!(2000)),
        )
    }

    fn record_prices(pool: &mut PoolState, interval: u64, long: Decimal, short: Decimal) {
        pool.price_history.insert(
            IntervalId(interval),
            SettlementPrices {
                long_price: long,
                short_price: short,
            },
        );
        if pool.last_settled_interval < IntervalId(interval) {
            pool.last_settled_interval = IntervalId(interval);
        }
    }

    fn queue_commit(pool: &mut PoolState, user: u64, interval: u64, ct: CommitType, amount: Decimal) {
        pool.queue.enqueue(
            UserId(user),
            IntervalId(interval),
            ct,
            amount,
            false,
            Quote::zero(),
            Timestamp::from_millis(0),
        );
    }

    #[test]
    fn fold_mint_at_recorded_price() {
        let mut balance = UserAggregateBalance::default();
        let mut record = AggregateCommits::default();
        record.add(CommitType::LongMint, dec!(500));

        let prices = SettlementPrices {
            long_price: dec!(1.25),
            short_price: dec!(0.8),
        };
        fold_record(&mut balance, &record, &prices);

        assert_eq!(balance.long_tokens.value(), dec!(400));
        assert!(balance.short_tokens.is_zero());
        assert!(balance.settlement.is_zero());
    }

    #[test]
    fn fold_burn_releases_settlement() {
        let mut balance = UserAggregateBalance::default();
        let mut record = AggregateCommits::default();
        record.add(CommitType::ShortBurn, dec!(100));

        let prices = SettlementPrices {
            long_price: dec!(1.1),
            short_price: dec!(0.9),
        };
        fold_record(&mut balance, &record, &prices);

        assert_eq!(balance.settlement.value(), dec!(90));
    }

    #[test]
    fn fold_switch_moves_value_across_sides() {
        let mut balance = UserAggregateBalance::default();
        let mut record = AggregateCommits::default();
        record.add(CommitType::LongBurnShortMint, dec!(100));

        let prices = SettlementPrices {
            long_price: dec!(1.2),
            short_price: dec!(0.8),
        };
        fold_record(&mut balance, &record, &prices);

        // 100 long tokens worth 120 buy 150 short tokens at 0.8
        assert_eq!(balance.short_tokens.value(), dec!(150));
        assert!(balance.settlement.is_zero());
    }

    #[test]
    fn update_folds_oldest_first_within_bound() {
        let mut pool = pool_with_history(2);
        for interval in 1..=4 {
            queue_commit(&mut pool, 1, interval, CommitType::LongMint, dec!(100));
            record_prices(&mut pool, interval, Decimal::ONE, Decimal::ONE);
        }

        let folded = update_aggregate_balance(&mut pool, UserId(1));
        assert_eq!(folded, 2);
        assert_eq!(
            pool.aggregate_balance(UserId(1)).long_tokens.value(),
            dec!(200)
        );
        assert_eq!(pool.queue.unaggregated_count(UserId(1)), 2);

        let folded = update_aggregate_balance(&mut pool, UserId(1));
        assert_eq!(folded, 2);
        assert_eq!(
            pool.aggregate_balance(UserId(1)).long_tokens.value(),
            dec!(400)
        );
    }

    #[test]
    fn update_is_idempotent_once_caught_up() {
        let mut pool = pool_with_history(5);
        queue_commit(&mut pool, 1, 1, CommitType::LongMint, dec!(100));
        record_prices(&mut pool, 1, Decimal::ONE, Decimal::ONE);

        assert_eq!(update_aggregate_balance(&mut pool, UserId(1)), 1);
        let after_first = pool.aggregate_balance(UserId(1));

        assert_eq!(update_aggregate_balance(&mut pool, UserId(1)), 0);
        assert_eq!(pool.aggregate_balance(UserId(1)), after_first);
    }

    #[test]
    fn update_stops_at_unsettled_interval() {
        let mut pool = pool_with_history(5);
        queue_commit(&mut pool, 1, 1, CommitType::LongMint, dec!(100));
        queue_commit(&mut pool, 1, 2, CommitType::LongMint, dec!(100));
        record_prices(&mut pool, 1, Decimal::ONE, Decimal::ONE);
        // interval 2 has not settled

        assert_eq!(update_aggregate_balance(&mut pool, UserId(1)), 1);
        assert_eq!(pool.queue.unaggregated_count(UserId(1)), 1);
        assert_eq!(
            pool.aggregate_balance(UserId(1)).long_tokens.value(),
            dec!(100)
        );
    }

    #[test]
    fn fold_uses_each_intervals_own_prices() {
        let mut pool = pool_with_history(5);
        queue_commit(&mut pool, 1, 1, CommitType::LongMint, dec!(100));
        queue_commit(&mut pool, 1, 2, CommitType::LongMint, dec!(100));
        record_prices(&mut pool, 1, dec!(1), Decimal::ONE);
        record_prices(&mut pool, 2, dec!(2), Decimal::ONE);

        update_aggregate_balance(&mut pool, UserId(1));
        // 100 tokens at price 1, then 50 at price 2
        assert_eq!(
            pool.aggregate_balance(UserId(1)).long_tokens.value(),
            dec!(150)
        );
    }

    #[test]
    fn take_balance_zeroes() {
        let mut pool = pool_with_history(5);
        queue_commit(&mut pool, 1, 1, CommitType::LongMint, dec!(100));
        record_prices(&mut pool, 1, Decimal::ONE, Decimal::ONE);
        update_aggregate_balance(&mut pool, UserId(1));

        let taken = take_balance(&mut pool, UserId(1));
        assert_eq!(taken.long_tokens.value(), dec!(100));
        assert!(pool.aggregate_balance(UserId(1)).is_empty());
    }

    #[test]
    fn entitlement_counts_settled_pending_without_mutating() {
        let mut pool = pool_with_history(1);
        for interval in 1..=3 {
            queue_commit(&mut pool, 1, interval, CommitType::LongMint, dec!(100));
            record_prices(&mut pool, interval, Decimal::ONE, Decimal::ONE);
        }
        // fold only one of three
        update_aggregate_balance(&mut pool, UserId(1));

        let entitlement = total_entitlement(&pool, UserId(1));
        assert_eq!(entitlement.long_tokens.value(), dec!(300));
        // pending records untouched
        assert_eq!(pool.queue.unaggregated_count(UserId(1)), 2);
    }
}
