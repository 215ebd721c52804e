//! The interval settlement sweep.

use super::core::Engine;
use super::results::{EngineError, UpkeepResult};
use crate::commit_queue::AggregateCommits;
use crate::events::{CommitsExecutedEvent, EventPayload, PriceChangeExecutedEvent, UpkeepPerformedEvent};
use crate::math;
use crate::pool::{PoolState, SettlementPrices};
use crate::tokens::{Holder, TokenId};
use crate::transfer::{value_transfer, TransferParams};
use crate::types::{Caller, PoolId, PoolTokens, Price, Quote, Side};
use rust_decimal::Decimal;

impl Engine {
    /// Settle every due interval at `new_price`, up to the pool's work bound.
    /// `old_price` must match the pool's last settled price; it guards against
    /// out-of-order keeper runs. Stopping at the bound is success: the result
    /// reports `more_due` and the next call picks up where this one ended.
    pub fn upkeep(
        &mut self,
        caller: Caller,
        pool_id: PoolId,
        old_price: Decimal,
        new_price: Decimal,
    ) -> Result<UpkeepResult, EngineError> {
        let limit = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?
            .config
            .max_iterations;
        self.upkeep_bounded(caller, pool_id, old_price, new_price, limit)
    }

    // 8.3: the sweep. one settlement per due interval, each advancing the
    // pool's cursor and entry price, so several lapsed intervals replay as a
    // sequence instead of one compressed jump. `limit` is clamped to the
    // pool's work bound; the keeper passes 1 to interleave its own per-interval
    // price samples.
    pub fn upkeep_bounded(
        &mut self,
        caller: Caller,
        pool_id: PoolId,
        old_price: Decimal,
        new_price: Decimal,
        limit: usize,
    ) -> Result<UpkeepResult, EngineError> {
        Self::require_keeper(caller)?;

        let sample = Price::new(new_price).ok_or(EngineError::InvalidPrice(new_price))?;

        let pool = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        pool.ensure_active()?;
        if old_price != pool.last_settled_price.value() {
            return Err(EngineError::StalePrice {
                expected: pool.last_settled_price,
                provided: old_price,
            });
        }
        if !pool.upkeep_due(self.current_time) {
            return Err(EngineError::UpkeepNotDue(pool_id));
        }
        let limit = limit.min(pool.config.max_iterations);

        let mut settled: u64 = 0;
        while (settled as usize) < limit {
            let pool = self.pools.get(&pool_id).unwrap();
            let next = pool.last_settled_interval.next();
            if !pool.schedule().is_settleable(next, self.current_time) {
                break;
            }
            self.settle_interval(pool_id, sample)?;
            settled += 1;
        }

        let pool = self.pools.get(&pool_id).unwrap();
        let last_settled_interval = pool.last_settled_interval;
        let more_due = pool.upkeep_due(self.current_time);

        self.emit_event(EventPayload::UpkeepPerformed(UpkeepPerformedEvent {
            pool_id,
            intervals_settled: settled,
            last_settled_interval,
            more_due,
        }));

        // every sweep ends with a backing check; a violation pauses the pool
        self.check_invariants(pool_id)?;

        Ok(UpkeepResult {
            intervals_settled: settled,
            last_settled_interval,
            more_due,
        })
    }

    // 8.3.1: settle exactly one interval: skim fees, run the value transfer,
    // record the interval's token prices, execute its queued aggregates at
    // those prices, then advance the settlement cursor.
    fn settle_interval(&mut self, pool_id: PoolId, sample: Price) -> Result<(), EngineError> {
        let pool = self.pools.get_mut(&pool_id).unwrap();
        let interval_id = pool.last_settled_interval.next();
        let old_price = pool.last_settled_price;

        let params = TransferParams {
            leverage: pool.config.leverage,
            fee_rate: pool.config.fee_rate,
        };
        let outcome = value_transfer(pool.long_balance, pool.short_balance, old_price, sample, &params);

        pool.long_balance = outcome.long_balance;
        pool.short_balance = outcome.short_balance;
        pool.total_fees = pool.total_fees.add(outcome.total_fee());

        // token prices are sampled here, after the transfer and before the
        // aggregates, and frozen for this interval's lazy folds
        let prices = pool.current_prices();
        pool.price_history.insert(interval_id, prices);

        let totals = pool.queue.take_totals(interval_id);
        Self::apply_aggregates(pool, &totals, &prices);
        pool.queue.retire_executed(interval_id);

        pool.last_settled_interval = interval_id;
        pool.last_settled_price = sample;

        let fee = outcome.total_fee();
        if !fee.is_zero() {
            self.ledger.transfer(
                Holder::PoolVault(pool_id),
                Holder::FeeAccount,
                TokenId::Settlement,
                fee.value(),
            )?;
        }

        self.emit_event(EventPayload::PriceChangeExecuted(PriceChangeExecutedEvent {
            pool_id,
            interval_id,
            old_price,
            new_price: sample,
            transfer: outcome.amount,
            winner: outcome.winner,
            fee,
        }));
        self.emit_event(EventPayload::CommitsExecuted(CommitsExecutedEvent {
            pool_id,
            interval_id,
            long_price: prices.long_price,
            short_price: prices.short_price,
        }));

        Ok(())
    }

    // 8.3.2: execute one interval's aggregate totals at its recorded prices.
    // mint deposits already sit in the vault and burns are already shadowed,
    // so only the pool's side accounting moves here. every slot uses the same
    // frozen prices.
    fn apply_aggregates(pool: &mut PoolState, totals: &AggregateCommits, prices: &SettlementPrices) {
        if totals.is_empty() {
            return;
        }

        if !totals.long_mint_settlement.is_zero() {
            let amount = Quote::new(totals.long_mint_settlement);
            pool.long_balance = pool.long_balance.add(amount);
            pool.add_token_supply(
                Side::Long,
                math::tokens_for_settlement(amount, prices.long_price),
            );
        }
        if !totals.short_mint_settlement.is_zero() {
            let amount = Quote::new(totals.short_mint_settlement);
            pool.short_balance = pool.short_balance.add(amount);
            pool.add_token_supply(
                Side::Short,
                math::tokens_for_settlement(amount, prices.short_price),
            );
        }

        // plain burns: the shadow retires and its value leaves the side
        // balance, parked in the vault until the owner claims
        if !totals.long_burn_tokens.is_zero() {
            let tokens = PoolTokens::new(totals.long_burn_tokens);
            pool.long_balance = pool
                .long_balance
                .sub(math::settlement_for_tokens(tokens, prices.long_price));
            pool.sub_pending_burn(Side::Long, tokens);
        }
        if !totals.short_burn_tokens.is_zero() {
            let tokens = PoolTokens::new(totals.short_burn_tokens);
            pool.short_balance = pool
                .short_balance
                .sub(math::settlement_for_tokens(tokens, prices.short_price));
            pool.sub_pending_burn(Side::Short, tokens);
        }

        // switches: the burned value crosses sides and mints there
        if !totals.long_burn_short_mint_tokens.is_zero() {
            let tokens = PoolTokens::new(totals.long_burn_short_mint_tokens);
            let value = math::settlement_for_tokens(tokens, prices.long_price);
            pool.long_balance = pool.long_balance.sub(value);
            pool.sub_pending_burn(Side::Long, tokens);
            pool.short_balance = pool.short_balance.add(value);
            pool.add_token_supply(
                Side::Short,
                math::tokens_for_settlement(value, prices.short_price),
            );
        }
        if !totals.short_burn_long_mint_tokens.is_zero() {
            let tokens = PoolTokens::new(totals.short_burn_long_mint_tokens);
            let value = math::settlement_for_tokens(tokens, prices.short_price);
            pool.short_balance = pool.short_balance.sub(value);
            pool.sub_pending_burn(Side::Short, tokens);
            pool.long_balance = pool.long_balance.add(value);
            pool.add_token_supply(
                Side::Long,
                math::tokens_for_settlement(value, prices.long_price),
            );
        }
    }
}
