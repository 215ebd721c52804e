//! Lazy aggregation, claims, and the delegated-claim lifecycle.

use super::core::Engine;
use super::results::{ClaimResult, EngineError};
use crate::aggregation::{self, UserAggregateBalance};
use crate::events::{
    AggregateBalanceUpdatedEvent, AutoClaimExecutedEvent, AutoClaimRequestedEvent,
    AutoClaimWithdrawnEvent, ClaimedEvent, EventPayload,
};
use crate::tokens::{Holder, TokenId};
use crate::types::{Caller, IntervalId, PoolId, Quote, Side, UserId};

impl Engine {
    // 8.4: fold up to the pool's work bound of the user's oldest settled
    // pending records into their aggregate balance. idempotent; partial
    // progress is kept, so heavy histories amortize over repeated calls.
    pub fn update_aggregate_balance(
        &mut self,
        pool_id: PoolId,
        user: UserId,
    ) -> Result<usize, EngineError> {
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;

        let folded = aggregation::update_aggregate_balance(pool, user);
        if folded > 0 {
            let balance = pool.aggregate_balance(user);
            self.emit_event(EventPayload::AggregateBalanceUpdated(
                AggregateBalanceUpdatedEvent {
                    pool_id,
                    user_id: user,
                    intervals_folded: folded as u64,
                    long_tokens: balance.long_tokens,
                    short_tokens: balance.short_tokens,
                    settlement: balance.settlement,
                },
            ));
        }
        Ok(folded)
    }

    /// Aggregate balance as currently folded. Does not advance the fold.
    pub fn aggregate_balance(
        &self,
        pool_id: PoolId,
        user: UserId,
    ) -> Result<UserAggregateBalance, EngineError> {
        let pool = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        Ok(pool.aggregate_balance(user))
    }

    /// Aggregated plus all settled-but-unfolded records, priced at their
    /// realized settlement prices. Unbounded; view only.
    pub fn total_entitlement(
        &self,
        pool_id: PoolId,
        user: UserId,
    ) -> Result<UserAggregateBalance, EngineError> {
        let pool = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        Ok(aggregation::total_entitlement(pool, user))
    }

    // 8.4.1: fold, then move everything folded out to the wallet: settlement
    // from the vault, exposure tokens materialized from the notional supply.
    pub fn claim(&mut self, caller: Caller, pool_id: PoolId) -> Result<ClaimResult, EngineError> {
        let user = Self::require_user(caller)?;
        self.pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?
            .ensure_active()?;
        self.claim_for(pool_id, user)
    }

    pub(super) fn claim_for(
        &mut self,
        pool_id: PoolId,
        user: UserId,
    ) -> Result<ClaimResult, EngineError> {
        self.update_aggregate_balance(pool_id, user)?;

        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        let balance = aggregation::take_balance(pool, user);
        if balance.is_empty() {
            return Ok(ClaimResult::default());
        }

        if !balance.settlement.is_zero() {
            self.ledger.transfer(
                Holder::PoolVault(pool_id),
                Holder::User(user),
                TokenId::Settlement,
                balance.settlement.value(),
            )?;
        }
        if !balance.long_tokens.is_zero() {
            self.ledger.mint(
                Holder::User(user),
                TokenId::Pool(pool_id, Side::Long),
                balance.long_tokens.value(),
            );
        }
        if !balance.short_tokens.is_zero() {
            self.ledger.mint(
                Holder::User(user),
                TokenId::Pool(pool_id, Side::Short),
                balance.short_tokens.value(),
            );
        }

        self.emit_event(EventPayload::Claimed(ClaimedEvent {
            pool_id,
            user_id: user,
            long_tokens: balance.long_tokens,
            short_tokens: balance.short_tokens,
            settlement: balance.settlement,
        }));

        Ok(ClaimResult {
            long_tokens: balance.long_tokens,
            short_tokens: balance.short_tokens,
            settlement: balance.settlement,
        })
    }

    // 8.5: the delegated-claim lifecycle. a user escrows a reward; once their
    // interval settles anyone may trigger the claim and collect it.

    /// Escrow a reward for a delegated claim on this pool, anchored at the
    /// next unsettled interval.
    pub fn request_auto_claim(
        &mut self,
        caller: Caller,
        pool_id: PoolId,
        reward: Quote,
    ) -> Result<(), EngineError> {
        let user = Self::require_user(caller)?;
        let pool = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        pool.ensure_active()?;
        let interval_id = pool.last_settled_interval.next();
        self.escrow_claim_request(user, pool_id, reward, interval_id)
    }

    // escrow `reward` and record or extend the (user, pool) agreement. an
    // agreement that already became executable settles first, paying its
    // reward back to the user, so the new one starts clean.
    pub(super) fn escrow_claim_request(
        &mut self,
        user: UserId,
        pool_id: PoolId,
        reward: Quote,
        interval_id: IntervalId,
    ) -> Result<(), EngineError> {
        let last_settled = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?
            .last_settled_interval;

        if let Some(due) = self.auto_claims.take_if_due(user, pool_id, last_settled) {
            self.claim_for(pool_id, user)?;
            self.ledger.transfer(
                Holder::AutoClaimEscrow,
                Holder::User(user),
                TokenId::Settlement,
                due.reward.value(),
            )?;
        }

        self.ledger.transfer(
            Holder::User(user),
            Holder::AutoClaimEscrow,
            TokenId::Settlement,
            reward.value(),
        )?;
        let total = self.auto_claims.upsert(user, pool_id, reward, interval_id);

        self.emit_event(EventPayload::AutoClaimRequested(AutoClaimRequestedEvent {
            pool_id,
            user_id: user,
            reward: total,
            interval_id,
        }));

        Ok(())
    }

    /// Execute a user's due claim request and collect its reward. A request
    /// that is not yet due is left untouched and the call returns `false`.
    pub fn execute_claim(
        &mut self,
        executor: UserId,
        user: UserId,
        pool_id: PoolId,
    ) -> Result<bool, EngineError> {
        let pool = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        pool.ensure_active()?;
        let last_settled = pool.last_settled_interval;

        let Some(request) = self.auto_claims.take_if_due(user, pool_id, last_settled) else {
            return Ok(false);
        };

        self.claim_for(pool_id, user)?;
        self.ledger.transfer(
            Holder::AutoClaimEscrow,
            Holder::User(executor),
            TokenId::Settlement,
            request.reward.value(),
        )?;

        self.emit_event(EventPayload::AutoClaimExecuted(AutoClaimExecutedEvent {
            pool_id,
            user_id: user,
            executor,
            reward: request.reward,
        }));

        Ok(true)
    }

    /// Batch form: each pair executes independently, a refused or not-due
    /// entry never stalls the rest. Returns how many actually executed.
    pub fn execute_claims(&mut self, executor: UserId, pairs: &[(UserId, PoolId)]) -> usize {
        let mut executed = 0;
        for &(user, pool_id) in pairs {
            if let Ok(true) = self.execute_claim(executor, user, pool_id) {
                executed += 1;
            }
        }
        executed
    }

    /// Take back an un-executed claim request; the escrow returns to its
    /// owner's wallet.
    pub fn withdraw_claim_request(
        &mut self,
        caller: Caller,
        pool_id: PoolId,
    ) -> Result<Quote, EngineError> {
        let user = Self::require_user(caller)?;
        if !self.pools.contains_key(&pool_id) {
            return Err(EngineError::PoolNotFound(pool_id));
        }

        let request = self
            .auto_claims
            .take(user, pool_id)
            .ok_or(EngineError::NoClaimRequest {
                user,
                pool: pool_id,
            })?;

        self.ledger.transfer(
            Holder::AutoClaimEscrow,
            Holder::User(user),
            TokenId::Settlement,
            request.reward.value(),
        )?;

        self.emit_event(EventPayload::AutoClaimWithdrawn(AutoClaimWithdrawnEvent {
            pool_id,
            user_id: user,
            reward: request.reward,
        }));

        Ok(request.reward)
    }
}
