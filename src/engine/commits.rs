//! Commit intake and cancellation.

use super::core::Engine;
use super::results::{CommitResult, EngineError};
use crate::events::{CommitCreatedEvent, CommitRemovedEvent, EventPayload};
use crate::pool::PoolError;
use crate::tokens::{Holder, LedgerError, TokenId};
use crate::types::{Caller, CommitId, CommitType, PoolId, PoolTokens, Quote, UserId};
use rust_decimal::Decimal;

/// One queued intent, as the caller states it.
#[derive(Debug, Clone, Copy)]
pub struct CommitArgs {
    pub commit_type: CommitType,
    /// Settlement asset for mints, exposure tokens for burns and switches.
    pub amount: Decimal,
    /// Burn from the aggregate balance instead of wallet tokens.
    pub from_aggregate: bool,
    /// Escrowed reward for whoever later triggers the claim; zero disables.
    pub claim_reward: Decimal,
}

impl CommitArgs {
    pub fn new(commit_type: CommitType, amount: Decimal) -> Self {
        Self {
            commit_type,
            amount,
            from_aggregate: false,
            claim_reward: Decimal::ZERO,
        }
    }

    pub fn from_aggregate(mut self) -> Self {
        self.from_aggregate = true;
        self
    }

    pub fn with_claim_reward(mut self, reward: Decimal) -> Self {
        self.claim_reward = reward;
        self
    }
}

impl Engine {
    // 8.2: queue an intent against the target interval. the asset moves now,
    // the tokens-or-settlement it buys are computed when the interval settles.
    pub fn commit(
        &mut self,
        caller: Caller,
        pool_id: PoolId,
        args: CommitArgs,
    ) -> Result<CommitResult, EngineError> {
        let user = Self::require_user(caller)?;

        let pool = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        pool.ensure_active()?;
        pool.config.validate_commit_amount(args.amount)?;
        if pool.queue.live_count() >= pool.config.max_queue_length {
            return Err(PoolError::QueueFull {
                limit: pool.config.max_queue_length,
            }
            .into());
        }
        let interval_id = pool.target_interval(self.current_time);

        // all funds checks up front so a refused commit leaves no partial
        // movement behind
        self.check_commit_funds(pool_id, user, &args)?;

        match args.commit_type.burn_side() {
            None => {
                self.ledger.transfer(
                    Holder::User(user),
                    Holder::PoolVault(pool_id),
                    TokenId::Settlement,
                    args.amount,
                )?;
            }
            Some(side) => {
                if args.from_aggregate {
                    let pool = self.pools.get_mut(&pool_id).unwrap();
                    let balance = pool.aggregate_balances.entry(user).or_default();
                    balance.sub_side_tokens(side, PoolTokens::new(args.amount));
                } else {
                    self.ledger
                        .burn(Holder::User(user), TokenId::Pool(pool_id, side), args.amount)?;
                }
                // retire the tokens from the notional supply now; the shadow
                // keeps them owning their share of the balance until the
                // interval settles
                let pool = self.pools.get_mut(&pool_id).unwrap();
                pool.sub_token_supply(side, PoolTokens::new(args.amount));
                pool.add_pending_burn(side, PoolTokens::new(args.amount));
            }
        }

        let reward = Quote::new(args.claim_reward);
        if args.claim_reward > Decimal::ZERO {
            self.escrow_claim_request(user, pool_id, reward, interval_id)?;
        }

        let pool = self.pools.get_mut(&pool_id).unwrap();
        let commit_id = pool.queue.enqueue(
            user,
            interval_id,
            args.commit_type,
            args.amount,
            args.from_aggregate,
            reward,
            self.current_time,
        );

        self.emit_event(EventPayload::CommitCreated(CommitCreatedEvent {
            pool_id,
            commit_id,
            user_id: user,
            commit_type: args.commit_type,
            amount: args.amount,
            interval_id,
            from_aggregate: args.from_aggregate,
            claim_reward: reward,
        }));

        Ok(CommitResult {
            commit_id,
            interval_id,
        })
    }

    // 8.2.1: cancel a live commitment and refund its original movement. gone
    // once the interval executes; the front-running deferral guarantees a
    // window in which this is always possible.
    pub fn uncommit(
        &mut self,
        caller: Caller,
        pool_id: PoolId,
        commit_id: CommitId,
    ) -> Result<(), EngineError> {
        let user = Self::require_user(caller)?;

        let pool = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        pool.ensure_active()?;

        // ownership check before the unlink so a foreign id has no effect
        let node = pool
            .queue
            .get(commit_id)
            .ok_or(EngineError::CommitNotFound(commit_id))?;
        if node.owner != user {
            return Err(EngineError::NotOwner(commit_id));
        }

        let pool = self.pools.get_mut(&pool_id).unwrap();
        let node = pool
            .queue
            .remove(commit_id)
            .ok_or(EngineError::CommitNotFound(commit_id))?;

        match node.commit_type.burn_side() {
            None => {
                self.ledger.transfer(
                    Holder::PoolVault(pool_id),
                    Holder::User(user),
                    TokenId::Settlement,
                    node.amount,
                )?;
            }
            Some(side) => {
                let pool = self.pools.get_mut(&pool_id).unwrap();
                pool.add_token_supply(side, PoolTokens::new(node.amount));
                pool.sub_pending_burn(side, PoolTokens::new(node.amount));
                if node.from_aggregate {
                    let balance = pool.aggregate_balances.entry(user).or_default();
                    balance.add_side_tokens(side, PoolTokens::new(node.amount));
                } else {
                    self.ledger
                        .mint(Holder::User(user), TokenId::Pool(pool_id, side), node.amount);
                }
            }
        }

        // an escrowed claim reward stays with the auto-claim agreement; the
        // user withdraws it separately if they no longer want the service

        self.emit_event(EventPayload::CommitRemoved(CommitRemovedEvent {
            pool_id,
            commit_id,
            user_id: node.owner,
            commit_type: node.commit_type,
            amount: node.amount,
            interval_id: node.interval_id,
        }));

        Ok(())
    }

    // funds pre-check for a commit: wallet settlement for mints and rewards,
    // wallet or aggregate exposure tokens for burns. the aggregate path folds
    // first so freshly settled intervals count toward capacity.
    fn check_commit_funds(
        &mut self,
        pool_id: PoolId,
        user: UserId,
        args: &CommitArgs,
    ) -> Result<(), EngineError> {
        match args.commit_type.burn_side() {
            None => {
                let needed = args.amount + args.claim_reward;
                let available = self.ledger.balance(Holder::User(user), TokenId::Settlement);
                if available < needed {
                    return Err(LedgerError::InsufficientBalance {
                        holder: Holder::User(user),
                        token: TokenId::Settlement,
                        requested: needed,
                        available,
                    }
                    .into());
                }
            }
            Some(side) => {
                if args.claim_reward > Decimal::ZERO {
                    let available = self.ledger.balance(Holder::User(user), TokenId::Settlement);
                    if available < args.claim_reward {
                        return Err(LedgerError::InsufficientBalance {
                            holder: Holder::User(user),
                            token: TokenId::Settlement,
                            requested: args.claim_reward,
                            available,
                        }
                        .into());
                    }
                }
                if args.from_aggregate {
                    self.update_aggregate_balance(pool_id, user)?;
                    let pool = self.pools.get(&pool_id).unwrap();
                    let held = pool.aggregate_balance(user).side_tokens(side);
                    if held.value() < args.amount {
                        return Err(EngineError::InsufficientAggregateBalance {
                            side,
                            requested: args.amount,
                            available: held.value(),
                        });
                    }
                } else {
                    let token = TokenId::Pool(pool_id, side);
                    let available = self.ledger.balance(Holder::User(user), token);
                    if available < args.amount {
                        return Err(LedgerError::InsufficientBalance {
                            holder: Holder::User(user),
                            token,
                            requested: args.amount,
                            available,
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }
}
