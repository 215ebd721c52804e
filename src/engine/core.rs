// 8.1 engine/core.rs: main engine. holds all pools, the token ledger, the
// auto-claim agreements, and the event log.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::autoclaim::{AutoClaim, ClaimRequest};
use crate::events::{
    DepositEvent, Event, EventCollector, EventEmitter, EventPayload, InvariantViolatedEvent,
    PauseReason, PoolCreatedEvent, PoolPausedEvent, PoolUnpausedEvent, WithdrawalEvent,
};
use crate::invariant::{self, InvariantCheck};
use crate::pool::{PoolConfig, PoolError, PoolState};
use crate::tokens::{Holder, TokenId, TokenLedger};
use crate::types::{Caller, PoolId, PoolTokens, Price, Quote, Side, Timestamp, UserId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/** 8.1.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) pools: HashMap<PoolId, PoolState>,
    pub(super) ledger: TokenLedger,
    pub(super) auto_claims: AutoClaim,
    pub(super) events: EventCollector,
    pub(super) current_time: Timestamp,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            pools: HashMap::new(),
            ledger: TokenLedger::new(),
            auto_claims: AutoClaim::new(),
            events: EventCollector::new(),
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    /// Register a new pool. Its interval grid is anchored at the current
    /// engine time and its entry price at `initial_price`.
    pub fn create_pool(
        &mut self,
        config: PoolConfig,
        initial_price: Decimal,
    ) -> Result<PoolId, EngineError> {
        let price = Price::new(initial_price).ok_or(EngineError::InvalidPrice(initial_price))?;
        config.validate()?;
        if self.pools.contains_key(&config.id) {
            return Err(PoolError::InvalidConfig("pool id already registered").into());
        }

        let pool_id = config.id;
        let created = PoolCreatedEvent {
            pool_id,
            name: config.name.clone(),
            leverage: config.leverage.value(),
            update_interval_ms: config.update_interval_ms,
            front_running_interval_ms: config.front_running_interval_ms,
        };
        self.pools
            .insert(pool_id, PoolState::new(config, self.current_time, price));
        self.emit_event(EventPayload::PoolCreated(created));

        Ok(pool_id)
    }

    pub fn get_pool(&self, pool_id: PoolId) -> Option<&PoolState> {
        self.pools.get(&pool_id)
    }

    pub fn get_pool_mut(&mut self, pool_id: PoolId) -> Option<&mut PoolState> {
        self.pools.get_mut(&pool_id)
    }

    pub fn pools_iter(&self) -> impl Iterator<Item = (&PoolId, &PoolState)> {
        self.pools.iter()
    }

    /// Fund a user's settlement-asset wallet from outside the system.
    pub fn deposit(&mut self, user: UserId, amount: Quote) {
        debug_assert!(!amount.is_negative());
        self.ledger
            .mint(Holder::User(user), TokenId::Settlement, amount.value());
        let new_balance = self.settlement_balance(user);

        self.emit_event(EventPayload::Deposit(DepositEvent {
            user_id: user,
            amount,
            new_balance,
        }));
    }

    /// Move settlement asset out of a user's wallet, back outside the system.
    pub fn withdraw(&mut self, user: UserId, amount: Quote) -> Result<(), EngineError> {
        self.ledger
            .burn(Holder::User(user), TokenId::Settlement, amount.value())?;
        let new_balance = self.settlement_balance(user);

        self.emit_event(EventPayload::Withdrawal(WithdrawalEvent {
            user_id: user,
            amount,
            new_balance,
        }));

        Ok(())
    }

    pub fn settlement_balance(&self, user: UserId) -> Quote {
        Quote::new(self.ledger.balance(Holder::User(user), TokenId::Settlement))
    }

    pub fn token_balance(&self, user: UserId, pool_id: PoolId, side: Side) -> PoolTokens {
        PoolTokens::new(
            self.ledger
                .balance(Holder::User(user), TokenId::Pool(pool_id, side)),
        )
    }

    pub fn claim_request(&self, user: UserId, pool_id: PoolId) -> Option<&ClaimRequest> {
        self.auto_claims.get(user, pool_id)
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut TokenLedger {
        &mut self.ledger
    }

    /// Manual halt.
    pub fn pause_pool(&mut self, caller: Caller, pool_id: PoolId) -> Result<(), EngineError> {
        Self::require_governance(caller)?;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        if !pool.paused {
            pool.paused = true;
            self.emit_event(EventPayload::PoolPaused(PoolPausedEvent {
                pool_id,
                reason: PauseReason::Governance,
            }));
        }
        Ok(())
    }

    /// Resume a paused pool. Restores operation as-is: whatever accounting the
    /// violation left behind stays for governance to resolve off-line.
    pub fn unpause_pool(&mut self, caller: Caller, pool_id: PoolId) -> Result<(), EngineError> {
        Self::require_governance(caller)?;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        if pool.paused {
            pool.paused = false;
            self.emit_event(EventPayload::PoolUnpaused(PoolUnpausedEvent { pool_id }));
        }
        Ok(())
    }

    // 8.1.2: the breaker. compares what the vault actually holds against what
    // the pool owes both sides; on a breach the pool is paused until
    // governance unpauses it.
    pub fn check_invariants(&mut self, pool_id: PoolId) -> Result<InvariantCheck, EngineError> {
        let pool = self
            .pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        let holdings = self
            .ledger
            .balance(Holder::PoolVault(pool_id), TokenId::Settlement);

        let check = invariant::check_pool(holdings, pool);
        let required = pool.total_balance();
        let was_paused = pool.paused;

        if !check.is_intact() && !was_paused {
            let pool = self.pools.get_mut(&pool_id).unwrap();
            pool.paused = true;
            self.emit_event(EventPayload::InvariantViolated(InvariantViolatedEvent {
                pool_id,
                holdings: Quote::new(holdings),
                required,
            }));
            self.emit_event(EventPayload::PoolPaused(PoolPausedEvent {
                pool_id,
                reason: PauseReason::InvariantViolation,
            }));
        }

        Ok(check)
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let events = self.events.events();
        let start = events.len().saturating_sub(count);
        &events[start..]
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(self.events.next_id(), self.current_time, payload);

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.emit(event);
        self.events.retain_recent(self.config.max_events);
    }

    pub(super) fn require_user(caller: Caller) -> Result<UserId, EngineError> {
        caller.user_id().ok_or(EngineError::RequiresUser)
    }

    pub(super) fn require_keeper(caller: Caller) -> Result<(), EngineError> {
        match caller {
            Caller::Keeper | Caller::Governance => Ok(()),
            Caller::User(_) => Err(EngineError::RequiresKeeper),
        }
    }

    pub(super) fn require_governance(caller: Caller) -> Result<(), EngineError> {
        match caller {
            Caller::Governance => Ok(()),
            _ => Err(EngineError::RequiresGovernance),
        }
    }
}
