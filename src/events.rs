// 11.0: every state change produces an event. used for audit trails, state
// reconstruction, and notifying external systems. the EventPayload enum lists
// all event types.

use crate::types::{
    CommitId, CommitType, IntervalId, PoolId, PoolTokens, Price, Quote, Side, Timestamp, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Commit queue events
    CommitCreated(CommitCreatedEvent),
    CommitRemoved(CommitRemovedEvent),
    CommitsExecuted(CommitsExecutedEvent),

    // Settlement events
    PriceChangeExecuted(PriceChangeExecutedEvent),
    UpkeepPerformed(UpkeepPerformedEvent),

    // Aggregation events
    AggregateBalanceUpdated(AggregateBalanceUpdatedEvent),
    Claimed(ClaimedEvent),

    // Account events
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),

    // AutoClaim events
    AutoClaimRequested(AutoClaimRequestedEvent),
    AutoClaimExecuted(AutoClaimExecutedEvent),
    AutoClaimWithdrawn(AutoClaimWithdrawnEvent),

    // Safety events
    InvariantViolated(InvariantViolatedEvent),
    PoolPaused(PoolPausedEvent),
    PoolUnpaused(PoolUnpausedEvent),

    // Admin events
    PoolCreated(PoolCreatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitCreatedEvent {
    pub pool_id: PoolId,
    pub commit_id: CommitId,
    pub user_id: UserId,
    pub commit_type: CommitType,
    pub amount: Decimal,
    pub interval_id: IntervalId,
    pub from_aggregate: bool,
    pub claim_reward: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRemovedEvent {
    pub pool_id: PoolId,
    pub commit_id: CommitId,
    pub user_id: UserId,
    pub commit_type: CommitType,
    pub amount: Decimal,
    pub interval_id: IntervalId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitsExecutedEvent {
    pub pool_id: PoolId,
    pub interval_id: IntervalId,
    // settlement token prices recorded for the interval, used later by
    // lazy aggregation
    pub long_price: Decimal,
    pub short_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChangeExecutedEvent {
    pub pool_id: PoolId,
    pub interval_id: IntervalId,
    pub old_price: Price,
    pub new_price: Price,
    pub transfer: Quote,
    pub winner: Option<Side>,
    pub fee: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpkeepPerformedEvent {
    pub pool_id: PoolId,
    pub intervals_settled: u64,
    pub last_settled_interval: IntervalId,
    // true when the work bound cut the sweep short and another call is needed
    pub more_due: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateBalanceUpdatedEvent {
    pub pool_id: PoolId,
    pub user_id: UserId,
    pub intervals_folded: u64,
    pub long_tokens: PoolTokens,
    pub short_tokens: PoolTokens,
    pub settlement: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimedEvent {
    pub pool_id: PoolId,
    pub user_id: UserId,
    pub long_tokens: PoolTokens,
    pub short_tokens: PoolTokens,
    pub settlement: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub user_id: UserId,
    pub amount: Quote,
    pub new_balance: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    pub user_id: UserId,
    pub amount: Quote,
    pub new_balance: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoClaimRequestedEvent {
    pub pool_id: PoolId,
    pub user_id: UserId,
    pub reward: Quote,
    pub interval_id: IntervalId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoClaimExecutedEvent {
    pub pool_id: PoolId,
    pub user_id: UserId,
    pub executor: UserId,
    pub reward: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoClaimWithdrawnEvent {
    pub pool_id: PoolId,
    pub user_id: UserId,
    pub reward: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantViolatedEvent {
    pub pool_id: PoolId,
    pub holdings: Quote,
    pub required: Quote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseReason {
    InvariantViolation,
    Governance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolPausedEvent {
    pub pool_id: PoolId,
    pub reason: PauseReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolUnpausedEvent {
    pub pool_id: PoolId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolCreatedEvent {
    pub pool_id: PoolId,
    pub name: String,
    pub leverage: Decimal,
    pub update_interval_ms: i64,
    pub front_running_interval_ms: i64,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Drop the oldest events beyond `max`.
    pub fn retain_recent(&mut self, max: usize) {
        if self.events.len() > max {
            let drain_count = self.events.len() - max;
            self.events.drain(0..drain_count);
        }
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn event_collector() {
        let mut collector = EventCollector::new();

        let event = Event::new(
            collector.next_id(),
            Timestamp::from_millis(1000),
            EventPayload::Deposit(DepositEvent {
                user_id: UserId(1),
                amount: Quote::new(dec!(10000)),
                new_balance: Quote::new(dec!(10000)),
            }),
        );

        collector.emit(event);
        assert_eq!(collector.events().len(), 1);

        collector.clear();
        assert!(collector.events().is_empty());
    }

    #[test]
    fn commit_created_event() {
        let created = CommitCreatedEvent {
            pool_id: PoolId(1),
            commit_id: CommitId(42),
            user_id: UserId(7),
            commit_type: CommitType::LongMint,
            amount: dec!(2000),
            interval_id: IntervalId(3),
            from_aggregate: false,
            claim_reward: Quote::zero(),
        };

        assert_eq!(created.interval_id, IntervalId(3));
        assert_eq!(created.amount, dec!(2000));
    }

    #[test]
    fn price_change_event_carries_transfer_direction() {
        let settled = PriceChangeExecutedEvent {
            pool_id: PoolId(1),
            interval_id: IntervalId(2),
            old_price: Price::new_unchecked(dec!(100)),
            new_price: Price::new_unchecked(dec!(101)),
            transfer: Quote::new(dec!(59.8)),
            winner: Some(Side::Long),
            fee: Quote::new(dec!(2)),
        };

        assert_eq!(settled.winner, Some(Side::Long));
        assert!(settled.transfer.value() > Decimal::ZERO);
    }
}
