// 8.0.2: result types and errors for engine operations.

use crate::pool::PoolError;
use crate::tokens::LedgerError;
use crate::types::{CommitId, IntervalId, PoolId, PoolTokens, Price, Quote, Side, UserId};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
pub struct CommitResult {
    pub commit_id: CommitId,
    /// Interval the commitment landed in after the front-running deferral.
    pub interval_id: IntervalId,
}

#[derive(Debug, Clone, Copy)]
pub struct UpkeepResult {
    pub intervals_settled: u64,
    pub last_settled_interval: IntervalId,
    /// True when the work bound cut the sweep short; call again to finish.
    pub more_due: bool,
}

/// What a claim moved out to the user's wallet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimResult {
    pub long_tokens: PoolTokens,
    pub short_tokens: PoolTokens,
    pub settlement: Quote,
}

impl ClaimResult {
    pub fn is_empty(&self) -> bool {
        self.long_tokens.is_zero() && self.short_tokens.is_zero() && self.settlement.is_zero()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("pool {0:?} not found")]
    PoolNotFound(PoolId),

    #[error("commitment {0:?} not found")]
    CommitNotFound(CommitId),

    #[error("commitment {0:?} belongs to another user")]
    NotOwner(CommitId),

    #[error("operation requires a user caller")]
    RequiresUser,

    #[error("operation requires the keeper")]
    RequiresKeeper,

    #[error("operation requires governance")]
    RequiresGovernance,

    #[error("no claim request for user {user:?} in pool {pool:?}")]
    NoClaimRequest { user: UserId, pool: PoolId },

    #[error("no interval due for settlement in pool {0:?}")]
    UpkeepNotDue(PoolId),

    #[error("stale execution price: expected {expected}, got {provided}")]
    StalePrice { expected: Price, provided: Decimal },

    #[error("invalid price sample: {0}")]
    InvalidPrice(Decimal),

    #[error("no oracle price sample available for pool {0:?}")]
    NoPriceSample(PoolId),

    #[error("aggregate balance holds {available} {side} tokens, requested {requested}")]
    InsufficientAggregateBalance {
        side: Side,
        requested: Decimal,
        available: Decimal,
    },

    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
