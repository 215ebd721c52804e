//! Conservation invariants and the pause breaker.
//!
//! After every settlement the engine verifies that the pool vault still backs
//! both side balances. A violation does not fail the call that exposed it:
//! the pool is paused instead, and stays paused until governance manually
//! unpauses. Unpausing performs no corrective accounting.

use crate::pool::PoolState;
use crate::types::{PoolTokens, Quote, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of an invariant sweep over one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantCheck {
    Intact,
    Violated(InvariantFault),
}

impl InvariantCheck {
    pub fn is_intact(&self) -> bool {
        matches!(self, InvariantCheck::Intact)
    }
}

/// What exactly broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantFault {
    /// Settlement-asset holdings no longer cover the two side balances.
    Underbacked { holdings: Quote, required: Quote },
    /// A side balance went negative.
    NegativeSideBalance { side: Side, balance: Quote },
    /// A burn shadow went negative: more shadow released than was recorded.
    NegativePendingBurn { side: Side, pending: PoolTokens },
}

/// The backing invariant: vault holdings must cover longBalance + shortBalance.
/// Fees already skimmed have left the balances, so they do not loosen the bound.
pub fn check_backing(vault_holdings: Decimal, pool: &PoolState) -> InvariantCheck {
    let required = pool.total_balance();
    if vault_holdings < required.value() {
        return InvariantCheck::Violated(InvariantFault::Underbacked {
            holdings: Quote::new(vault_holdings),
            required,
        });
    }
    InvariantCheck::Intact
}

/// Accounting sanity for one pool: no side balance or burn shadow below zero.
pub fn check_side_integrity(pool: &PoolState) -> InvariantCheck {
    for side in [Side::Long, Side::Short] {
        let balance = pool.side_balance(side);
        if balance.is_negative() {
            return InvariantCheck::Violated(InvariantFault::NegativeSideBalance { side, balance });
        }
        let pending = pool.pending_burn(side);
        if pending.value() < Decimal::ZERO {
            return InvariantCheck::Violated(InvariantFault::NegativePendingBurn { side, pending });
        }
    }
    InvariantCheck::Intact
}

/// Full sweep: backing first, then accounting sanity.
pub fn check_pool(vault_holdings: Decimal, pool: &PoolState) -> InvariantCheck {
    let backing = check_backing(vault_holdings, pool);
    if !backing.is_intact() {
        return backing;
    }
    check_side_integrity(pool)
}
