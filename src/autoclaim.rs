// 10.0: delegated claims. a user escrows a reward when committing; once the
// commit's interval settles, anyone may trigger the claim on the user's behalf
// and collect the reward. saves small users from polling for settlement.
// the escrowed settlement asset itself sits in the ledger's escrow account;
// this store only tracks who is owed what and from which interval.

use crate::types::{IntervalId, PoolId, Quote, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One pending delegated-claim agreement for a (user, pool) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// The request becomes executable once this interval has settled.
    pub update_interval_id: IntervalId,
    /// Total escrowed reward for the executor.
    pub reward: Quote,
}

#[derive(Debug, Clone, Default)]
pub struct AutoClaim {
    requests: HashMap<(UserId, PoolId), ClaimRequest>,
}

impl AutoClaim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: UserId, pool: PoolId) -> Option<&ClaimRequest> {
        self.requests.get(&(user, pool))
    }

    /// Due once the anchored interval is at or before the last settled one.
    pub fn is_due(&self, user: UserId, pool: PoolId, last_settled: IntervalId) -> bool {
        self.get(user, pool)
            .map_or(false, |r| r.update_interval_id <= last_settled)
    }

    // 10.1: record or top up an escrow. an existing request keeps its reward
    // and is re-anchored to the newer interval, so repeated commits extend one
    // agreement instead of stacking several.
    pub fn upsert(&mut self, user: UserId, pool: PoolId, reward: Quote, interval: IntervalId) -> Quote {
        let entry = self.requests.entry((user, pool)).or_insert(ClaimRequest {
            update_interval_id: interval,
            reward: Quote::zero(),
        });
        entry.reward = entry.reward.add(reward);
        entry.update_interval_id = interval;
        entry.reward
    }

    /// Remove and return a request, for execution or owner withdrawal.
    pub fn take(&mut self, user: UserId, pool: PoolId) -> Option<ClaimRequest> {
        self.requests.remove(&(user, pool))
    }

    /// Remove and return only if due; a not-due request stays untouched.
    pub fn take_if_due(
        &mut self,
        user: UserId,
        pool: PoolId,
        last_settled: IntervalId,
    ) -> Option<ClaimRequest> {
        if self.is_due(user, pool, last_settled) {
            self.requests.remove(&(user, pool))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(UserId, PoolId), &ClaimRequest)> {
        self.requests.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn upsert_accumulates_and_reanchors() {
        let mut store = AutoClaim::new();

        let total = store.upsert(UserId(1), PoolId(1), Quote::new(dec!(5)), IntervalId(2));
        assert_eq!(total.value(), dec!(5));

        let total = store.upsert(UserId(1), PoolId(1), Quote::new(dec!(3)), IntervalId(4));
        assert_eq!(total.value(), dec!(8));

        let request = store.get(UserId(1), PoolId(1)).unwrap();
        assert_eq!(request.update_interval_id, IntervalId(4));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn due_once_interval_settles() {
        let mut store = AutoClaim::new();
        store.upsert(UserId(1), PoolId(1), Quote::new(dec!(5)), IntervalId(3));

        assert!(!store.is_due(UserId(1), PoolId(1), IntervalId(2)));
        assert!(store.is_due(UserId(1), PoolId(1), IntervalId(3)));
        assert!(store.is_due(UserId(1), PoolId(1), IntervalId(7)));
    }

    #[test]
    fn take_if_due_leaves_not_due_requests() {
        let mut store = AutoClaim::new();
        store.upsert(UserId(1), PoolId(1), Quote::new(dec!(5)), IntervalId(3));

        assert!(store.take_if_due(UserId(1), PoolId(1), IntervalId(2)).is_none());
        assert_eq!(store.len(), 1);

        let taken = store.take_if_due(UserId(1), PoolId(1), IntervalId(3)).unwrap();
        assert_eq!(taken.reward.value(), dec!(5));
        assert!(store.is_empty());
    }

    #[test]
    fn requests_keyed_per_user_and_pool() {
        let mut store = AutoClaim::new();
        store.upsert(UserId(1), PoolId(1), Quote::new(dec!(1)), IntervalId(1));
        store.upsert(UserId(1), PoolId(2), Quote::new(dec!(2)), IntervalId(1));
        store.upsert(UserId(2), PoolId(1), Quote::new(dec!(3)), IntervalId(1));

        assert_eq!(store.len(), 3);
        assert_eq!(store.get(UserId(1), PoolId(2)).unwrap().reward.value(), dec!(2));

        store.take(UserId(1), PoolId(1));
        assert!(store.get(UserId(1), PoolId(1)).is_none());
        assert_eq!(store.len(), 2);
    }
}
