// 4.0: the commit queue. holds per-interval aggregate totals, per-user pending
// records, and an intrusive doubly-linked index of live (unexecuted) commitments
// so a cancellation is an O(1) unlink instead of an array reflow. 4.1 enqueue,
// 4.2 cancel, 4.3 the execution sweep, 4.4 the aggregation drain.

use crate::types::{CommitId, CommitType, IntervalId, Quote, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Per-interval sums of queued amounts, one slot per commit type. Used both
/// for the interval totals the settlement sweep executes and for each user's
/// pending records that lazy aggregation folds later. Mint slots are in
/// settlement asset, burn and switch slots in exposure tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCommits {
    pub long_mint_settlement: Decimal,
    pub long_burn_tokens: Decimal,
    pub short_mint_settlement: Decimal,
    pub short_burn_tokens: Decimal,
    pub long_burn_short_mint_tokens: Decimal,
    pub short_burn_long_mint_tokens: Decimal,
}

impl AggregateCommits {
    pub fn add(&mut self, commit_type: CommitType, amount: Decimal) {
        match commit_type {
            CommitType::LongMint => self.long_mint_settlement += amount,
            CommitType::LongBurn => self.long_burn_tokens += amount,
            CommitType::ShortMint => self.short_mint_settlement += amount,
            CommitType::ShortBurn => self.short_burn_tokens += amount,
            CommitType::LongBurnShortMint => self.long_burn_short_mint_tokens += amount,
            CommitType::ShortBurnLongMint => self.short_burn_long_mint_tokens += amount,
        }
    }

    pub fn subtract(&mut self, commit_type: CommitType, amount: Decimal) {
        match commit_type {
            CommitType::LongMint => self.long_mint_settlement -= amount,
            CommitType::LongBurn => self.long_burn_tokens -= amount,
            CommitType::ShortMint => self.short_mint_settlement -= amount,
            CommitType::ShortBurn => self.short_burn_tokens -= amount,
            CommitType::LongBurnShortMint => self.long_burn_short_mint_tokens -= amount,
            CommitType::ShortBurnLongMint => self.short_burn_long_mint_tokens -= amount,
        }
    }

    pub fn amount_of(&self, commit_type: CommitType) -> Decimal {
        match commit_type {
            CommitType::LongMint => self.long_mint_settlement,
            CommitType::LongBurn => self.long_burn_tokens,
            CommitType::ShortMint => self.short_mint_settlement,
            CommitType::ShortBurn => self.short_burn_tokens,
            CommitType::LongBurnShortMint => self.long_burn_short_mint_tokens,
            CommitType::ShortBurnLongMint => self.short_burn_long_mint_tokens,
        }
    }

    /// Long exposure tokens queued to be retired by this record.
    pub fn long_burn_total(&self) -> Decimal {
        self.long_burn_tokens + self.long_burn_short_mint_tokens
    }

    /// Short exposure tokens queued to be retired by this record.
    pub fn short_burn_total(&self) -> Decimal {
        self.short_burn_tokens + self.short_burn_long_mint_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.long_mint_settlement.is_zero()
            && self.long_burn_tokens.is_zero()
            && self.short_mint_settlement.is_zero()
            && self.short_burn_tokens.is_zero()
            && self.long_burn_short_mint_tokens.is_zero()
            && self.short_burn_long_mint_tokens.is_zero()
    }
}

/// A live queued intent. Individually tracked only until its interval
/// executes; after that only the aggregate records matter and the node is
/// dropped from the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub id: CommitId,
    pub owner: UserId,
    pub interval_id: IntervalId,
    pub commit_type: CommitType,
    pub amount: Decimal,
    pub from_aggregate: bool,
    pub claim_reward: Quote,
    pub created_at: Timestamp,
    prev: Option<CommitId>,
    next: Option<CommitId>,
}

#[derive(Debug, Clone, Default)]
pub struct CommitQueue {
    commitments: HashMap<CommitId, Commitment>,
    // head/tail of the live index, in commit order. None on both = no commits
    // remaining. commit order implies non-decreasing interval order because
    // the target interval never moves backward in time.
    earliest_unexecuted: Option<CommitId>,
    latest_unexecuted: Option<CommitId>,
    // interval totals for intervals not yet executed
    totals: BTreeMap<IntervalId, AggregateCommits>,
    // per-user pending records. keys are the user's unaggregated interval IDs;
    // entries outlive execution and are consumed by the aggregation fold.
    user_commits: HashMap<UserId, BTreeMap<IntervalId, AggregateCommits>>,
    next_commit_id: u64,
}

impl CommitQueue {
    pub fn new() -> Self {
        Self {
            commitments: HashMap::new(),
            earliest_unexecuted: None,
            latest_unexecuted: None,
            totals: BTreeMap::new(),
            user_commits: HashMap::new(),
            next_commit_id: 1,
        }
    }

    // 4.1: append a new commitment at the tail of the live index and fold its
    // amount into the interval total and the owner's pending record.
    #[allow(clippy::too_many_arguments)]
    pub fn enqueue(
        &mut self,
        owner: UserId,
        interval_id: IntervalId,
        commit_type: CommitType,
        amount: Decimal,
        from_aggregate: bool,
        claim_reward: Quote,
        now: Timestamp,
    ) -> CommitId {
        let id = CommitId(self.next_commit_id);
        self.next_commit_id += 1;

        let node = Commitment {
            id,
            owner,
            interval_id,
            commit_type,
            amount,
            from_aggregate,
            claim_reward,
            created_at: now,
            prev: self.latest_unexecuted,
            next: None,
        };

        if let Some(tail) = self.latest_unexecuted {
            if let Some(t) = self.commitments.get_mut(&tail) {
                t.next = Some(id);
            }
        } else {
            self.earliest_unexecuted = Some(id);
        }
        self.latest_unexecuted = Some(id);
        self.commitments.insert(id, node);

        self.totals.entry(interval_id).or_default().add(commit_type, amount);
        self.user_commits
            .entry(owner)
            .or_default()
            .entry(interval_id)
            .or_default()
            .add(commit_type, amount);

        id
    }

    // 4.2: unlink a live commitment and roll its amount back out of the
    // interval total and the owner's pending record. returns the node so the
    // caller can refund the original asset movement. None if the commitment
    // was already executed or never existed.
    pub fn remove(&mut self, id: CommitId) -> Option<Commitment> {
        let node = self.commitments.remove(&id)?;

        match node.prev {
            Some(p) => {
                if let Some(prev) = self.commitments.get_mut(&p) {
                    prev.next = node.next;
                }
            }
            None => self.earliest_unexecuted = node.next,
        }
        match node.next {
            Some(n) => {
                if let Some(next) = self.commitments.get_mut(&n) {
                    next.prev = node.prev;
                }
            }
            None => self.latest_unexecuted = node.prev,
        }

        if let Some(total) = self.totals.get_mut(&node.interval_id) {
            total.subtract(node.commit_type, node.amount);
            if total.is_empty() {
                self.totals.remove(&node.interval_id);
            }
        }
        if let Some(user) = self.user_commits.get_mut(&node.owner) {
            if let Some(record) = user.get_mut(&node.interval_id) {
                record.subtract(node.commit_type, node.amount);
                if record.is_empty() {
                    user.remove(&node.interval_id);
                }
            }
            if user.is_empty() {
                self.user_commits.remove(&node.owner);
            }
        }

        Some(node)
    }

    // 4.3: drop every live commitment targeting an interval at or before the
    // one just executed. walks from the head; stops at the first node whose
    // interval is still in the future, which is correct because the index is
    // in non-decreasing interval order. the nodes are spent, not cancelled:
    // aggregate totals for the interval are consumed separately.
    pub fn retire_executed(&mut self, up_to: IntervalId) -> usize {
        let mut retired = 0;
        while let Some(head) = self.earliest_unexecuted {
            let interval = match self.commitments.get(&head) {
                Some(node) => node.interval_id,
                None => break,
            };
            if interval > up_to {
                break;
            }
            if let Some(node) = self.commitments.remove(&head) {
                self.earliest_unexecuted = node.next;
                match node.next {
                    Some(n) => {
                        if let Some(next) = self.commitments.get_mut(&n) {
                            next.prev = None;
                        }
                    }
                    None => self.latest_unexecuted = None,
                }
                retired += 1;
            }
        }
        retired
    }

    /// Remove and return the aggregate totals for an interval about to
    /// execute. Empty record if nothing was queued for it.
    pub fn take_totals(&mut self, interval_id: IntervalId) -> AggregateCommits {
        self.totals.remove(&interval_id).unwrap_or_default()
    }

    // 4.4: pull up to `max_entries` of the user's oldest pending records whose
    // interval has settled. the remainder stays put for a later call, which is
    // what makes the lazy fold resumable and idempotent.
    pub fn drain_settled_pending(
        &mut self,
        user: UserId,
        last_settled: IntervalId,
        max_entries: usize,
    ) -> Vec<(IntervalId, AggregateCommits)> {
        let Some(pending) = self.user_commits.get_mut(&user) else {
            return Vec::new();
        };

        let due: Vec<IntervalId> = pending
            .keys()
            .take_while(|id| **id <= last_settled)
            .take(max_entries)
            .copied()
            .collect();

        let mut drained = Vec::with_capacity(due.len());
        for id in due {
            if let Some(record) = pending.remove(&id) {
                drained.push((id, record));
            }
        }
        if pending.is_empty() {
            self.user_commits.remove(&user);
        }
        drained
    }

    pub fn get(&self, id: CommitId) -> Option<&Commitment> {
        self.commitments.get(&id)
    }

    pub fn totals_for(&self, interval_id: IntervalId) -> Option<&AggregateCommits> {
        self.totals.get(&interval_id)
    }

    pub fn user_pending(&self, user: UserId) -> Option<&BTreeMap<IntervalId, AggregateCommits>> {
        self.user_commits.get(&user)
    }

    /// Number of interval IDs the user has not yet folded into their
    /// aggregate balance.
    pub fn unaggregated_count(&self, user: UserId) -> usize {
        self.user_commits.get(&user).map_or(0, |p| p.len())
    }

    pub fn live_count(&self) -> usize {
        self.commitments.len()
    }

    pub fn earliest_unexecuted(&self) -> Option<CommitId> {
        self.earliest_unexecuted
    }

    pub fn latest_unexecuted(&self) -> Option<CommitId> {
        self.latest_unexecuted
    }

    /// Live commitments in commit order, head first.
    pub fn iter_live(&self) -> LiveIter<'_> {
        LiveIter {
            queue: self,
            cursor: self.earliest_unexecuted,
        }
    }
}

pub struct LiveIter<'a> {
    queue: &'a CommitQueue,
    cursor: Option<CommitId>,
}

impl<'a> Iterator for LiveIter<'a> {
    type Item = &'a Commitment;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.queue.commitments.get(&id)?;
        self.cursor = node.next;
        Some(node)
    }
}
