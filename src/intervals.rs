// 3.0: the update-interval schedule. fixed-duration windows anchored at the
// pool's genesis timestamp: interval i ends at genesis + i*U, the settlement
// price for i is sampled at that boundary, and a late keeper never shifts the
// grid. 3.1 has the front-running target rule, 3.2 the due predicates.

use crate::types::{IntervalId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntervalSchedule {
    pub genesis: Timestamp,
    pub update_interval_ms: i64,
    pub front_running_interval_ms: i64,
}

impl IntervalSchedule {
    pub fn new(genesis: Timestamp, update_interval_ms: i64, front_running_interval_ms: i64) -> Self {
        debug_assert!(update_interval_ms > 0);
        debug_assert!(front_running_interval_ms >= 0);
        Self {
            genesis,
            update_interval_ms,
            front_running_interval_ms,
        }
    }

    /// Boundary at which interval `id` settles and its price is sampled.
    pub fn end_of(&self, id: IntervalId) -> Timestamp {
        self.genesis
            .add_millis(self.update_interval_ms * id.value() as i64)
    }

    // 3.1: the anti-front-running rule. a commit may only land in an interval
    // whose sample time is strictly more than front_running_interval away, so
    // it can never be informed by a price within that window. with the last
    // settled interval at s, the target is s + 1 + floor((now + F - end(s)) / U),
    // which also walks forward correctly when several intervals lapsed without
    // upkeep or when F exceeds U.
    pub fn target_interval(&self, last_settled: IntervalId, now: Timestamp) -> IntervalId {
        let lead = now.as_millis() + self.front_running_interval_ms
            - self.end_of(last_settled).as_millis();
        let intervals_ahead = if lead <= 0 {
            0
        } else {
            (lead / self.update_interval_ms) as u64
        };
        last_settled.offset(1 + intervals_ahead)
    }

    // 3.2: interval `id` can settle once its boundary has been reached.
    pub fn is_settleable(&self, id: IntervalId, now: Timestamp) -> bool {
        now >= self.end_of(id)
    }

    /// Upkeep is due when the interval after the last settled one has ended.
    pub fn upkeep_due(&self, last_settled: IntervalId, now: Timestamp) -> bool {
        self.is_settleable(last_settled.next(), now)
    }

    /// How many whole intervals have elapsed past the last settled boundary.
    pub fn due_count(&self, last_settled: IntervalId, now: Timestamp) -> u64 {
        let elapsed = now.millis_since(self.end_of(last_settled));
        if elapsed <= 0 {
            0
        } else {
            (elapsed / self.update_interval_ms) as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(update_ms: i64, front_ms: i64) -> IntervalSchedule {
        IntervalSchedule::new(Timestamp::from_millis(0), update_ms, front_ms)
    }

    #[test]
    fn interval_boundaries() {
        let s = schedule(10_000, 2_000);
        assert_eq!(s.end_of(IntervalId(0)), Timestamp::from_millis(0));
        assert_eq!(s.end_of(IntervalId(1)), Timestamp::from_millis(10_000));
        assert_eq!(s.end_of(IntervalId(4)), Timestamp::from_millis(40_000));
    }

    #[test]
    fn target_is_upcoming_interval_outside_window() {
        let s = schedule(10_000, 2_000);
        // interval 1 ends at 10_000; window opens at 8_000
        let target = s.target_interval(IntervalId(0), Timestamp::from_millis(7_999));
        assert_eq!(target, IntervalId(1));
    }

    #[test]
    fn target_defers_inside_window() {
        let s = schedule(10_000, 2_000);
        // at exactly end - F the commit is already too close: defer
        let target = s.target_interval(IntervalId(0), Timestamp::from_millis(8_000));
        assert_eq!(target, IntervalId(2));

        let target = s.target_interval(IntervalId(0), Timestamp::from_millis(9_500));
        assert_eq!(target, IntervalId(2));
    }

    #[test]
    fn target_walks_past_lapsed_intervals() {
        let s = schedule(10_000, 2_000);
        // intervals 1-3 already ended without upkeep; committing at 35_000
        // must land past interval 3 and clear the front-running window
        let target = s.target_interval(IntervalId(0), Timestamp::from_millis(35_000));
        assert_eq!(target, IntervalId(4));

        // 38_000 + 2_000 reaches interval 4's boundary: defer to 5
        let target = s.target_interval(IntervalId(0), Timestamp::from_millis(38_000));
        assert_eq!(target, IntervalId(5));
    }

    #[test]
    fn target_with_front_running_longer_than_interval() {
        let s = schedule(10_000, 25_000);
        // now + F = 26_000: intervals 1 and 2 sample too soon, 3 is the first
        // strictly beyond the window
        let target = s.target_interval(IntervalId(0), Timestamp::from_millis(1_000));
        assert_eq!(target, IntervalId(3));
    }

    #[test]
    fn target_with_zero_front_running() {
        let s = schedule(10_000, 0);
        let target = s.target_interval(IntervalId(0), Timestamp::from_millis(0));
        assert_eq!(target, IntervalId(1));

        // at the boundary itself the upcoming interval is exactly due: defer
        let target = s.target_interval(IntervalId(0), Timestamp::from_millis(10_000));
        assert_eq!(target, IntervalId(2));
    }

    #[test]
    fn due_predicates() {
        let s = schedule(10_000, 2_000);
        assert!(!s.upkeep_due(IntervalId(0), Timestamp::from_millis(9_999)));
        assert!(s.upkeep_due(IntervalId(0), Timestamp::from_millis(10_000)));

        assert_eq!(s.due_count(IntervalId(0), Timestamp::from_millis(9_999)), 0);
        assert_eq!(s.due_count(IntervalId(0), Timestamp::from_millis(10_000)), 1);
        assert_eq!(s.due_count(IntervalId(0), Timestamp::from_millis(39_999)), 3);
        assert_eq!(s.due_count(IntervalId(2), Timestamp::from_millis(39_999)), 1);
    }

    #[test]
    fn target_never_at_or_before_last_settled() {
        let s = schedule(10_000, 2_000);
        // clock earlier than the settled boundary still targets the next interval
        let target = s.target_interval(IntervalId(5), Timestamp::from_millis(0));
        assert_eq!(target, IntervalId(6));
    }
}
