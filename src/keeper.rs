// 9.1: the upkeep driver. binds each pool to a price oracle, decides when a
// settlement sweep is due, and feeds the engine (entry, exit) price pairs. a
// late keeper samples one exit price per lapsed boundary, so missed intervals
// replay as history instead of compressing into a single jump.

use crate::engine::{Engine, EngineError, UpkeepResult};
use crate::oracle::PriceOracle;
use crate::types::{Caller, PoolId};
use std::collections::HashMap;

#[derive(Debug)]
pub struct PoolKeeper<O> {
    oracles: HashMap<PoolId, O>,
}

impl<O> Default for PoolKeeper<O> {
    fn default() -> Self {
        Self {
            oracles: HashMap::new(),
        }
    }
}

impl<O: PriceOracle> PoolKeeper<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a pool to the oracle its settlements sample from.
    pub fn bind(&mut self, pool_id: PoolId, oracle: O) {
        self.oracles.insert(pool_id, oracle);
    }

    pub fn oracle(&self, pool_id: PoolId) -> Option<&O> {
        self.oracles.get(&pool_id)
    }

    pub fn oracle_mut(&mut self, pool_id: PoolId) -> Option<&mut O> {
        self.oracles.get_mut(&pool_id)
    }

    /// True when the pool exists, is not paused, has a bound oracle, and an
    /// interval boundary has passed.
    pub fn check_upkeep(&self, engine: &Engine, pool_id: PoolId) -> bool {
        let Some(pool) = engine.get_pool(pool_id) else {
            return false;
        };
        !pool.paused && self.oracles.contains_key(&pool_id) && pool.upkeep_due(engine.time())
    }

    // 9.1.1: settle every due interval of one pool, at most the pool's work
    // bound per call. each engine call settles exactly one interval so each
    // one exits at the price sampled at its own boundary; the entry price
    // rolls forward with the samples.
    pub fn perform_upkeep_single_pool(
        &self,
        engine: &mut Engine,
        pool_id: PoolId,
    ) -> Result<UpkeepResult, EngineError> {
        let oracle = self
            .oracles
            .get(&pool_id)
            .ok_or(EngineError::NoPriceSample(pool_id))?;
        let pool = engine
            .get_pool(pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))?;

        let schedule = pool.schedule();
        let bound = pool.config.max_iterations as u64;
        let mut cursor = pool.last_settled_interval;
        let mut entry_price = pool.last_settled_price.value();
        let now = engine.time();

        let mut settled: u64 = 0;
        while settled < bound {
            let next = cursor.next();
            if !schedule.is_settleable(next, now) {
                break;
            }
            let sample = oracle
                .price_at(schedule.end_of(next))
                .or_else(|| oracle.get_price())
                .ok_or(EngineError::NoPriceSample(pool_id))?;

            let result =
                engine.upkeep_bounded(Caller::Keeper, pool_id, entry_price, sample.value(), 1)?;

            settled += result.intervals_settled;
            cursor = result.last_settled_interval;
            entry_price = sample.value();
        }

        if settled == 0 {
            return Err(EngineError::UpkeepNotDue(pool_id));
        }

        Ok(UpkeepResult {
            intervals_settled: settled,
            last_settled_interval: cursor,
            more_due: schedule.is_settleable(cursor.next(), now),
        })
    }

    /// Run upkeep on every listed pool that needs it. Pools fail
    /// independently; one broken feed never stalls the rest.
    pub fn perform_upkeep_multiple_pools(
        &self,
        engine: &mut Engine,
        pool_ids: &[PoolId],
    ) -> Vec<(PoolId, Result<UpkeepResult, EngineError>)> {
        let mut results = Vec::new();
        for &pool_id in pool_ids {
            if !self.check_upkeep(engine, pool_id) {
                continue;
            }
            results.push((pool_id, self.perform_upkeep_single_pool(engine, pool_id)));
        }
        results
    }
}
