// pools-core: leveraged pool settlement engine.
// queue-first architecture: every intent waits out an update interval before it prices.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: PoolId, Side, CommitType, Price, Quote
//   2.x  math.rs: token pricing and mint/burn/switch conversions
//   2.1x transfer.rs: sigmoid value transfer and fee skim
//   3.x  intervals.rs: update-interval schedule, front-running deferral
//   4.x  commit_queue.rs: pending commitments, per-interval aggregate totals
//   5.x  aggregation.rs: lazy per-user fold over settled intervals
//   6.x  invariant.rs: backing checks and the pause breaker
//   7.x  pool.rs: pool config + runtime state
//   8.x  engine/: core engine: commits, settlement sweep, claims
//   9.x  oracle.rs: spot/SMA price oracles (mocked)
//   9.1  keeper.rs: upkeep driver binding pools to oracles
//   9.2  tokens.rs: settlement + exposure token ledger (mocked)
//   10.x autoclaim.rs: delegated claim agreements
//   11.x events.rs: state transition events for audit

// core settlement modules
pub mod aggregation;
pub mod commit_queue;
pub mod engine;
pub mod events;
pub mod intervals;
pub mod math;
pub mod pool;
pub mod transfer;
pub mod types;

// safety and service modules
pub mod autoclaim;
pub mod invariant;

// integration modules
pub mod keeper;
pub mod oracle;
pub mod tokens;

// re exports for convenience
pub use aggregation::*;
pub use autoclaim::*;
pub use commit_queue::*;
pub use engine::*;
pub use events::*;
pub use intervals::*;
pub use invariant::*;
pub use math::*;
pub use pool::*;
pub use transfer::*;
pub use types::*;
pub use keeper::PoolKeeper;
pub use oracle::{PriceOracle, SmaOracle, SpotOracle};
pub use tokens::{Holder, LedgerError, TokenId, TokenLedger};
