// 8.0: the settlement engine. coordinates pools, the token ledger, commit
// intake, the interval settlement sweep, lazy aggregation, claims, and the
// invariant breaker. deterministic and event-driven with no external I/O.

mod claims;
mod commits;
mod config;
mod core;
mod results;
mod upkeep;

pub use commits::CommitArgs;
pub use config::EngineConfig;
pub use core::Engine;
pub use results::{ClaimResult, CommitResult, EngineError, UpkeepResult};
