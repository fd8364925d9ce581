//! Bake step scheduling.
//!
//! A bake step is a manual-approval action that the enforcer resolves itself:
//! approved once it has been pending for its configured bake time, rejected
//! as soon as any guarding alarm fails. There is no timer state; each cycle
//! re-derives everything from the snapshot:
//!
//! 1. [`find_bake_candidates`]: which configured actions are pending
//! 2. [`resolve_start_times`]: when each pending action started
//! 3. [`alarm_queries`]: which alarms to check, with bake start as cutoff
//! 4. [`decide_bake_actions`]: `CONTINUE` / `APPROVE` / `REJECT`
//!
//! Approval tokens are single-use, so a duplicated or late tick can at worst
//! delay an approval, never apply it twice.

mod candidates;
mod decide;
mod start_times;

pub use candidates::{BakeCandidates, find_bake_candidates};
pub use decide::{alarm_queries, decide_bake_actions};
pub use start_times::{StartTimeError, resolve_start_times};
