//! Server-side reaction to help request writes.
//!
//! `reaction` holds the pure guard and planner, `handler` applies the side
//! effects, and `runtime` hosts a handler on a store's change feed with
//! redelivery.

pub mod handler;
pub mod reaction;
pub mod runtime;

pub use handler::{ChangeHandler, Reaction, ResolutionReactor};
pub use reaction::{is_resolution_edge, plan_reaction, ResolutionAction};
pub use runtime::{RetryPolicy, RuntimeStats, TriggerRuntime};
