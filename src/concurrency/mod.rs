//! Structured concurrency building blocks
//!
//! - [`TaskScope`]: owns a bounded set of subtasks, joins or cancels them as
//!   a unit and reports one aggregated outcome
//! - [`ExecutionContext`]: explicit tag naming the context a unit of work
//!   was dispatched into

pub mod context;
pub mod scope;

pub use context::{ExecutionContext, ExecutionStrategy, UnknownStrategy};
pub use scope::{Joined, ScopeOutcome, Subtask, SubtaskState, TaskScope};
