//! Structured fan-out scope
//!
//! A [`TaskScope`] owns a bounded set of subtasks forked onto the tokio
//! runtime. Joining waits until every subtask is terminal; the first failure
//! aborts the remaining siblings. Subtask values can only be moved out through
//! the [`Joined`] token of a successful join, so a cancelled or failed scope
//! never exposes partial results.
//!
//! ```rust,ignore
//! let mut scope = TaskScope::new(ExecutionContext::lightweight("quote"));
//! let bid = scope.fork("bid", |_| async { Ok::<_, MyError>(fetch_bid().await?) });
//! let ask = scope.fork("ask", |_| async { Ok::<_, MyError>(fetch_ask().await?) });
//!
//! match scope.join().await {
//!     ScopeOutcome::AllSucceeded(joined) => (joined.take(bid), joined.take(ask)),
//!     ScopeOutcome::FirstFailure(error) => return Err(error),
//! };
//! ```

use crate::concurrency::context::ExecutionContext;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, debug_span, Instrument};

/// Observable lifecycle of a forked subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskState {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Terminal state assigned at most once
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    const RUNNING: u8 = 0;
    const SUCCEEDED: u8 = 1;
    const FAILED: u8 = 2;
    const CANCELLED: u8 = 3;

    fn new() -> Self {
        Self(AtomicU8::new(Self::RUNNING))
    }

    /// Move out of `Running`; returns false when already terminal
    fn settle(&self, state: SubtaskState) -> bool {
        let target = match state {
            SubtaskState::Running => return false,
            SubtaskState::Succeeded => Self::SUCCEEDED,
            SubtaskState::Failed => Self::FAILED,
            SubtaskState::Cancelled => Self::CANCELLED,
        };
        self.0
            .compare_exchange(Self::RUNNING, target, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn load(&self) -> SubtaskState {
        match self.0.load(Ordering::Acquire) {
            Self::SUCCEEDED => SubtaskState::Succeeded,
            Self::FAILED => SubtaskState::Failed,
            Self::CANCELLED => SubtaskState::Cancelled,
            _ => SubtaskState::Running,
        }
    }
}

/// Handle to one forked subtask
#[derive(Debug)]
pub struct Subtask<T> {
    context: ExecutionContext,
    state: Arc<StateCell>,
    slot: Arc<Mutex<Option<T>>>,
    scope: Arc<()>,
}

impl<T> Subtask<T> {
    pub fn state(&self) -> SubtaskState {
        self.state.load()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}

/// Proof that every subtask of a scope succeeded
#[derive(Debug)]
pub struct Joined {
    scope: Arc<()>,
}

impl Joined {
    /// Move the value of a subtask forked from the joined scope
    ///
    /// Returns `None` for a handle belonging to a different scope.
    pub fn take<T>(&self, subtask: Subtask<T>) -> Option<T> {
        if !Arc::ptr_eq(&self.scope, &subtask.scope) {
            return None;
        }
        subtask.slot.lock().take()
    }
}

/// Aggregated result of joining a scope
#[derive(Debug)]
pub enum ScopeOutcome<E> {
    AllSucceeded(Joined),
    FirstFailure(E),
}

impl<E> ScopeOutcome<E> {
    pub fn into_result(self) -> Result<Joined, E> {
        match self {
            Self::AllSucceeded(joined) => Ok(joined),
            Self::FirstFailure(error) => Err(error),
        }
    }
}

/// Owner of a bounded set of concurrent subtasks
///
/// Dropping the scope without joining aborts everything still running.
pub struct TaskScope<E: Send + 'static> {
    context: ExecutionContext,
    tasks: JoinSet<(usize, Result<(), E>)>,
    states: Vec<Arc<StateCell>>,
    token: Arc<()>,
}

impl<E: Send + 'static> TaskScope<E> {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            tasks: JoinSet::new(),
            states: Vec::new(),
            token: Arc::new(()),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Number of subtasks forked so far
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Fork a subtask; `task` receives the child context it runs under
    ///
    /// Must be called from within a tokio runtime.
    pub fn fork<T, F, Fut>(&mut self, name: &str, task: F) -> Subtask<T>
    where
        T: Send + 'static,
        F: FnOnce(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let ordinal = self.states.len();
        let context = self.context.child(name, ordinal);
        let state = Arc::new(StateCell::new());
        let slot = Arc::new(Mutex::new(None));

        let work = task(context.clone());
        let task_state = Arc::clone(&state);
        let task_slot = Arc::clone(&slot);
        let span = debug_span!("subtask", context = %context);

        self.tasks.spawn(
            async move {
                match work.await {
                    Ok(value) => {
                        if task_state.settle(SubtaskState::Succeeded) {
                            *task_slot.lock() = Some(value);
                        }
                        (ordinal, Ok(()))
                    }
                    Err(error) => {
                        task_state.settle(SubtaskState::Failed);
                        (ordinal, Err(error))
                    }
                }
            }
            .instrument(span),
        );
        self.states.push(Arc::clone(&state));

        Subtask {
            context,
            state,
            slot,
            scope: Arc::clone(&self.token),
        }
    }

    /// Wait for every subtask to become terminal
    ///
    /// On failure the error of the lowest-ordinal failed subtask is returned,
    /// which keeps the reported error independent of completion order
    /// whenever several subtasks fail before cancellation reaches them.
    pub async fn join(mut self) -> ScopeOutcome<E> {
        let failure = self.drain().await;
        self.finish(failure)
    }

    /// Like [`join`](Self::join), bounded by `deadline`
    ///
    /// Subtasks still running at the deadline are aborted and `on_elapsed`
    /// supplies the failure.
    pub async fn join_until(
        mut self,
        deadline: Instant,
        on_elapsed: impl FnOnce() -> E,
    ) -> ScopeOutcome<E> {
        match tokio::time::timeout_at(deadline, self.drain()).await {
            Ok(failure) => self.finish(failure),
            Err(_) => {
                debug!(context = %self.context, "scope deadline elapsed, aborting subtasks");
                self.tasks.abort_all();
                let mut ignored = None;
                while let Some(result) = self.tasks.join_next().await {
                    self.record(result, &mut ignored);
                }
                self.cancel_remaining();
                ScopeOutcome::FirstFailure(on_elapsed())
            }
        }
    }

    async fn drain(&mut self) -> Option<(usize, E)> {
        let mut failure = None;
        while let Some(result) = self.tasks.join_next().await {
            self.record(result, &mut failure);
        }
        failure
    }

    fn record(
        &mut self,
        result: Result<(usize, Result<(), E>), JoinError>,
        failure: &mut Option<(usize, E)>,
    ) {
        match result {
            Ok((_, Ok(()))) => {}
            Ok((ordinal, Err(error))) => {
                if failure.is_none() {
                    debug!(
                        context = %self.context,
                        ordinal,
                        "subtask failed, cancelling siblings"
                    );
                    self.tasks.abort_all();
                }
                let keep_existing = matches!(failure, Some((existing, _)) if *existing < ordinal);
                if !keep_existing {
                    *failure = Some((ordinal, error));
                }
            }
            Err(join_error) if join_error.is_panic() => {
                self.tasks.abort_all();
                self.cancel_remaining();
                std::panic::resume_unwind(join_error.into_panic());
            }
            // Aborted subtasks are marked once draining is over
            Err(_) => {}
        }
    }

    fn cancel_remaining(&self) {
        for state in &self.states {
            state.settle(SubtaskState::Cancelled);
        }
    }

    fn finish(&self, failure: Option<(usize, E)>) -> ScopeOutcome<E> {
        self.cancel_remaining();
        match failure {
            None => ScopeOutcome::AllSucceeded(Joined {
                scope: Arc::clone(&self.token),
            }),
            Some((_, error)) => ScopeOutcome::FirstFailure(error),
        }
    }
}

impl<E: Send + 'static> Drop for TaskScope<E> {
    fn drop(&mut self) {
        self.tasks.abort_all();
        self.cancel_remaining();
    }
}
