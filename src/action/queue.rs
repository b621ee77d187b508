//! The action task queue.
//!
//! `spec.md` §4.2: an ordered list of steps, a cursor that only moves
//! forward, `start()`/`next()` to advance it, and `done()` as an
//! idempotent terminal marker. Every S3 verb shares the
//! `{validate -> load bucket -> do work -> respond}` skeleton; representing
//! it as data (rather than as a chain of closures capturing each other)
//! lets that skeleton be inspected and instrumented uniformly -- the
//! design note in `spec.md` §4.2 calls out audit logging and timing at
//! queue granularity as the reason.
//!
//! Reading `original_source/server/s3_delete_multiple_objects_action.cc`
//! closely, the generic `next()` dispatch is only used for the first two
//! transitions of a verb (`validate_request` -> `fetch_bucket_info` ->
//! `fetch_objects_info`); everything downstream of that -- windowed
//! fan-out, the terminal response -- is a direct function call in the
//! original, not routed back through the queue's cursor. The Rust
//! translation keeps that shape: [`TaskQueue::run`] drives the cursor
//! until a step reports [`StepOutcome::Terminated`], at which point the
//! step itself (or something it called directly) has already produced
//! the response. All five named steps of a verb are still enqueued, so
//! the queue can be walked for audit/timing instrumentation even though
//! only a prefix of them is ever reached via the cursor.

use std::future::Future;
use std::pin::Pin;

/// What a step decided after running to its own suspension point.
pub enum StepOutcome {
    /// Advance the cursor and run the step immediately after it.
    Next,
    /// The action has already reached a terminal response (this step, or
    /// something it called directly, invoked the Response Emitter). The
    /// queue stops driving immediately; no step runs after this.
    Terminated,
}

type StepFuture<'a> = Pin<Box<dyn Future<Output = StepOutcome> + Send + 'a>>;

/// A single step: a plain function pointer over the verb's own state type.
/// Function pointers (not boxed closures) are sufficient because a step
/// needs no captured environment beyond `state`.
pub type StepFn<S> = for<'a> fn(&'a mut S) -> StepFuture<'a>;

/// Ordered list of steps for one action, plus the cursor into it.
pub struct TaskQueue<S> {
    steps: Vec<(&'static str, StepFn<S>)>,
    cursor: usize,
    started: bool,
    terminated: bool,
}

impl<S> TaskQueue<S> {
    pub fn new() -> Self {
        TaskQueue {
            steps: Vec::new(),
            cursor: 0,
            started: false,
            terminated: false,
        }
    }

    /// Append a step. Legal only before [`TaskQueue::run`] is called.
    pub fn enqueue(&mut self, name: &'static str, step: StepFn<S>) {
        assert!(!self.started, "cannot enqueue steps after the action starts");
        self.steps.push((name, step));
    }

    /// The step names in task-list order, for audit/timing instrumentation.
    pub fn step_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|(name, _)| *name)
    }

    /// True once [`TaskQueue::done`] has been called, or a step reported
    /// [`StepOutcome::Terminated`]. Idempotent terminal: a queue that is
    /// already terminated ignores further drive attempts, the async
    /// equivalent of "any further callback from a backend client is
    /// ignored" (`spec.md` §4.2).
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Mark the action terminated. Safe to call more than once.
    pub fn done(&mut self) {
        self.terminated = true;
    }

    /// Run the queue from step 0, advancing the cursor forward on every
    /// `StepOutcome::Next` until a step reports `Terminated` or the cursor
    /// runs past the end of the list (which `spec.md` §4.2 calls
    /// undefined -- we log and terminate defensively rather than panic,
    /// since a verb implementation bug should not take the process down).
    pub async fn run(&mut self, state: &mut S) {
        self.started = true;
        self.cursor = 0;
        loop {
            if self.terminated {
                return;
            }
            let Some(&(name, step)) = self.steps.get(self.cursor) else {
                tracing::error!(
                    cursor = self.cursor,
                    "action task queue ran past its last step without terminating"
                );
                self.terminated = true;
                return;
            };
            tracing::trace!(step = name, "entering step");
            match step(state).await {
                StepOutcome::Next => {
                    tracing::trace!(step = name, "exiting step");
                    self.cursor += 1;
                }
                StepOutcome::Terminated => {
                    tracing::trace!(step = name, "exiting step (terminal)");
                    self.terminated = true;
                    return;
                }
            }
        }
    }
}

impl<S> Default for TaskQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        hits: Vec<&'static str>,
    }

    fn step_a<'a>(state: &'a mut Counter) -> StepFuture<'a> {
        Box::pin(async move {
            state.hits.push("a");
            StepOutcome::Next
        })
    }

    fn step_b<'a>(state: &'a mut Counter) -> StepFuture<'a> {
        Box::pin(async move {
            state.hits.push("b");
            StepOutcome::Terminated
        })
    }

    fn step_c<'a>(state: &'a mut Counter) -> StepFuture<'a> {
        Box::pin(async move {
            state.hits.push("c");
            StepOutcome::Next
        })
    }

    #[tokio::test]
    async fn stops_advancing_once_terminated() {
        let mut queue = TaskQueue::new();
        queue.enqueue("a", step_a);
        queue.enqueue("b", step_b);
        queue.enqueue("c", step_c);

        let mut state = Counter { hits: Vec::new() };
        queue.run(&mut state).await;

        assert_eq!(state.hits, vec!["a", "b"]);
        assert!(queue.is_terminated());
    }

    #[tokio::test]
    #[should_panic(expected = "cannot enqueue steps after the action starts")]
    async fn enqueue_after_start_panics() {
        let mut queue = TaskQueue::new();
        queue.enqueue("a", step_a);
        let mut state = Counter { hits: Vec::new() };
        queue.run(&mut state).await;
        queue.enqueue("c", step_c);
    }
}
