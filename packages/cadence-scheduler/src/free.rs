use crate::handle::AwaitHandle;
use crate::runner::TaskRunner;
use crate::task::{Coroutine, FrameInfo, TaskId};

/// Scheduler for tasks that never block turn progression.
///
/// Cosmetic choreography runs here, along with anything that needs a
/// "wait until task X is done" rendezvous without touching turn logic.
/// Coroutines already running here wait on each other through
/// [`TaskContext::await_task`](crate::TaskContext::await_task).
#[derive(Default)]
pub struct FreeScheduler {
    runner: TaskRunner,
}

impl FreeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, coroutine: impl Coroutine + 'static) -> TaskId {
        self.runner.submit(Box::new(coroutine), false)
    }

    /// Handle fulfilled right after the pass in which task `id` finishes.
    ///
    /// Unknown or already-finished ids resolve immediately.
    pub fn await_completion(&mut self, id: TaskId) -> AwaitHandle {
        self.runner.await_completion(id)
    }

    /// Run one resume/compact pass; handles of every task that finished in
    /// it are fulfilled before this returns.
    pub fn tick(&mut self, frame: FrameInfo) {
        self.runner.resume_and_compact(TaskId::MAX, frame);
    }

    pub fn is_running(&self, id: TaskId) -> bool {
        self.runner.contains(id)
    }

    pub fn len(&self) -> usize {
        self.runner.len()
    }

    pub fn is_idle(&self) -> bool {
        self.runner.is_empty()
    }

    /// Number of unfulfilled handles.
    pub fn pending_waiters(&self) -> usize {
        self.runner.pending_waiters()
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }
}
