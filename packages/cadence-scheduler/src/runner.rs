use crate::handle::AwaitHandle;
use crate::task::{Coroutine, FrameInfo, Outcome, Step, Task, TaskContext, TaskId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Ordered collection of tasks, resumed and compacted once per tick.
///
/// Both the turn controller and the free scheduler drive one of these. The
/// runner itself knows nothing about turns; it only reports the lowest id
/// among its still-active gating tasks.
///
/// Completion handles for its tasks are fulfilled at the end of the pass
/// that retires them.
pub struct TaskRunner {
    tasks: Vec<Task>,
    // Sub-tasks spawned by the coroutine currently being resumed.
    spawned: Vec<Task>,
    // Handles requested from inside the pass, registered once it ends.
    requested: Vec<AwaitHandle>,
    waiters: FxHashMap<TaskId, SmallVec<[AwaitHandle; 2]>>,
    completed: Vec<(TaskId, Option<Outcome>)>,
    next_id: TaskId,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            spawned: Vec::new(),
            requested: Vec::new(),
            waiters: FxHashMap::default(),
            completed: Vec::new(),
            next_id: TaskId::FIRST,
        }
    }

    pub fn submit(&mut self, coroutine: Box<dyn Coroutine>, gating: bool) -> TaskId {
        let id = self.next_id;
        self.next_id = id.next();
        self.tasks.push(Task::new(id, coroutine, gating));
        tracing::trace!(task = %id, gating, "submitted");
        id
    }

    /// Resume every eligible task once, in submission order, and drop the
    /// ones that finished.
    ///
    /// Returns the lowest id among gating tasks still queued after the pass,
    /// or `cap` when none remain (or all are above it). Handles waiting on
    /// the retired tasks are fulfilled before this returns.
    pub fn resume_and_compact(&mut self, cap: TaskId, frame: FrameInfo) -> TaskId {
        self.completed.clear();

        let mut frontier = cap;
        let mut write = 0;
        let mut read = 0;

        // Length is re-read each iteration: spawned sub-tasks are appended
        // during the pass and visited before it ends.
        while read < self.tasks.len() {
            let task = &mut self.tasks[read];
            let id = task.id;
            let mut outcome = None;

            if task.is_eligible(write > 0, frontier) {
                let mut cx = TaskContext {
                    id,
                    frame,
                    next_id: &mut self.next_id,
                    spawned: &mut self.spawned,
                    requested: &mut self.requested,
                };
                match task.coroutine.resume(&mut cx) {
                    Step::Yield(signal) => {
                        tracing::trace!(task = %id, ?signal, "suspended");
                        task.last_signal = Some(signal);
                    }
                    Step::Complete(result) => outcome = Some(result),
                }
            }
            let gating = task.gating;

            if !self.spawned.is_empty() {
                self.tasks.append(&mut self.spawned);
            }

            match outcome {
                Some(result) => {
                    tracing::trace!(task = %id, "completed");
                    self.completed.push((id, result));
                }
                None => {
                    if gating {
                        frontier = frontier.min(id);
                    }
                    if write != read {
                        self.tasks.swap(write, read);
                    }
                    write += 1;
                }
            }
            read += 1;
        }

        // Finished tasks have all been swapped behind `write`.
        self.tasks.truncate(write);

        if !self.completed.is_empty() {
            tracing::debug!(
                retired = self.completed.len(),
                remaining = self.tasks.len(),
                "compacted"
            );
        }
        self.dispatch_completions();
        frontier
    }

    /// Handle fulfilled right after the pass in which task `id` finishes.
    ///
    /// Unknown or already-finished ids resolve immediately.
    pub fn await_completion(&mut self, id: TaskId) -> AwaitHandle {
        if !self.contains(id) {
            tracing::trace!(task = %id, "await on retired task resolves immediately");
            return AwaitHandle::resolved(id);
        }
        let handle = AwaitHandle::pending(id);
        self.waiters.entry(id).or_default().push(handle.clone());
        handle
    }

    fn dispatch_completions(&mut self) {
        for handle in self.requested.drain(..) {
            let id = handle.target();
            let live = self.tasks.binary_search_by_key(&id, |task| task.id).is_ok()
                || self.completed.iter().any(|(done, _)| *done == id);
            if live {
                self.waiters.entry(id).or_default().push(handle);
            } else {
                tracing::trace!(task = %id, "await on retired task resolves immediately");
                handle.fulfill(None);
            }
        }

        if self.waiters.is_empty() {
            return;
        }
        for (id, outcome) in &self.completed {
            if let Some(handles) = self.waiters.remove(id) {
                tracing::debug!(task = %id, waiters = handles.len(), "fulfilling await handles");
                for handle in handles {
                    handle.fulfill(outcome.clone());
                }
            }
        }
    }

    /// Number of unfulfilled handles.
    pub fn pending_waiters(&self) -> usize {
        self.waiters.values().map(|handles| handles.len()).sum()
    }

    /// Id the next submission will receive.
    pub fn next_id(&self) -> TaskId {
        self.next_id
    }

    /// Id of the oldest task still queued.
    pub fn oldest_id(&self) -> Option<TaskId> {
        self.tasks.first().map(|task| task.id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        // Collection order is id order.
        self.tasks.binary_search_by_key(&id, |task| task.id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn gating_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.gating).count()
    }

    /// Tasks retired by the last pass, in the order they finished.
    pub fn completed(&self) -> &[(TaskId, Option<Outcome>)] {
        &self.completed
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks.iter().map(|task| task.id)
    }
}
