use crate::handle::AwaitHandle;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Identity of a submitted task.
///
/// Ids are handed out by a [`TaskRunner`](crate::TaskRunner) in strictly
/// increasing order, so comparing two ids also compares submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Reserved; never assigned to a task. Actors that have not acted yet report it.
    pub const NONE: TaskId = TaskId(0);
    pub const FIRST: TaskId = TaskId(1);
    /// Uncapped frontier.
    pub const MAX: TaskId = TaskId(u64::MAX);

    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> TaskId {
        TaskId(self.0 + 1)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Clock values for the frame being processed.
///
/// The host loop advances these once per tick; coroutines read them to
/// compute animation progress.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameInfo {
    /// Seconds since the clock started.
    pub time: f64,
    /// Seconds elapsed since the previous frame.
    pub delta: f64,
    pub frame: u64,
}

/// Why a task suspended, and therefore when it may be resumed again.
#[derive(Debug, Clone)]
pub enum Signal {
    /// Resume on the next tick.
    NextFrame,
    /// Resume once no other surviving task is ahead of this one.
    QueueEnd,
    /// Resume once every gating task submitted before this one has retired.
    TurnStart,
    /// Resume once the handle is fulfilled.
    Await(AwaitHandle),
}

/// Caller-defined result carried by a completing coroutine.
pub type Outcome = Rc<dyn Any>;

/// What a coroutine reports each time it is resumed.
pub enum Step {
    Yield(Signal),
    Complete(Option<Outcome>),
}

impl Step {
    pub fn next_frame() -> Self {
        Step::Yield(Signal::NextFrame)
    }

    pub fn queue_end() -> Self {
        Step::Yield(Signal::QueueEnd)
    }

    pub fn turn_start() -> Self {
        Step::Yield(Signal::TurnStart)
    }

    pub fn wait(handle: AwaitHandle) -> Self {
        Step::Yield(Signal::Await(handle))
    }

    pub fn done() -> Self {
        Step::Complete(None)
    }

    pub fn done_with<T: 'static>(value: T) -> Self {
        Step::Complete(Some(Rc::new(value)))
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Step::Complete(_))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Yield(signal) => f.debug_tuple("Yield").field(signal).finish(),
            Step::Complete(outcome) => f
                .debug_tuple("Complete")
                .field(&outcome.is_some())
                .finish(),
        }
    }
}

/// A resumable unit of work.
///
/// Each call to `resume` runs synchronously up to the next suspension point
/// and reports either a [`Signal`] or completion. A coroutine is never
/// resumed again after it returns [`Step::Complete`].
pub trait Coroutine {
    fn resume(&mut self, cx: &mut TaskContext<'_>) -> Step;
}

/// Wraps a closure as a coroutine.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(&mut TaskContext<'_>) -> Step,
{
    FromFn(f)
}

pub struct FromFn<F>(F);

impl<F> Coroutine for FromFn<F>
where
    F: FnMut(&mut TaskContext<'_>) -> Step,
{
    fn resume(&mut self, cx: &mut TaskContext<'_>) -> Step {
        (self.0)(cx)
    }
}

/// Per-resume view of the runner a coroutine is executing on.
pub struct TaskContext<'a> {
    pub(crate) id: TaskId,
    pub(crate) frame: FrameInfo,
    pub(crate) next_id: &'a mut TaskId,
    pub(crate) spawned: &'a mut Vec<Task>,
    pub(crate) requested: &'a mut Vec<AwaitHandle>,
}

impl TaskContext<'_> {
    /// Id of the task being resumed.
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn frame(&self) -> FrameInfo {
        self.frame
    }

    /// Submit a non-gating sub-task to the same runner.
    ///
    /// The sub-task is appended behind every existing task and gets its
    /// first resume later in the current pass.
    pub fn spawn(&mut self, coroutine: impl Coroutine + 'static) -> TaskId {
        self.push(Box::new(coroutine), false)
    }

    /// Submit a gating sub-task to the same runner.
    pub fn spawn_gating(&mut self, coroutine: impl Coroutine + 'static) -> TaskId {
        self.push(Box::new(coroutine), true)
    }

    /// Handle fulfilled once task `id` on this runner has completed.
    ///
    /// The handle is registered when the current pass ends. If `id` is no
    /// longer queued by then it resolves at that point; otherwise it is
    /// fulfilled at the end of the pass that retires the task. Either way a
    /// coroutine parked on it resumes on a later tick.
    pub fn await_task(&mut self, id: TaskId) -> AwaitHandle {
        let handle = AwaitHandle::pending(id);
        self.requested.push(handle.clone());
        handle
    }

    fn push(&mut self, coroutine: Box<dyn Coroutine>, gating: bool) -> TaskId {
        let id = *self.next_id;
        *self.next_id = id.next();
        tracing::trace!(parent = %self.id, task = %id, gating, "spawned sub-task");
        self.spawned.push(Task::new(id, coroutine, gating));
        id
    }
}

/// A submitted coroutine together with its scheduling state.
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) gating: bool,
    pub(crate) last_signal: Option<Signal>,
    pub(crate) coroutine: Box<dyn Coroutine>,
}

impl Task {
    pub(crate) fn new(id: TaskId, coroutine: Box<dyn Coroutine>, gating: bool) -> Self {
        Self {
            id,
            gating,
            last_signal: None,
            coroutine,
        }
    }

    /// Whether the task may be resumed in the current pass.
    ///
    /// `has_survivor_ahead` is true when a task ahead of this one is still
    /// queued; `frontier` is the running minimum over the cap and the gating
    /// tasks already visited.
    pub(crate) fn is_eligible(&self, has_survivor_ahead: bool, frontier: TaskId) -> bool {
        match &self.last_signal {
            None | Some(Signal::NextFrame) => true,
            Some(Signal::QueueEnd) => !has_survivor_ahead,
            Some(Signal::TurnStart) => frontier >= self.id,
            Some(Signal::Await(handle)) => handle.is_fulfilled(),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("gating", &self.gating)
            .field("last_signal", &self.last_signal)
            .finish_non_exhaustive()
    }
}
