use crate::task::{Outcome, TaskId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Default)]
struct AwaitState {
    fulfilled: bool,
    outcome: Option<Outcome>,
}

/// Completion handle for a task on a [`FreeScheduler`](crate::FreeScheduler).
///
/// Clones share the same state. A handle is fulfilled at most once; later
/// fulfil attempts are ignored.
#[derive(Clone)]
pub struct AwaitHandle {
    target: TaskId,
    state: Rc<RefCell<AwaitState>>,
}

impl AwaitHandle {
    pub(crate) fn pending(target: TaskId) -> Self {
        Self {
            target,
            state: Rc::new(RefCell::new(AwaitState::default())),
        }
    }

    pub(crate) fn resolved(target: TaskId) -> Self {
        let handle = Self::pending(target);
        handle.fulfill(None);
        handle
    }

    /// Returns false if the handle had already been fulfilled.
    pub(crate) fn fulfill(&self, outcome: Option<Outcome>) -> bool {
        let mut state = self.state.borrow_mut();
        if state.fulfilled {
            return false;
        }
        state.fulfilled = true;
        state.outcome = outcome;
        true
    }

    /// Id of the task this handle waits on.
    pub fn target(&self) -> TaskId {
        self.target
    }

    pub fn is_fulfilled(&self) -> bool {
        self.state.borrow().fulfilled
    }

    /// The value the awaited task completed with, if it carried one of type `T`.
    pub fn outcome<T: 'static>(&self) -> Option<Rc<T>> {
        let outcome = self.state.borrow().outcome.clone()?;
        outcome.downcast::<T>().ok()
    }
}

impl fmt::Debug for AwaitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaitHandle")
            .field("target", &self.target)
            .field("fulfilled", &self.is_fulfilled())
            .finish()
    }
}
