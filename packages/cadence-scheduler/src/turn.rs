use crate::error::SchedulerError;
use crate::roster::{Actor, ActorId, ActorRoster, TurnContext};
use crate::runner::TaskRunner;
use crate::task::{Coroutine, FrameInfo, TaskId};

/// An actor action started by [`TurnController::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub actor: ActorId,
    pub task: TaskId,
    pub round: u64,
}

/// Turn and round bookkeeping layered over a [`TaskRunner`] and an
/// [`ActorRoster`].
///
/// Each tick admits at most one actor action, submitted as a gating task,
/// and only once every earlier gating task has retired. The round counter
/// advances when an admission attempt finds the roster fully cycled.
pub struct TurnController {
    runner: TaskRunner,
    roster: ActorRoster,
    round: u64,
    // Lowest id among active gating tasks as of the last pass, or the next
    // id to assign when none are active.
    frontier: TaskId,
    // The last admission attempt walked a whole round and nobody acted.
    swept_idle: bool,
}

impl Default for TurnController {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnController {
    pub fn new() -> Self {
        let runner = TaskRunner::new();
        let frontier = runner.next_id();
        Self {
            runner,
            roster: ActorRoster::new(),
            round: 0,
            frontier,
            swept_idle: false,
        }
    }

    pub fn add(&mut self, order: i32, actor: impl Actor + 'static) -> ActorId {
        self.roster.add(order, actor)
    }

    pub fn remove(&mut self, id: ActorId) -> Result<(), SchedulerError> {
        self.roster.remove(id)
    }

    /// Submit a task outside of any actor turn.
    ///
    /// A gating task holds back further admissions until it completes.
    pub fn start(&mut self, coroutine: impl Coroutine + 'static, gating: bool) -> TaskId {
        let settled = self.frontier >= self.runner.next_id();
        let id = self.runner.submit(Box::new(coroutine), gating);
        if settled && !gating {
            self.frontier = self.runner.next_id();
        }
        id
    }

    /// Admit at most one actor action, then resume and compact the runner.
    pub fn tick(&mut self, frame: FrameInfo) -> Option<Admission> {
        let admission = self.admit();

        let frontier = self.runner.resume_and_compact(TaskId::MAX, frame);
        self.frontier = if frontier == TaskId::MAX {
            self.runner.next_id()
        } else {
            frontier
        };
        admission
    }

    fn admit(&mut self) -> Option<Admission> {
        self.swept_idle = false;
        if self.roster.is_empty() || self.frontier < self.runner.next_id() {
            return None;
        }

        if self.roster.round_exhausted() {
            self.round += 1;
            self.roster.rewind();
            tracing::info!(round = self.round, actors = self.roster.len(), "round started");
        }

        let threshold = self.runner.oldest_id().unwrap_or(self.runner.next_id());
        let start = self.roster.cursor();

        while let Some(id) = self.roster.at_cursor() {
            let prev = self.roster.prev_action(id).unwrap_or(TaskId::NONE);
            if prev >= threshold {
                tracing::trace!(actor = ?id, %prev, %threshold, "previous action not yet aged out");
                return None;
            }

            // Advance first so roster edits made during the turn see the
            // acting actor as already offered.
            self.roster.advance();
            let Some(mut actor) = self.roster.take_actor(id) else {
                continue;
            };
            let action = {
                let mut cx = TurnContext {
                    actor: id,
                    round: self.round,
                    roster: &mut self.roster,
                };
                actor.take_turn(self.round, &mut cx)
            };
            self.roster.restore_actor(id, actor);

            if let Some(coroutine) = action {
                let task = self.runner.submit(coroutine, true);
                self.roster.set_prev_action(id, task);
                tracing::debug!(actor = ?id, %task, round = self.round, "turn admitted");
                return Some(Admission {
                    actor: id,
                    task,
                    round: self.round,
                });
            }
        }
        self.swept_idle = start == 0;
        None
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn frontier(&self) -> TaskId {
        self.frontier
    }

    pub fn cursor(&self) -> usize {
        self.roster.cursor()
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    pub fn roster(&self) -> &ActorRoster {
        &self.roster
    }

    pub fn gating_in_flight(&self) -> usize {
        self.runner.gating_count()
    }

    /// No task of any kind is queued.
    pub fn is_settled(&self) -> bool {
        self.runner.is_empty()
    }

    /// The roster is empty, or the last tick offered a turn to every actor
    /// from the start of a round and all of them passed.
    pub fn is_roster_idle(&self) -> bool {
        self.roster.is_empty() || self.swept_idle
    }
}
