use crate::clock::{ClockConfig, ConfigError, FrameClock};
use cadence_devtools::{AdmissionRecord, DevToolsContext, SchedulerMetrics};
use cadence_scheduler::{Admission, FrameInfo, FreeScheduler, TurnController};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("schedulers still busy after {frames} frames ({turn_tasks} turn tasks, {free_tasks} free tasks)")]
    Stalled {
        frames: u64,
        turn_tasks: usize,
        free_tasks: usize,
    },
}

#[derive(Default, Debug, Clone)]
pub struct Profiling {
    pub frames: u64,
    pub admissions: u64,
    pub turn_tasks_completed: u64,
    pub free_tasks_completed: u64,
    pub peak_turn_tasks: usize,
    pub peak_free_tasks: usize,
}

impl Profiling {
    pub fn tasks_completed(&self) -> u64 {
        self.turn_tasks_completed + self.free_tasks_completed
    }
}

/// Host-loop side of the schedulers.
///
/// Owns the frame clock and the turn controller, and shares the free
/// scheduler so gameplay code and turn-runner coroutines can start effects
/// on it. Coroutines running *on* the free scheduler spawn and await through
/// their `TaskContext`; the shared handle is borrowed while they run.
pub struct Runtime {
    clock: FrameClock,
    turns: TurnController,
    effects: Rc<RefCell<FreeScheduler>>,
    profiling: Profiling,
    last_admission: Option<Admission>,
    devtools: Option<Arc<DevToolsContext>>,
}

impl Runtime {
    pub fn new(config: ClockConfig) -> Result<Self, RuntimeError> {
        Ok(Self {
            clock: FrameClock::new(config)?,
            turns: TurnController::new(),
            effects: Rc::new(RefCell::new(FreeScheduler::new())),
            profiling: Profiling::default(),
            last_admission: None,
            devtools: None,
        })
    }

    pub fn with_devtools(mut self, devtools: Arc<DevToolsContext>) -> Self {
        self.devtools = Some(devtools);
        self
    }

    /// Advance the clock, then drive the turn controller and the free
    /// scheduler once each, in that order.
    pub fn tick(&mut self, real_delta: f64) -> FrameInfo {
        let frame = self.clock.advance(real_delta);

        self.last_admission = self.turns.tick(frame);
        let turn_done = self.turns.runner().completed().len();

        let (free_done, free_len) = {
            let mut effects = self.effects.borrow_mut();
            effects.tick(frame);
            (effects.runner().completed().len(), effects.len())
        };

        let profiling = &mut self.profiling;
        profiling.frames += 1;
        profiling.turn_tasks_completed += turn_done as u64;
        profiling.free_tasks_completed += free_done as u64;
        profiling.peak_turn_tasks = profiling.peak_turn_tasks.max(self.turns.runner().len());
        profiling.peak_free_tasks = profiling.peak_free_tasks.max(free_len);

        if let Some(admission) = self.last_admission {
            profiling.admissions += 1;
            tracing::debug!(
                frame = frame.frame,
                round = admission.round,
                task = %admission.task,
                "actor turn started"
            );
        }

        if self.devtools.is_some() {
            self.publish(frame);
        }
        frame
    }

    /// Tick until neither scheduler has queued work and the last tick offered
    /// every actor a turn without any of them acting.
    ///
    /// Returns the number of frames run. Exceeding `max_frames` means some
    /// coroutine never completes, which is a bug in the caller.
    pub fn run_until_settled(&mut self, real_delta: f64, max_frames: u64) -> Result<u64, RuntimeError> {
        for frames in 1..=max_frames {
            self.tick(real_delta);
            if self.last_admission.is_none() && self.is_settled() {
                return Ok(frames);
            }
        }

        let turn_tasks = self.turns.runner().len();
        let free_tasks = self.effects.borrow().len();
        tracing::warn!(max_frames, turn_tasks, free_tasks, "schedulers did not settle");
        Err(RuntimeError::Stalled {
            frames: max_frames,
            turn_tasks,
            free_tasks,
        })
    }

    /// Both schedulers are empty and the roster has nothing left to do.
    pub fn is_settled(&self) -> bool {
        self.turns.is_settled() && self.turns.is_roster_idle() && self.effects.borrow().is_idle()
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        let effects = self.effects.borrow();
        let info = self.clock.info();
        SchedulerMetrics {
            frame: info.frame,
            time: info.time,
            round: self.turns.round(),
            cursor: self.turns.cursor(),
            actors: self.turns.roster().len(),
            turn_tasks: self.turns.runner().len(),
            gating_in_flight: self.turns.gating_in_flight(),
            free_tasks: effects.len(),
            pending_waiters: effects.pending_waiters(),
            frontier: self.turns.frontier().get(),
            tasks_completed: self.profiling.tasks_completed(),
            admissions: self.profiling.admissions,
        }
    }

    fn publish(&self, frame: FrameInfo) {
        let Some(devtools) = &self.devtools else {
            return;
        };
        if let Some(admission) = self.last_admission {
            devtools.record_admission(AdmissionRecord {
                frame: frame.frame,
                round: admission.round,
                task: admission.task.get(),
                actor: format!("{:?}", admission.actor),
            });
        }
        devtools.record_tick(self.metrics());
    }

    pub fn turns(&self) -> &TurnController {
        &self.turns
    }

    pub fn turns_mut(&mut self) -> &mut TurnController {
        &mut self.turns
    }

    /// Shared handle to the free scheduler.
    pub fn effects(&self) -> Rc<RefCell<FreeScheduler>> {
        self.effects.clone()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn profiling(&self) -> &Profiling {
        &self.profiling
    }

    /// What the most recent tick admitted, if anything.
    pub fn last_admission(&self) -> Option<Admission> {
        self.last_admission
    }
}
