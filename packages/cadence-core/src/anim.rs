//! Small coroutines that gameplay and effects code compose into
//! frame-spanning sequences.

use cadence_scheduler::{Coroutine, Signal, Step, TaskContext};
use smallvec::SmallVec;

/// Completes after a number of seconds or frames have passed.
pub struct Delay {
    remaining: Remaining,
}

enum Remaining {
    Seconds(f64),
    Frames(u32),
}

impl Delay {
    pub fn seconds(seconds: f64) -> Self {
        Self {
            remaining: Remaining::Seconds(seconds),
        }
    }

    pub fn frames(frames: u32) -> Self {
        Self {
            remaining: Remaining::Frames(frames),
        }
    }
}

impl Coroutine for Delay {
    fn resume(&mut self, cx: &mut TaskContext<'_>) -> Step {
        let elapsed = match &mut self.remaining {
            Remaining::Seconds(left) => {
                *left -= cx.frame().delta;
                *left <= 0.0
            }
            Remaining::Frames(0) => true,
            Remaining::Frames(left) => {
                *left -= 1;
                *left == 0
            }
        };
        if elapsed { Step::done() } else { Step::next_frame() }
    }
}

/// Easing applied to tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    #[default]
    Linear,
    InOutQuad,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Ease::Linear => t,
            Ease::InOutQuad if t < 0.5 => 2.0 * t * t,
            Ease::InOutQuad => 1.0 - (-2.0 * t + 2.0).powi(2) / 2.0,
        }
    }
}

/// Drives a progress callback from 0 to 1 over `duration` seconds of frame time.
///
/// The first resume reports progress 0; the final one reports exactly 1.
pub struct Tween<F> {
    duration: f64,
    elapsed: f64,
    ease: Ease,
    started: bool,
    on_progress: F,
}

impl<F: FnMut(f32)> Tween<F> {
    pub fn new(duration: f64, on_progress: F) -> Self {
        Self {
            duration,
            elapsed: 0.0,
            ease: Ease::Linear,
            started: false,
            on_progress,
        }
    }

    pub fn eased(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }
}

impl<F: FnMut(f32)> Coroutine for Tween<F> {
    fn resume(&mut self, cx: &mut TaskContext<'_>) -> Step {
        if self.started {
            self.elapsed += cx.frame().delta;
        }
        self.started = true;

        let t = if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0) as f32
        };
        (self.on_progress)(self.ease.apply(t));

        if t >= 1.0 { Step::done() } else { Step::next_frame() }
    }
}

/// Runs coroutines one after another as a single task.
///
/// Signals from the running stage are forwarded unchanged, so a stage that
/// waits on a handle parks the whole sequence. When a stage completes the
/// next one starts in the same resume.
#[derive(Default)]
pub struct Sequence {
    stages: SmallVec<[Box<dyn Coroutine>; 4]>,
    current: usize,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, stage: impl Coroutine + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Coroutine for Sequence {
    fn resume(&mut self, cx: &mut TaskContext<'_>) -> Step {
        while let Some(stage) = self.stages.get_mut(self.current) {
            match stage.resume(cx) {
                Step::Yield(signal) => return Step::Yield(signal),
                Step::Complete(outcome) => {
                    self.current += 1;
                    if self.current == self.stages.len() {
                        return Step::Complete(outcome);
                    }
                }
            }
        }
        Step::done()
    }
}

/// Yields `signal` once, then completes.
pub fn suspend_once(signal: Signal) -> impl Coroutine {
    let mut signal = Some(signal);
    cadence_scheduler::from_fn(move |_| match signal.take() {
        Some(signal) => Step::Yield(signal),
        None => Step::done(),
    })
}
