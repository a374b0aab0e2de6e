//! Cooperative, tick-driven scheduling for turn-based play.
//!
//! Two schedulers share one primitive, the [`TaskRunner`]:
//!
//! - [`TurnController`] offers turns to an [`ActorRoster`] round-robin and
//!   lets at most one gating action be in flight at a time.
//! - [`FreeScheduler`] runs cosmetic work with no turn concept and supports
//!   waiting on another task's completion by id.
//!
//! Everything here is single-threaded. The host loop calls each scheduler's
//! `tick` once per frame.

pub mod error;
pub mod free;
pub mod handle;
pub mod roster;
pub mod runner;
pub mod task;
pub mod turn;

pub use error::SchedulerError;
pub use free::FreeScheduler;
pub use handle::AwaitHandle;
pub use roster::{Actor, ActorFn, ActorId, ActorRoster, TurnContext, actor_fn};
pub use runner::TaskRunner;
pub use task::{Coroutine, FrameInfo, FromFn, Outcome, Signal, Step, TaskContext, TaskId, from_fn};
pub use turn::{Admission, TurnController};
