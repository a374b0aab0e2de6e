pub mod anim;
pub mod clock;
pub mod runtime;

pub use anim::{Delay, Ease, Sequence, Tween, suspend_once};
pub use cadence_scheduler::from_fn;
pub use clock::{ClockConfig, ConfigError, FrameClock};
pub use runtime::{Profiling, Runtime, RuntimeError};
