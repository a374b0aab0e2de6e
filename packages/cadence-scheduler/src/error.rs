use crate::roster::ActorId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("actor {0:?} is not in the roster")]
    UnknownActor(ActorId),
}
