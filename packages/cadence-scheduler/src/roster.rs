use crate::error::SchedulerError;
use crate::task::{Coroutine, TaskId};
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    pub struct ActorId;
}

/// An entity that takes turns.
pub trait Actor {
    /// Produce this round's action, or `None` to pass.
    fn take_turn(&mut self, round: u64, cx: &mut TurnContext<'_>) -> Option<Box<dyn Coroutine>>;
}

/// Wraps a closure as an actor.
pub fn actor_fn<F>(f: F) -> ActorFn<F>
where
    F: FnMut(u64, &mut TurnContext<'_>) -> Option<Box<dyn Coroutine>>,
{
    ActorFn(f)
}

pub struct ActorFn<F>(F);

impl<F> Actor for ActorFn<F>
where
    F: FnMut(u64, &mut TurnContext<'_>) -> Option<Box<dyn Coroutine>>,
{
    fn take_turn(&mut self, round: u64, cx: &mut TurnContext<'_>) -> Option<Box<dyn Coroutine>> {
        (self.0)(round, cx)
    }
}

/// Handed to an actor while it takes its turn.
///
/// The roster may be edited from here, including removing the acting actor.
pub struct TurnContext<'a> {
    pub(crate) actor: ActorId,
    pub(crate) round: u64,
    pub(crate) roster: &'a mut ActorRoster,
}

impl TurnContext<'_> {
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn add(&mut self, order: i32, actor: impl Actor + 'static) -> ActorId {
        self.roster.add(order, actor)
    }

    pub fn remove(&mut self, id: ActorId) -> Result<(), SchedulerError> {
        self.roster.remove(id)
    }

    pub fn roster(&self) -> &ActorRoster {
        self.roster
    }
}

struct ActorSlot {
    order: i32,
    prev_action: TaskId,
    // Taken out while the actor is running its own turn.
    actor: Option<Box<dyn Actor>>,
}

/// Actors sorted by ascending `order`, plus the round-robin cursor.
///
/// The cursor always indexes the next actor to be offered a turn in the
/// current round; `cursor == len()` means the round is exhausted.
#[derive(Default)]
pub struct ActorRoster {
    slots: SlotMap<ActorId, ActorSlot>,
    sequence: Vec<ActorId>,
    cursor: usize,
}

impl ActorRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every actor with an order `<=` the new one.
    pub fn add(&mut self, order: i32, actor: impl Actor + 'static) -> ActorId {
        let id = self.slots.insert(ActorSlot {
            order,
            prev_action: TaskId::NONE,
            actor: Some(Box::new(actor)),
        });
        let slots = &self.slots;
        let index = self
            .sequence
            .partition_point(|other| slots[*other].order <= order);
        self.sequence.insert(index, id);
        if index < self.cursor {
            self.cursor += 1;
        }
        tracing::debug!(?id, order, index, cursor = self.cursor, "actor added");
        id
    }

    pub fn remove(&mut self, id: ActorId) -> Result<(), SchedulerError> {
        let Some(index) = self.sequence.iter().position(|other| *other == id) else {
            tracing::warn!(?id, "remove of unknown actor");
            return Err(SchedulerError::UnknownActor(id));
        };
        self.sequence.remove(index);
        self.slots.remove(id);
        if index < self.cursor {
            self.cursor -= 1;
        }
        tracing::debug!(?id, index, cursor = self.cursor, "actor removed");
        Ok(())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.slots.contains_key(id)
    }

    /// Actor ids in turn order.
    pub fn ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.sequence.iter().copied()
    }

    pub fn order_of(&self, id: ActorId) -> Option<i32> {
        self.slots.get(id).map(|slot| slot.order)
    }

    /// Id of the last task this actor started; `TaskId::NONE` before its first action.
    pub fn prev_action(&self, id: ActorId) -> Option<TaskId> {
        self.slots.get(id).map(|slot| slot.prev_action)
    }

    pub(crate) fn at_cursor(&self) -> Option<ActorId> {
        self.sequence.get(self.cursor).copied()
    }

    pub(crate) fn round_exhausted(&self) -> bool {
        self.cursor >= self.sequence.len()
    }

    pub(crate) fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }

    pub(crate) fn take_actor(&mut self, id: ActorId) -> Option<Box<dyn Actor>> {
        self.slots.get_mut(id).and_then(|slot| slot.actor.take())
    }

    /// Puts an actor back after its turn; dropped if it was removed meanwhile.
    pub(crate) fn restore_actor(&mut self, id: ActorId, actor: Box<dyn Actor>) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.actor = Some(actor);
        }
    }

    pub(crate) fn set_prev_action(&mut self, id: ActorId, task: TaskId) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.prev_action = task;
        }
    }
}
