//! Demo actors for `cadence simulate`.

use cadence_core::{Delay, Ease, Sequence, Tween, from_fn};
use cadence_scheduler::{Actor, Coroutine, FreeScheduler, Step, TurnContext};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Counters shared by every skirmisher.
#[derive(Default, Debug)]
pub struct Tally {
    pub missiles: Cell<u64>,
    pub explosions: Cell<u64>,
}

fn bump(cell: &Cell<u64>) {
    cell.set(cell.get() + 1);
}

/// Walks one unit forward, fires a missile, and hands the turn on once the
/// missile lands. Explosions play out on the free scheduler and never hold
/// up the next turn.
pub struct Skirmisher {
    name: String,
    position: Rc<Cell<f32>>,
    effects: Rc<RefCell<FreeScheduler>>,
    tally: Rc<Tally>,
}

impl Skirmisher {
    pub fn new(name: String, effects: Rc<RefCell<FreeScheduler>>, tally: Rc<Tally>) -> Self {
        Self {
            name,
            position: Rc::new(Cell::new(0.0)),
            effects,
            tally,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared so the summary can read it after the actor moved into the roster.
    pub fn position(&self) -> Rc<Cell<f32>> {
        self.position.clone()
    }

    fn walk(&self) -> impl Coroutine + 'static {
        let position = self.position.clone();
        let from = position.get();
        Tween::new(0.25, move |t| position.set(from + t)).eased(Ease::InOutQuad)
    }

    fn missile(&self) -> Sequence {
        let name = self.name.clone();
        let effects = self.effects.clone();
        let tally = self.tally.clone();
        let land = from_fn(move |cx| {
            tracing::debug!(actor = %name, frame = cx.frame().frame, "missile landed");
            effects.borrow_mut().start(explosion(tally.clone()));
            Step::done()
        });
        Sequence::new().then(Delay::seconds(0.2)).then(land)
    }
}

fn explosion(tally: Rc<Tally>) -> Sequence {
    Sequence::new()
        .then(Tween::new(0.15, |_| {}))
        .then(Delay::frames(6))
        .then(from_fn(move |_| {
            bump(&tally.explosions);
            Step::done()
        }))
}

impl Actor for Skirmisher {
    fn take_turn(&mut self, round: u64, _cx: &mut TurnContext<'_>) -> Option<Box<dyn Coroutine>> {
        tracing::debug!(actor = %self.name, round, "taking turn");

        let mut missile = Some(self.missile());
        let tally = self.tally.clone();
        let fire = from_fn(move |cx| {
            if let Some(missile) = missile.take() {
                bump(&tally.missiles);
                cx.spawn_gating(missile);
            }
            Step::done()
        });
        Some(Box::new(Sequence::new().then(self.walk()).then(fire)))
    }
}
