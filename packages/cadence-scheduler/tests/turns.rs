use cadence_scheduler::{
    Actor, ActorId, Admission, Coroutine, FrameInfo, Step, TaskId, TurnContext, TurnController,
    actor_fn, from_fn,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Offers an action every turn; the action completes on its `steps`-th resume.
struct Walker {
    name: &'static str,
    steps: u32,
    log: Rc<RefCell<Vec<(&'static str, u64)>>>,
}

impl Walker {
    fn new(name: &'static str, steps: u32, log: &Rc<RefCell<Vec<(&'static str, u64)>>>) -> Self {
        Self {
            name,
            steps,
            log: log.clone(),
        }
    }
}

impl Actor for Walker {
    fn take_turn(&mut self, round: u64, _cx: &mut TurnContext<'_>) -> Option<Box<dyn Coroutine>> {
        self.log.borrow_mut().push((self.name, round));
        let mut remaining = self.steps;
        Some(Box::new(from_fn(move |_| {
            remaining -= 1;
            if remaining == 0 { Step::done() } else { Step::next_frame() }
        })))
    }
}

fn frame(n: u64) -> FrameInfo {
    FrameInfo {
        time: n as f64 / 30.0,
        delta: 1.0 / 30.0,
        frame: n,
    }
}

#[test]
fn test_two_actor_scenario() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    let a = turns.add(0, Walker::new("a", 1, &log));
    let b = turns.add(1, Walker::new("b", 3, &log));

    // Tick 1: A is admitted and its action finishes within the same tick.
    let admitted = turns.tick(frame(1)).expect("a admitted");
    assert_eq!(admitted, Admission { actor: a, task: TaskId(1), round: 0 });
    assert!(turns.is_settled());

    // Tick 2: B is admitted.
    let admitted = turns.tick(frame(2)).expect("b admitted");
    assert_eq!(admitted.actor, b);
    assert_eq!(turns.gating_in_flight(), 1);

    // Ticks 3 and 4 only resume B.
    assert_eq!(turns.tick(frame(3)), None);
    assert_eq!(turns.round(), 0);
    assert_eq!(turns.tick(frame(4)), None);
    assert!(turns.is_settled());
    assert_eq!(turns.round(), 0);
    assert_eq!(turns.cursor(), 2);

    // Tick 5 wraps the cursor and A opens round 1.
    let admitted = turns.tick(frame(5)).expect("a admitted again");
    assert_eq!(admitted.actor, a);
    assert_eq!(admitted.round, 1);
    assert_eq!(turns.round(), 1);

    assert_eq!(*log.borrow(), vec![("a", 0), ("b", 0), ("a", 1)]);
    assert_eq!(turns.roster().prev_action(a), Some(TaskId(3)));
    assert_eq!(turns.roster().prev_action(b), Some(TaskId(2)));
}

#[test]
fn test_round_completes_after_every_actor_acted() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    let names = ["a", "b", "c", "d"];
    for (order, name) in names.into_iter().enumerate() {
        turns.add(order as i32, Walker::new(name, 1, &log));
    }

    for tick in 1..=names.len() as u64 {
        assert!(turns.tick(frame(tick)).is_some());
        assert_eq!(turns.round(), 0);
    }
    assert_eq!(turns.cursor(), names.len());

    let admitted = turns.tick(frame(5)).expect("round 1 opens");
    assert_eq!(turns.round(), 1);
    assert_eq!(admitted.round, 1);
    assert_eq!(turns.cursor(), 1);

    let rounds: Vec<u64> = log.borrow().iter().map(|(_, round)| *round).collect();
    assert_eq!(rounds, vec![0, 0, 0, 0, 1]);
}

#[test]
fn test_at_most_one_gating_action_in_flight() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    for order in 0..3 {
        turns.add(order, Walker::new("w", 4, &log));
    }

    let mut previous = 0;
    let mut admissions = 0;
    for tick in 1..40 {
        if turns.tick(frame(tick)).is_some() {
            admissions += 1;
        }
        let in_flight = turns.gating_in_flight();
        assert!(in_flight <= 1);
        assert!(in_flight <= previous + 1);
        previous = in_flight;
    }
    // Each action occupies four ticks and the next admission follows immediately.
    assert_eq!(admissions, 10);
}

#[test]
fn test_passing_actors_are_skipped_within_the_tick() {
    let offered = Rc::new(Cell::new(0));
    let mut turns = TurnController::new();
    for order in 0..2 {
        let offered = offered.clone();
        turns.add(
            order,
            actor_fn(move |_, _| {
                offered.set(offered.get() + 1);
                None
            }),
        );
    }
    let log = Rc::new(RefCell::new(Vec::new()));
    let acting = turns.add(5, Walker::new("acting", 1, &log));

    let admitted = turns.tick(frame(1)).expect("third actor admitted");
    assert_eq!(admitted.actor, acting);
    assert_eq!(offered.get(), 2);
    assert_eq!(turns.roster().prev_action(acting), Some(TaskId(1)));
}

#[test]
fn test_external_gating_task_blocks_admission() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    turns.add(0, Walker::new("a", 1, &log));

    let resumes = Rc::new(Cell::new(0));
    let missile = {
        let resumes = resumes.clone();
        from_fn(move |_| {
            resumes.set(resumes.get() + 1);
            if resumes.get() == 3 { Step::done() } else { Step::next_frame() }
        })
    };
    turns.start(missile, true);

    assert_eq!(turns.tick(frame(1)), None);
    assert_eq!(turns.tick(frame(2)), None);
    assert_eq!(turns.tick(frame(3)), None);
    assert_eq!(resumes.get(), 3);
    assert!(turns.tick(frame(4)).is_some());
}

#[test]
fn test_non_gating_task_does_not_block_admission() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    turns.add(0, Walker::new("a", 1, &log));

    turns.start(from_fn(|_| Step::next_frame()), false);
    assert!(turns.tick(frame(1)).is_some());
    assert_eq!(turns.runner().len(), 1);
}

#[test]
fn test_actor_removes_itself_during_turn() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    turns.add(
        0,
        actor_fn(|_, cx| {
            let me = cx.actor();
            cx.remove(me).expect("self removal");
            None
        }),
    );
    let survivor = turns.add(1, Walker::new("survivor", 1, &log));

    let admitted = turns.tick(frame(1)).expect("survivor admitted");
    assert_eq!(admitted.actor, survivor);
    assert_eq!(turns.roster().len(), 1);
    assert_eq!(turns.cursor(), 1);

    let admitted = turns.tick(frame(2)).expect("next round");
    assert_eq!(admitted.actor, survivor);
    assert_eq!(admitted.round, 1);
}

#[test]
fn test_actor_recruits_during_turn() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    let recruited: Rc<Cell<Option<ActorId>>> = Rc::new(Cell::new(None));
    {
        let log = log.clone();
        let recruited = recruited.clone();
        turns.add(
            0,
            actor_fn(move |_, cx| {
                if recruited.get().is_none() {
                    let id = cx.add(1, Walker::new("summon", 1, &log));
                    recruited.set(Some(id));
                }
                None
            }),
        );
    }
    let last = turns.add(2, Walker::new("last", 1, &log));

    // The summoned actor lands right after the summoner and acts this round.
    let admitted = turns.tick(frame(1)).expect("summon admitted");
    assert_eq!(Some(admitted.actor), recruited.get());
    let admitted = turns.tick(frame(2)).expect("last admitted");
    assert_eq!(admitted.actor, last);
    assert_eq!(turns.round(), 0);
}

#[test]
fn test_remove_unknown_actor_is_an_error() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    let a = turns.add(0, Walker::new("a", 1, &log));
    turns.remove(a).unwrap();
    assert!(turns.remove(a).is_err());
    assert_eq!(turns.tick(frame(1)), None);
}

#[test]
fn test_lingering_sub_task_holds_back_its_spawner() {
    // A's action leaves a long non-gating effect behind in the turn runner.
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    let a = {
        let log = log.clone();
        turns.add(
            0,
            actor_fn(move |round, _| {
                log.borrow_mut().push(("a", round));
                Some(Box::new(from_fn(|cx| {
                    let mut frames = 0;
                    cx.spawn(from_fn(move |_| {
                        frames += 1;
                        if frames == 6 { Step::done() } else { Step::next_frame() }
                    }));
                    Step::done()
                })))
            }),
        )
    };
    let b = turns.add(1, Walker::new("b", 1, &log));

    assert_eq!(turns.tick(frame(1)).map(|adm| adm.actor), Some(a));
    assert_eq!(turns.tick(frame(2)).map(|adm| adm.actor), Some(b));
    // Round 1: A's action (#1) predates the lingering effect (#2).
    assert_eq!(turns.tick(frame(3)).map(|adm| adm.actor), Some(a));
    // B's action (#3) is newer than the oldest queued task, so B waits.
    assert_eq!(turns.tick(frame(4)), None);
    assert_eq!(turns.tick(frame(5)), None);
    // The first effect retires on tick 6, then B is admitted.
    assert_eq!(turns.tick(frame(6)), None);
    assert_eq!(turns.tick(frame(7)).map(|adm| adm.actor), Some(b));
}

#[test]
fn test_sub_task_waits_for_turn_start_behind_its_parent() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    {
        let log = log.clone();
        let mut offered = false;
        turns.add(
            0,
            actor_fn(move |_, _| {
                if offered {
                    return None;
                }
                offered = true;
                let log = log.clone();
                let mut resumes = 0;
                Some(Box::new(from_fn(move |cx| {
                    resumes += 1;
                    if resumes == 1 {
                        let log = log.clone();
                        let mut parked = false;
                        cx.spawn(from_fn(move |cx| {
                            if !parked {
                                parked = true;
                                log.borrow_mut().push(("parked", cx.frame().frame));
                                return Step::turn_start();
                            }
                            log.borrow_mut().push(("resumed", cx.frame().frame));
                            Step::done()
                        }));
                    }
                    if resumes == 3 { Step::done() } else { Step::next_frame() }
                })))
            }),
        );
    }

    assert!(turns.tick(frame(1)).is_some());
    assert_eq!(turns.runner().len(), 2);

    // The parent is still in flight, so the sub-task stays parked.
    assert_eq!(turns.tick(frame(2)), None);
    assert_eq!(turns.gating_in_flight(), 1);
    assert_eq!(*log.borrow(), vec![("parked", 1)]);

    // The parent retires first in the pass and the sub-task follows it.
    assert_eq!(turns.tick(frame(3)), None);
    assert_eq!(*log.borrow(), vec![("parked", 1), ("resumed", 3)]);
    assert!(turns.is_settled());
}

#[test]
fn test_roster_idle_only_after_a_full_quiet_round() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut turns = TurnController::new();
    assert!(turns.is_roster_idle());

    turns.add(0, Walker::new("a", 1, &log));
    let lazy = turns.add(1, actor_fn(|_, _| None));
    assert!(!turns.is_roster_idle());

    // A acts; B passes later in a round that already saw an action.
    assert!(turns.tick(frame(1)).is_some());
    assert!(!turns.is_roster_idle());
    assert_eq!(turns.tick(frame(2)), None);
    assert!(!turns.is_roster_idle());

    // Round 1 opens and A acts again: still busy.
    assert!(turns.tick(frame(3)).is_some());
    assert!(!turns.is_roster_idle());

    turns.remove(lazy).unwrap();
    let quiet = turns.roster().ids().next().expect("a remains");
    turns.remove(quiet).unwrap();
    turns.add(0, actor_fn(|_, _| None));
    assert_eq!(turns.tick(frame(4)), None);
    assert!(turns.is_roster_idle());
}
