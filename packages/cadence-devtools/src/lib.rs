use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Admissions kept in a snapshot's history.
pub const HISTORY_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SchedulerMetrics {
    pub frame: u64,
    pub time: f64,
    pub round: u64,
    pub cursor: usize,
    pub actors: usize,
    pub turn_tasks: usize,
    pub gating_in_flight: usize,
    pub free_tasks: usize,
    pub pending_waiters: usize,
    pub frontier: u64,
    pub tasks_completed: u64,
    pub admissions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub frame: u64,
    pub round: u64,
    pub task: u64,
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DevToolsSnapshot {
    pub metrics: SchedulerMetrics,
    pub history: VecDeque<AdmissionRecord>,
    pub ticks_recorded: u64,
}

pub trait DevBridge: Send + Sync {
    fn send_snapshot(&self, snapshot: &DevToolsSnapshot);
}

/// Collects scheduler state for inspection tools.
///
/// Owned by whoever drives the schedulers and passed in explicitly; there is
/// no global instance.
#[derive(Default)]
pub struct DevToolsContext {
    snapshot: Mutex<DevToolsSnapshot>,
    bridge: Mutex<Option<Box<dyn DevBridge>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DevToolsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bridge(&self, bridge: Box<dyn DevBridge>) {
        *lock(&self.bridge) = Some(bridge);
    }

    pub fn record_admission(&self, record: AdmissionRecord) {
        let mut snapshot = lock(&self.snapshot);
        if snapshot.history.len() == HISTORY_LEN {
            snapshot.history.pop_front();
        }
        snapshot.history.push_back(record);
    }

    /// Store the metrics for the tick that just ran and push to the bridge.
    pub fn record_tick(&self, metrics: SchedulerMetrics) {
        let mut snapshot = lock(&self.snapshot);
        snapshot.metrics = metrics;
        snapshot.ticks_recorded += 1;

        if let Some(bridge) = lock(&self.bridge).as_ref() {
            bridge.send_snapshot(&snapshot);
        }
    }

    pub fn snapshot(&self) -> DevToolsSnapshot {
        lock(&self.snapshot).clone()
    }

    pub fn export_state(&self) -> String {
        let snapshot = lock(&self.snapshot);
        serde_json::to_string(&*snapshot).unwrap_or_else(|err| {
            tracing::warn!(%err, "devtools snapshot failed to serialize");
            String::new()
        })
    }
}
