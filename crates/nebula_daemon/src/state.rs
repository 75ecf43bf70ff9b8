use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use nebula_control::{AutopilotController, Simulation};
use nebula_core::metrics::MetricsSnapshot;
use nebula_core::{Id, Order};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Maximum number of metrics snapshots kept in memory.
pub(crate) const MAX_METRICS_HISTORY: usize = 10_000;

pub struct SimState {
    pub simulation: Simulation,
    pub autopilot: AutopilotController,
    pub metrics_every: u64,
    pub metrics_history: VecDeque<MetricsSnapshot>,
    pub alert_engine: Option<crate::alerts::AlertEngine>,
}

impl SimState {
    pub fn push_metrics(&mut self, snapshot: MetricsSnapshot) {
        if self.metrics_history.len() >= MAX_METRICS_HISTORY {
            self.metrics_history.pop_front();
        }
        self.metrics_history.push_back(snapshot);
    }
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<nebula_core::state::SimEvent>>;
pub type CommandQueue = Arc<Mutex<Vec<(Id, Order)>>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub commands: CommandQueue,
    pub event_tx: EventTx,
    /// `f64` ticks-per-second stored as raw bits so it can be changed live
    /// from an HTTP handler without locking the simulation. 0 = unlimited.
    pub ticks_per_sec: Arc<AtomicU64>,
    pub run_dir: Option<PathBuf>,
    pub paused: Arc<AtomicBool>,
}
