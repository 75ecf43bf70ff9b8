use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nebula_control::OrderSource;
use nebula_core::state::{GameState, SimEvent};
use nebula_core::{content::GameContent, Id, Order};

use crate::state::{CommandQueue, EventTx, SharedSim, SimState};

/// How often the tick loop yields to the tokio runtime when running flat-out.
/// Lower = more responsive HTTP/SSE but more overhead. 1ms is a good balance.
const YIELD_INTERVAL: Duration = Duration::from_millis(1);

/// How often to log throughput stats.
const PERF_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Drains queued player orders once per tick; everything already in the
/// queue when `generate_orders` is called is issued, nothing is held back.
struct QueuedOrderSource {
    queue: CommandQueue,
}

impl OrderSource for QueuedOrderSource {
    fn generate_orders(&mut self, _state: &GameState, _content: &GameContent) -> Vec<(Id, Order)> {
        self.queue.lock().drain(..).collect()
    }
}

pub async fn run_tick_loop(
    sim: SharedSim,
    command_queue: CommandQueue,
    event_tx: EventTx,
    ticks_per_sec: Arc<AtomicU64>,
    max_ticks: Option<u64>,
    paused: Arc<AtomicBool>,
) {
    let mut player_source = QueuedOrderSource { queue: command_queue };
    let mut next_tick_at: Option<Instant> = None;
    let mut last_yield_at = Instant::now();
    let mut perf_window_start = Instant::now();
    let mut perf_window_ticks: u64 = 0;

    loop {
        while paused.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(50)).await;
            next_tick_at = None;
            last_yield_at = Instant::now();
            perf_window_start = Instant::now();
            perf_window_ticks = 0;
        }

        // --- Pacing ---
        let rate = f64::from_bits(ticks_per_sec.load(Ordering::Relaxed));
        if rate > 0.0 {
            let now = Instant::now();
            let target = next_tick_at.unwrap_or(now);
            if now < target {
                // Ahead of schedule — sleep until the next tick is due.
                tokio::time::sleep(target - now).await;
                last_yield_at = Instant::now();
            } else if now.duration_since(last_yield_at) >= YIELD_INTERVAL {
                // Behind schedule but haven't yielded recently — yield so tokio
                // can service HTTP/SSE handlers without starving them.
                tokio::task::yield_now().await;
                last_yield_at = Instant::now();
            }
            next_tick_at = Some(
                next_tick_at
                    .unwrap_or(now)
                    .checked_add(Duration::from_secs_f64(1.0 / rate))
                    .unwrap_or(now),
            );
        } else {
            // Unlimited — yield periodically instead of every tick.
            let now = Instant::now();
            if now.duration_since(last_yield_at) >= YIELD_INTERVAL {
                tokio::task::yield_now().await;
                last_yield_at = Instant::now();
            }
            next_tick_at = None;
        }

        // --- Execute one tick ---
        let (events, done) = {
            let mut guard = sim.lock();
            let events_before = guard.simulation.state.events.len();

            let SimState { ref mut simulation, ref mut autopilot, .. } = *guard;
            let mut sources: [&mut dyn OrderSource; 2] = [autopilot, &mut player_source];
            simulation.advance(&mut sources);

            let metrics_every = guard.metrics_every;
            if metrics_every > 0 && guard.simulation.state.date_days.is_multiple_of(metrics_every) {
                let snapshot = nebula_core::metrics::compute_metrics(&guard.simulation.state, &guard.simulation.content);
                guard.push_metrics(snapshot);

                let history = guard.metrics_history.clone();
                let SimState { ref mut alert_engine, ref mut simulation, .. } = *guard;
                if let Some(engine) = alert_engine.as_mut() {
                    engine.evaluate(&history, &mut simulation.state);
                }
            }

            let events: Vec<SimEvent> = guard.simulation.state.events[events_before..].to_vec();
            let done = max_ticks.is_some_and(|max| guard.simulation.state.date_days >= max);
            (events, done)
        };

        let _ = event_tx.send(events);

        // --- Performance logging ---
        perf_window_ticks += 1;
        let elapsed = perf_window_start.elapsed();
        if elapsed >= PERF_LOG_INTERVAL {
            let tps = perf_window_ticks as f64 / elapsed.as_secs_f64();
            tracing::info!(tps = format_args!("{tps:.0}"), ticks = perf_window_ticks, "tick loop throughput");
            perf_window_start = Instant::now();
            perf_window_ticks = 0;
        }

        if done {
            break;
        }
    }
}
