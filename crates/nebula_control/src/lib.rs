//! Order-issuance orchestration layered on top of the pure `nebula_core`
//! engine: a `Simulation` that owns content + state + combat scratch space
//! and drives `nebula_core::engine::tick`, plus `OrderSource` implementations
//! that turn planner output into real ship orders before each tick runs.

use nebula_core::combat::CombatState;
use nebula_core::content::GameContent;
use nebula_core::engine::{self, SimConfig, TickOutcome};
use nebula_core::orders::Order;
use nebula_core::state::GameState;
use nebula_core::Id;

/// Anything that can look at the world and decide what idle ships should do
/// next. `ScenarioSource` replays a scripted order list keyed by day, for
/// reproducible test scenarios.
pub trait OrderSource {
    fn generate_orders(&mut self, state: &GameState, content: &GameContent) -> Vec<(Id, Order)>;
}

/// Placeholder order source kept for callers that still want to pass an
/// autopilot slot to `Simulation::advance`. The freight/fuel/salvage/
/// sustainment/troop/population planners it used to drive by hand are now
/// run automatically, once per faction, inside
/// `nebula_core::engine::tick` itself, so there's nothing left for this to
/// generate.
#[derive(Debug, Default)]
pub struct AutopilotController;

impl OrderSource for AutopilotController {
    fn generate_orders(&mut self, _state: &GameState, _content: &GameContent) -> Vec<(Id, Order)> {
        Vec::new()
    }
}

/// Replays a scripted sequence of orders from a fixed day -> orders map,
/// used by deterministic scenario tests instead of the autopilot.
#[derive(Debug, Default)]
pub struct ScenarioSource {
    pub schedule: std::collections::BTreeMap<u64, Vec<(Id, Order)>>,
}

impl OrderSource for ScenarioSource {
    fn generate_orders(&mut self, state: &GameState, _content: &GameContent) -> Vec<(Id, Order)> {
        self.schedule.remove(&state.date_days).unwrap_or_default()
    }
}

fn apply_orders(state: &mut GameState, orders: Vec<(Id, Order)>) {
    for (ship_id, order) in orders {
        if let Some(ship_orders) = state.ship_orders.get_mut(&ship_id) {
            ship_orders.queue.push_back(order);
        }
    }
}

/// Owns everything needed to advance a game by one or more ticks: the
/// content table, the mutable world state, the transient combat scratch
/// space (missiles in flight), and the tick config. `nebula_cli`/
/// `nebula_daemon` hold one of these and call `advance` in a loop.
pub struct Simulation {
    pub state: GameState,
    pub content: GameContent,
    pub combat: CombatState,
    pub config: SimConfig,
}

impl Simulation {
    pub fn new(state: GameState, content: GameContent, config: SimConfig) -> Self {
        Simulation { state, content, combat: CombatState::default(), config }
    }

    /// Runs one tick: order sources issue fresh orders to idle ships, then
    /// the engine's fixed pipeline advances the world.
    pub fn advance(&mut self, order_sources: &mut [&mut dyn OrderSource]) -> TickOutcome {
        for source in order_sources {
            let orders = source.generate_orders(&self.state, &self.content);
            apply_orders(&mut self.state, orders);
        }
        engine::tick(&mut self.state, &self.content, &mut self.combat, &self.config)
    }

    /// Runs the validator and repairs any invariant violations found.
    pub fn validate_and_fix(&mut self) -> Vec<String> {
        engine::validate_and_fix(&mut self.state, &self.content)
    }

    /// Advances the simulation by `hours` one-hour ticks, the tick
    /// granularity the engine's pipeline is defined against. Order sources
    /// are consulted once per hour, same as `advance`.
    pub fn advance_hours(&mut self, hours: u32, order_sources: &mut [&mut dyn OrderSource]) -> Vec<TickOutcome> {
        let saved_hours_per_tick = self.config.hours_per_tick;
        self.config.hours_per_tick = 1.0;
        let mut outcomes = Vec::with_capacity(hours as usize);
        for _ in 0..hours {
            outcomes.push(self.advance(order_sources));
        }
        self.config.hours_per_tick = saved_hours_per_tick;
        outcomes
    }

    /// Advances the simulation by `days` days, run as `24 * days` one-hour
    /// ticks.
    pub fn advance_days(&mut self, days: u32, order_sources: &mut [&mut dyn OrderSource]) -> Vec<TickOutcome> {
        self.advance_hours(days * 24, order_sources)
    }
}
