//! Tick orchestrator: the fixed-order pipeline that advances `GameState` by
//! one tick. Step order is load-bearing — reordering it changes outcomes,
//! so it is not configurable.

use crate::combat::{self, CombatState};
use crate::content::GameContent;
use crate::contracts_tick;
use crate::diplomacy;
use crate::economy;
use crate::exploration;
use crate::id::Id;
use crate::orders::Order;
use crate::planners::{self, common::Assignment};
use crate::research;
use crate::state::{ContractStatus, ControlMode, GameState};
use crate::validator;
use crate::victory;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub hours_per_tick: f64,
    pub sensor_contact_range_mkm: f64,
    /// Divides summed patrol-fleet weapon power before it offsets a
    /// region's `pirate_risk` in the suppression target.
    pub pirate_suppression_power_scale: f64,
    /// Fraction of the gap between current `pirate_suppression` and its
    /// target that closes per day.
    pub pirate_suppression_adjust_fraction_per_day: f64,
    /// Fraction of `build_costs_per_ton` refunded when a ship is scrapped
    /// or destroyed.
    pub scrap_recovery_rate: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            hours_per_tick: 24.0,
            sensor_contact_range_mkm: 50.0,
            pirate_suppression_power_scale: 20.0,
            pirate_suppression_adjust_fraction_per_day: 0.1,
            scrap_recovery_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub events_emitted: usize,
    pub day: f64,
    pub game_over: bool,
}

/// Advances `state` by `config.hours_per_tick` hours, running the full
/// 13-step pipeline once. `combat` is threaded separately because in-flight
/// missiles are not part of the persisted save.
pub fn tick(state: &mut GameState, content: &GameContent, combat: &mut CombatState, config: &SimConfig) -> TickOutcome {
    let events_before = state.events.len();
    let hours = config.hours_per_tick;

    update_orbits(state, hours);
    update_fog_of_war(state, content, config);
    crate::order_exec::execute_ship_orders(state, content, hours, config.scrap_recovery_rate);
    combat::run_combat_tick(state, content, combat, hours, config.scrap_recovery_rate);
    combat::pursue_attack_targets(state, content, hours);
    run_logistics_planners(state, content);
    economy::run_colony_economy_tick(state, content, hours);
    research::run_research_tick(state, content);
    exploration::run_exploration_tick(state, content, hours);
    run_pirate_ai(state, content, config, hours);
    contracts_tick::run_contracts_tick(state, content);
    diplomacy::run_diplomacy_tick(state, content, hours);
    victory::run_victory_check(state, content);
    advance_clock(state, hours);

    TickOutcome {
        events_emitted: state.events.len() - events_before,
        day: state.day_fraction(),
        game_over: state.victory_state.game_over,
    }
}

fn update_orbits(state: &mut GameState, _hours: f64) {
    let day = state.day_fraction();
    for body in state.bodies.values_mut() {
        body.position_mkm = body.orbit.position_at(day);
    }
}

fn update_fog_of_war(state: &mut GameState, content: &GameContent, config: &SimConfig) {
    let tick_number = state.date_days;
    let ships: Vec<(Id, Id, Id, crate::vec2::Vec2, f64)> = state
        .ships
        .values()
        .map(|s| {
            let sensor_range = content
                .designs
                .get(&s.design_id)
                .map(|d| &d.stats)
                .or_else(|| state.custom_designs.get(&s.design_id).map(|d| &d.stats))
                .map(|stats| stats.sensor_range_mkm)
                .filter(|&r| r > 0.0)
                .unwrap_or(config.sensor_contact_range_mkm);
            (s.id, s.faction_id, s.system_id, s.position_mkm, sensor_range)
        })
        .collect();

    for &(_, observer_faction, observer_system, observer_pos, sensor_range) in &ships {
        for &(target_id, target_faction, target_system, target_pos, _) in &ships {
            if target_faction == observer_faction || target_system != observer_system {
                continue;
            }
            if observer_pos.distance(target_pos) > sensor_range {
                continue;
            }
            if let Some(faction) = state.factions.get_mut(&observer_faction) {
                faction.ship_contacts.insert(
                    target_id,
                    crate::state::ShipContact {
                        last_known_position_mkm: target_pos,
                        last_known_system_id: target_system,
                        last_seen_tick: tick_number,
                    },
                );
            }
        }
    }
}

fn run_logistics_planners(state: &mut GameState, content: &GameContent) {
    let faction_ids: Vec<Id> = state.factions.keys().copied().collect();
    for faction_id in faction_ids {
        apply_mine_plan(state, content, faction_id);
        apply_contract_plan(state, content, faction_id);
        apply_freight_plan(state, content, faction_id);
        apply_fuel_plan(state, content, faction_id);
        apply_salvage_plan(state, content, faction_id);
        apply_sustainment_plan(state, content, faction_id);
        apply_troop_plan(state, content, faction_id);
        apply_population_plan(state, content, faction_id);
    }
    planners::logistics::run_terraform_target_assignment(state);
}

fn ship_is_idle(state: &GameState, ship_id: Id) -> bool {
    state.ship_orders.get(&ship_id).map(|o| o.queue.is_empty()).unwrap_or(false)
}

fn apply_freight_plan(state: &mut GameState, content: &GameContent, faction_id: Id) {
    for assignment in planners::logistics::compute_freight_plan(state, content, faction_id) {
        if !ship_is_idle(state, assignment.actor_id) {
            continue;
        }
        let Some(colony) = state.colonies.get(&assignment.target_id) else { continue };
        let body_id = colony.body_id;
        let colony_id = assignment.target_id;
        let queue = &mut state.ship_orders.get_mut(&assignment.actor_id).unwrap().queue;
        queue.push_back(Order::MoveToBody { body_id });
        queue.push_back(Order::LoadMineral { colony_id, mineral: None, tons: 0.0 });
    }
}

fn apply_fuel_plan(state: &mut GameState, content: &GameContent, faction_id: Id) {
    for assignment in planners::logistics::compute_fuel_plan(state, content, faction_id) {
        if !ship_is_idle(state, assignment.actor_id) {
            continue;
        }
        let Some(target) = state.ships.get(&assignment.target_id) else { continue };
        let destination = target.position_mkm;
        let target_ship_id = assignment.target_id;
        let queue = &mut state.ship_orders.get_mut(&assignment.actor_id).unwrap().queue;
        queue.push_back(Order::MoveToPoint { destination });
        queue.push_back(Order::TransferFuelToShip { target_ship_id, tons: 0.0 });
    }
}

fn apply_salvage_plan(state: &mut GameState, content: &GameContent, faction_id: Id) {
    for assignment in planners::logistics::compute_salvage_plan(state, content, faction_id) {
        if !ship_is_idle(state, assignment.actor_id) {
            continue;
        }
        let wreck_id = assignment.target_id;
        state.ship_orders.get_mut(&assignment.actor_id).unwrap().queue.push_back(Order::SalvageWreck { wreck_id });
    }
}

fn apply_sustainment_plan(state: &mut GameState, content: &GameContent, faction_id: Id) {
    for assignment in planners::logistics::compute_sustainment_plan(state, content, faction_id) {
        if !ship_is_idle(state, assignment.actor_id) {
            continue;
        }
        let Some(colony) = state.colonies.get(&assignment.target_id) else { continue };
        let body_id = colony.body_id;
        state.ship_orders.get_mut(&assignment.actor_id).unwrap().queue.push_back(Order::MoveToBody { body_id });
    }
}

/// Troop reinforcement: there is no order primitive for depositing troops
/// onto a colony's ground forces (only ship-to-ship transfer exists), so the
/// best available action is to move the trooper into range; a human or a
/// later order addition handles the actual handoff.
fn apply_troop_plan(state: &mut GameState, content: &GameContent, faction_id: Id) {
    for assignment in planners::logistics::compute_troop_plan(state, content, faction_id) {
        if !ship_is_idle(state, assignment.actor_id) {
            continue;
        }
        let Some(colony) = state.colonies.get(&assignment.target_id) else { continue };
        let body_id = colony.body_id;
        state.ship_orders.get_mut(&assignment.actor_id).unwrap().queue.push_back(Order::MoveToBody { body_id });
    }
}

/// Colonization: same limitation as troop reinforcement — no `Colonize`
/// order exists, so the colonist ship is only moved to the target body.
fn apply_population_plan(state: &mut GameState, content: &GameContent, faction_id: Id) {
    for assignment in planners::logistics::compute_population_plan(state, content, faction_id) {
        if !ship_is_idle(state, assignment.actor_id) {
            continue;
        }
        let body_id = assignment.target_id;
        state.ship_orders.get_mut(&assignment.actor_id).unwrap().queue.push_back(Order::MoveToBody { body_id });
    }
}

fn apply_mine_plan(state: &mut GameState, content: &GameContent, faction_id: Id) {
    let routing_speed = |state: &GameState, ship_id: Id| -> f64 {
        state
            .ships
            .get(&ship_id)
            .and_then(|s| content.designs.get(&s.design_id).map(|d| &d.stats).or_else(|| state.custom_designs.get(&s.design_id).map(|d| &d.stats)))
            .map(|s| s.speed_km_s * 86.4)
            .unwrap_or(0.0)
    };
    let speed_sample = state
        .ships
        .values()
        .find(|s| s.faction_id == faction_id)
        .map(|s| routing_speed(state, s.id))
        .unwrap_or(86.4);

    let plan = planners::mine::compute_mine_plan(state, content, faction_id, speed_sample);
    for assignment in plan {
        let Some(orders) = state.ship_orders.get(&assignment.ship_id) else { continue };
        if !orders.queue.is_empty() {
            continue;
        }
        let queue = &mut state.ship_orders.get_mut(&assignment.ship_id).unwrap().queue;
        match assignment.kind {
            planners::mine::MineAssignmentKind::DeliverCargo => {
                if let Some(dest) = assignment.dest_colony_id {
                    queue.push_back(Order::UnloadMineral { colony_id: dest, mineral: None, tons: 0.0 });
                }
            }
            planners::mine::MineAssignmentKind::MineAndDeliver => {
                if let Some(body_id) = assignment.body_id {
                    let mineral = assignment.mineral.clone().unwrap_or_else(|| crate::content::ResourceId::from("duranium"));
                    queue.push_back(Order::MineBody { body_id, mineral, stop_when_cargo_full: true });
                }
                if let Some(dest) = assignment.dest_colony_id {
                    queue.push_back(Order::UnloadMineral { colony_id: dest, mineral: None, tons: 0.0 });
                }
            }
        }
    }
}

fn apply_contract_plan(state: &mut GameState, content: &GameContent, faction_id: Id) {
    let plan: Vec<Assignment> = planners::contract::compute_contract_plan(state, content, faction_id);
    let day = state.day_fraction();
    for assignment in plan {
        let ship_id = assignment.actor_id;
        let contract_id = assignment.target_id;
        let Some(contract) = state.contracts.get(&contract_id) else { continue };
        let kind = contract.kind;
        let target_id = contract.target_id;

        if let Some(contract) = state.contracts.get_mut(&contract_id) {
            contract.status = ContractStatus::Accepted;
            contract.assigned_ship_id = Some(ship_id);
            contract.accepted_day = Some(day);
        }

        let Some(orders) = state.ship_orders.get(&ship_id) else { continue };
        if !orders.queue.is_empty() {
            continue;
        }
        let queue = &mut state.ship_orders.get_mut(&ship_id).unwrap().queue;
        match kind {
            crate::state::ContractKind::InvestigateAnomaly => {
                if let Some(pos) = state.anomalies.get(&target_id).map(|a| a.position_mkm) {
                    queue.push_back(Order::MoveToPoint { destination: pos });
                }
            }
            crate::state::ContractKind::SalvageWreck => queue.push_back(Order::SalvageWreck { wreck_id: target_id }),
            crate::state::ContractKind::SurveyJumpPoint => queue.push_back(Order::SurveyJumpPoint { jump_id: target_id, progress_days: 0.0 }),
            crate::state::ContractKind::EscortConvoy => queue.push_back(Order::EscortShip { target_ship_id: target_id }),
        }
    }
}

fn run_pirate_ai(state: &mut GameState, content: &GameContent, config: &SimConfig, hours: f64) {
    let pirate_factions: Vec<Id> = state
        .factions
        .iter()
        .filter(|(_, f)| f.control_mode == ControlMode::AiPirate)
        .map(|(&id, _)| id)
        .collect();
    if !pirate_factions.is_empty() {
        let ship_ids: Vec<Id> = state.ships.keys().copied().collect();
        for ship_id in ship_ids {
            let Some(ship) = state.ships.get(&ship_id) else { continue };
            if !pirate_factions.contains(&ship.faction_id) {
                continue;
            }
            let idle = state.ship_orders.get(&ship_id).map(|o| o.queue.is_empty()).unwrap_or(true);
            if !idle {
                continue;
            }
            let (system_id, faction_id) = (ship.system_id, ship.faction_id);
            let target = state
                .ships
                .values()
                .find(|s| s.system_id == system_id && s.faction_id != faction_id)
                .map(|s| s.id);
            if let Some(target_id) = target {
                state.ship_orders.get_mut(&ship_id).unwrap().queue.push_back(Order::AttackShip { ship_id: target_id });
            }
        }
    }

    run_piracy_suppression(state, content, config, hours);
}

/// Fleets on a `SuppressPiracy` mission contribute the summed weapon power
/// of their ships to their target region; `pirate_suppression` drifts
/// toward `fleet_power / power_scale - pirate_risk`, clamped to [0,1], by
/// `pirate_suppression_adjust_fraction_per_day` of the remaining gap per
/// day.
fn run_piracy_suppression(state: &mut GameState, content: &GameContent, config: &SimConfig, hours: f64) {
    if state.regions.is_empty() {
        return;
    }
    let days = hours / 24.0;

    let mut fleet_power_by_region: std::collections::HashMap<Id, f64> = std::collections::HashMap::new();
    for fleet in state.fleets.values() {
        let crate::orders::FleetMission::SuppressPiracy { region_id } = fleet.mission else { continue };
        let power: f64 = fleet
            .ship_ids
            .iter()
            .filter_map(|ship_id| state.ships.get(ship_id))
            .filter_map(|ship| {
                content
                    .designs
                    .get(&ship.design_id)
                    .map(|d| &d.stats)
                    .or_else(|| state.custom_designs.get(&ship.design_id).map(|d| &d.stats))
            })
            .map(|stats| stats.weapon_damage.max(0.0) + stats.missile_damage.max(0.0) + stats.point_defense_damage.max(0.0))
            .sum();
        *fleet_power_by_region.entry(region_id).or_insert(0.0) += power;
    }

    for (region_id, region) in state.regions.iter_mut() {
        let fleet_power = fleet_power_by_region.get(region_id).copied().unwrap_or(0.0);
        let target = (fleet_power / config.pirate_suppression_power_scale - region.modifiers.pirate_risk).clamp(0.0, 1.0);
        let gap = target - region.modifiers.pirate_suppression;
        region.modifiers.pirate_suppression += gap * config.pirate_suppression_adjust_fraction_per_day * days;
        region.modifiers.pirate_suppression = region.modifiers.pirate_suppression.clamp(0.0, 1.0);
    }
}

fn advance_clock(state: &mut GameState, hours: f64) {
    let total_hours = f64::from(state.hour_of_day) + hours;
    let extra_days = (total_hours / 24.0).floor() as u64;
    state.date_days += extra_days;
    state.hour_of_day = (total_hours - extra_days as f64 * 24.0).round() as u8;
}

/// Runs the validator and repairs any invariant violations in place. Not
/// part of the tick pipeline itself; called by the orchestrator around
/// load/save and content hot-reload boundaries.
pub fn validate_and_fix(state: &mut GameState, content: &GameContent) -> Vec<String> {
    let errors = validator::validate_game_state(state, content);
    if !errors.is_empty() {
        validator::fix_game_state(state, content);
    }
    errors
}
