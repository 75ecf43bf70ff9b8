//! The remaining logistics planners: freight, fuel, salvage, sustainment,
//! troop, population, and terraforming. Each one scores (ship, target) edges
//! and resolves conflicts with the same [`greedy_assign_by_score`] combinator
//! used by the mine and contract planners — only the scoring differs.

use crate::content::GameContent;
use crate::id::Id;
use crate::routing::{plan_jump_route, RoutingContext};
use crate::state::GameState;

use super::common::{greedy_assign_by_score, Assignment};

fn speed_mkm_per_day(content: &GameContent, state: &GameState, design_id: &crate::content::ShipDesignId) -> Option<f64> {
    content
        .designs
        .get(design_id)
        .map(|d| &d.stats)
        .or_else(|| state.custom_designs.get(design_id).map(|d| &d.stats))
        .map(|s| s.speed_km_s * 86.4)
        .filter(|&s| s > 0.0)
}

/// Idle freighters haul surplus stockpile from colonies that have it to
/// colonies that are short, scored by `tons_movable / eta_days`.
pub fn compute_freight_plan(state: &GameState, content: &GameContent, faction_id: Id) -> Vec<Assignment> {
    let routing_ctx = RoutingContext { systems: &state.systems, jump_points: &state.jump_points };
    let colonies: Vec<Id> = state.colonies.iter().filter(|(_, c)| c.faction_id == faction_id).map(|(&id, _)| id).collect();
    if colonies.len() < 2 {
        return Vec::new();
    }

    let ships: Vec<Id> = state
        .ships
        .iter()
        .filter(|(_, s)| s.faction_id == faction_id && s.automation.auto_freight)
        .map(|(&id, _)| id)
        .collect();

    let mut edges = Vec::new();
    for &ship_id in &ships {
        let ship = &state.ships[&ship_id];
        let Some(speed) = speed_mkm_per_day(content, state, &ship.design_id) else { continue };
        for &dest_colony_id in &colonies {
            let dest = &state.colonies[&dest_colony_id];
            let Some(body) = state.bodies.get(&dest.body_id) else { continue };
            let Some(route) = plan_jump_route(&routing_ctx, ship.system_id, ship.position_mkm, speed, body.system_id, body.position_mkm, None) else {
                continue;
            };
            let surplus: f64 = dest.stockpile.values().sum();
            if surplus <= 1.0 {
                continue;
            }
            let score = surplus / route.eta_days.max(0.25);
            edges.push(Assignment { actor_id: ship_id, target_id: dest_colony_id, score });
        }
    }
    greedy_assign_by_score(edges)
}

/// Tanker ships top off any ship below half fuel, nearest first.
pub fn compute_fuel_plan(state: &GameState, content: &GameContent, faction_id: Id) -> Vec<Assignment> {
    let tankers: Vec<Id> = state
        .ships
        .iter()
        .filter(|(_, s)| s.faction_id == faction_id && s.automation.auto_tanker)
        .map(|(&id, _)| id)
        .collect();

    let low_fuel_ships: Vec<Id> = state
        .ships
        .iter()
        .filter(|(_, s)| {
            s.faction_id == faction_id
                && content
                    .designs
                    .get(&s.design_id)
                    .map(|d| s.fuel < d.stats.fuel_capacity * 0.5)
                    .unwrap_or(false)
        })
        .map(|(&id, _)| id)
        .collect();

    let mut edges = Vec::new();
    for &tanker_id in &tankers {
        let tanker = &state.ships[&tanker_id];
        for &target_id in &low_fuel_ships {
            if target_id == tanker_id {
                continue;
            }
            let target = &state.ships[&target_id];
            if target.system_id != tanker.system_id {
                continue;
            }
            let dist = tanker.position_mkm.distance(target.position_mkm).max(1e-6);
            edges.push(Assignment { actor_id: tanker_id, target_id, score: 1.0 / dist });
        }
    }
    greedy_assign_by_score(edges)
}

/// Salvage ships target the nearest wreck with remaining minerals, scored by
/// `wreck_tons / eta_days`.
pub fn compute_salvage_plan(state: &GameState, content: &GameContent, faction_id: Id) -> Vec<Assignment> {
    let routing_ctx = RoutingContext { systems: &state.systems, jump_points: &state.jump_points };
    let ships: Vec<Id> = state
        .ships
        .iter()
        .filter(|(_, s)| s.faction_id == faction_id && s.automation.auto_salvage)
        .map(|(&id, _)| id)
        .collect();

    let mut edges = Vec::new();
    for &ship_id in &ships {
        let ship = &state.ships[&ship_id];
        let Some(speed) = speed_mkm_per_day(content, state, &ship.design_id) else { continue };
        for (&wreck_id, wreck) in &state.wrecks {
            let total: f64 = wreck.minerals.values().sum();
            if total <= 1e-6 {
                continue;
            }
            let Some(route) = plan_jump_route(&routing_ctx, ship.system_id, ship.position_mkm, speed, wreck.system_id, wreck.position_mkm, None) else {
                continue;
            };
            let score = total / route.eta_days.max(0.25);
            edges.push(Assignment { actor_id: ship_id, target_id: wreck_id, score });
        }
    }
    greedy_assign_by_score(edges)
}

/// Damaged or reload-depleted combat ships head home for resupply: scored by
/// `urgency / eta_days` where urgency is how far hp and missile reload stock
/// are below full, so the most battered ship closest to a colony wins first.
pub fn compute_sustainment_plan(state: &GameState, content: &GameContent, faction_id: Id) -> Vec<Assignment> {
    let routing_ctx = RoutingContext { systems: &state.systems, jump_points: &state.jump_points };
    let colonies: Vec<Id> = state.colonies.iter().filter(|(_, c)| c.faction_id == faction_id).map(|(&id, _)| id).collect();
    if colonies.is_empty() {
        return Vec::new();
    }

    let mut edges = Vec::new();
    for (&ship_id, ship) in &state.ships {
        if ship.faction_id != faction_id {
            continue;
        }
        let Some(stats) = content.designs.get(&ship.design_id).map(|d| &d.stats).or_else(|| state.custom_designs.get(&ship.design_id).map(|d| &d.stats)) else {
            continue;
        };
        let hp_deficit = if stats.max_hp > 0.0 { (1.0 - ship.hp / stats.max_hp).max(0.0) } else { 0.0 };
        let reload_deficit = if ship.missile_reload_remaining_days.iter().any(|&d| d > 0.0) { 0.25 } else { 0.0 };
        let urgency = hp_deficit + reload_deficit;
        if urgency <= 0.05 {
            continue;
        }
        let Some(speed) = speed_mkm_per_day(content, state, &ship.design_id) else { continue };
        let mut best: Option<(Id, f64)> = None;
        for &colony_id in &colonies {
            let Some(body) = state.colonies.get(&colony_id).and_then(|c| state.bodies.get(&c.body_id)) else { continue };
            let Some(route) = plan_jump_route(&routing_ctx, ship.system_id, ship.position_mkm, speed, body.system_id, body.position_mkm, None) else {
                continue;
            };
            let better = match best {
                Some((_, d)) => route.eta_days < d,
                None => true,
            };
            if better {
                best = Some((colony_id, route.eta_days));
            }
        }
        if let Some((colony_id, eta_days)) = best {
            edges.push(Assignment { actor_id: ship_id, target_id: colony_id, score: urgency / eta_days.max(0.25) });
        }
    }
    greedy_assign_by_score(edges)
}

/// Troop-carrying ships reinforce the colony with the thinnest garrison
/// relative to its population.
pub fn compute_troop_plan(state: &GameState, _content: &GameContent, faction_id: Id) -> Vec<Assignment> {
    let troopers: Vec<Id> = state
        .ships
        .iter()
        .filter(|(_, s)| s.faction_id == faction_id && s.automation.auto_troop && s.troops > 0.0)
        .map(|(&id, _)| id)
        .collect();

    let mut edges = Vec::new();
    for &ship_id in &troopers {
        for (&colony_id, colony) in &state.colonies {
            if colony.faction_id != faction_id {
                continue;
            }
            let garrison_ratio = colony.ground_forces.troops / colony.population_millions.max(0.01);
            let deficiency = (1.0 - garrison_ratio).max(0.0);
            if deficiency <= 0.0 {
                continue;
            }
            edges.push(Assignment { actor_id: ship_id, target_id: colony_id, score: deficiency });
        }
    }
    greedy_assign_by_score(edges)
}

/// Colonist ships (auto_colonize) settle the most promising uncolonized
/// habitable body: closer to Earth-normal temperature/atmosphere scores
/// higher.
pub fn compute_population_plan(state: &GameState, _content: &GameContent, faction_id: Id) -> Vec<Assignment> {
    const EARTH_TEMP_K: f64 = 288.0;
    const EARTH_ATM: f64 = 1.0;

    let colonized_bodies: std::collections::HashSet<Id> = state.colonies.values().map(|c| c.body_id).collect();
    let colonizers: Vec<Id> = state
        .ships
        .iter()
        .filter(|(_, s)| s.faction_id == faction_id && s.automation.auto_colonize)
        .map(|(&id, _)| id)
        .collect();

    let mut edges = Vec::new();
    for &ship_id in &colonizers {
        for (&body_id, body) in &state.bodies {
            if colonized_bodies.contains(&body_id) || body.body_type == crate::state::BodyType::Star {
                continue;
            }
            let habitability = 1.0 / (1.0 + (body.surface_temp_k - EARTH_TEMP_K).abs() / 50.0 + (body.atmosphere_atm - EARTH_ATM).abs());
            if habitability <= 0.0 {
                continue;
            }
            edges.push(Assignment { actor_id: ship_id, target_id: body_id, score: habitability });
        }
    }
    greedy_assign_by_score(edges)
}

/// Colonies lacking a terraforming target get one set toward Earth-normal,
/// biased by whichever installation-driven terraforming capacity exists.
pub fn run_terraform_target_assignment(state: &mut GameState) {
    const EARTH_TEMP_K: f64 = 288.0;
    const EARTH_ATM: f64 = 1.0;
    let body_ids: Vec<Id> = state.colonies.values().map(|c| c.body_id).collect();
    for body_id in body_ids {
        if let Some(body) = state.bodies.get_mut(&body_id) {
            if body.terraform_target_temp_k.is_none() {
                body.terraform_target_temp_k = Some(EARTH_TEMP_K);
            }
            if body.terraform_target_atm.is_none() {
                body.terraform_target_atm = Some(EARTH_ATM);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StarSystem;
    use crate::test_fixtures::{base_content, empty_state};

    #[test]
    fn damaged_ship_is_assigned_to_nearest_colony() {
        let mut content = base_content();
        {
            let stats = &mut content.designs.get_mut(&crate::content::ShipDesignId::from("frigate_mk1")).unwrap().stats;
            stats.max_hp = 100.0;
            stats.speed_km_s = 5.0;
        }
        let mut state = empty_state(&content, 1);
        let faction_id = *state.factions.keys().next().unwrap();

        let system_id = state.next_id.alloc();
        state.systems.insert(
            system_id,
            StarSystem { id: system_id, name: "Home".into(), galaxy_pos: crate::vec2::Vec2::ZERO, bodies: Vec::new(), ships: Vec::new(), jump_points: Vec::new(), region_id: Id::INVALID, nebula_density: 0.0 },
        );
        let body_id = state.next_id.alloc();
        state.bodies.insert(
            body_id,
            crate::state::Body {
                id: body_id,
                system_id,
                name: "Homeworld".into(),
                body_type: crate::state::BodyType::Planet,
                orbit: crate::state::OrbitalParams { radius_mkm: 0.0, period_days: 0.0, phase_radians: 0.0 },
                position_mkm: crate::vec2::Vec2::new(5.0, 0.0),
                surface_temp_k: 288.0,
                atmosphere_atm: 1.0,
                terraform_target_temp_k: None,
                terraform_target_atm: None,
                mineral_deposits: Default::default(),
            },
        );
        let colony_id = state.next_id.alloc();
        state.colonies.insert(
            colony_id,
            crate::state::Colony {
                id: colony_id,
                faction_id,
                body_id,
                population_millions: 1.0,
                stockpile: Default::default(),
                installations: Default::default(),
                shipyard_queue: Vec::new(),
                construction_queue: Vec::new(),
                ground_forces: Default::default(),
                troop_training_queue: 0.0,
                installation_targets: Default::default(),
            },
        );

        let ship_id = state.next_id.alloc();
        state.ships.insert(
            ship_id,
            crate::state::Ship {
                id: ship_id,
                faction_id,
                system_id,
                position_mkm: crate::vec2::Vec2::ZERO,
                design_id: crate::content::ShipDesignId::from("frigate_mk1"),
                hp: 10.0,
                shields: 0.0,
                fuel: 500.0,
                cargo: Default::default(),
                troops: 0.0,
                automation: Default::default(),
                missile_reload_remaining_days: Vec::new(),
            },
        );
        let plan = compute_sustainment_plan(&state, &content, faction_id);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].actor_id, ship_id);
        assert_eq!(plan[0].target_id, colony_id);
    }

    #[test]
    fn terraform_targets_default_to_earth_normal() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let faction_id = *state.factions.keys().next().unwrap();
        let body_id = state.next_id.alloc();
        state.bodies.insert(
            body_id,
            crate::state::Body {
                id: body_id,
                system_id: Id::INVALID,
                name: "Colony World".into(),
                body_type: crate::state::BodyType::Planet,
                orbit: crate::state::OrbitalParams { radius_mkm: 0.0, period_days: 0.0, phase_radians: 0.0 },
                position_mkm: crate::vec2::Vec2::ZERO,
                surface_temp_k: 250.0,
                atmosphere_atm: 0.3,
                terraform_target_temp_k: None,
                terraform_target_atm: None,
                mineral_deposits: Default::default(),
            },
        );
        let colony_id = state.next_id.alloc();
        state.colonies.insert(
            colony_id,
            crate::state::Colony {
                id: colony_id,
                faction_id,
                body_id,
                population_millions: 1.0,
                stockpile: Default::default(),
                installations: Default::default(),
                shipyard_queue: Vec::new(),
                construction_queue: Vec::new(),
                ground_forces: Default::default(),
                troop_training_queue: 0.0,
                installation_targets: Default::default(),
            },
        );
        run_terraform_target_assignment(&mut state);
        assert_eq!(state.bodies[&body_id].terraform_target_temp_k, Some(288.0));
    }
}
