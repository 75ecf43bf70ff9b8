//! Mining planner: assigns idle auto-mine ships to the most valuable
//! reachable mineral deposit, or has them deliver cargo home if already
//! loaded. Scored as `expected_tons / max(0.25, total_days)`; asteroids and
//! comets get a mild bonus since they're the traditional mobile-mining
//! target.

use std::collections::HashSet;

use crate::content::{GameContent, ResourceId};
use crate::id::Id;
use crate::routing::{plan_jump_route, RoutingContext};
use crate::state::{BodyType, GameState};
use crate::vec2::Vec2;

const MIN_TONS: f64 = 1.0;
const ASTEROID_COMET_BONUS: f64 = 1.25;

#[derive(Debug, Clone, PartialEq)]
pub enum MineAssignmentKind {
    DeliverCargo,
    MineAndDeliver,
}

#[derive(Debug, Clone)]
pub struct MineAssignment {
    pub ship_id: Id,
    pub kind: MineAssignmentKind,
    pub body_id: Option<Id>,
    pub dest_colony_id: Option<Id>,
    pub mineral: Option<ResourceId>,
    pub expected_tons: f64,
    pub eta_total_days: f64,
}

fn cargo_used_tons(cargo: &crate::content::TonsMap) -> f64 {
    cargo.values().sum()
}

fn deposit_tons_for(body: &crate::state::Body, mineral: &Option<ResourceId>) -> f64 {
    if body.mineral_deposits.is_empty() {
        return 1e30;
    }
    match mineral {
        None => body.mineral_deposits.values().filter(|&&v| v > 0.0).sum(),
        Some(m) => body.mineral_deposits.get(m).copied().unwrap_or(0.0).max(0.0),
    }
}

pub fn compute_mine_plan(state: &GameState, content: &GameContent, faction_id: Id, speed_mkm_per_day: f64) -> Vec<MineAssignment> {
    let colony_ids: Vec<Id> = state.colonies.iter().filter(|(_, c)| c.faction_id == faction_id).map(|(&id, _)| id).collect();

    let ship_ids: Vec<Id> = state
        .ships
        .iter()
        .filter(|(_, s)| s.faction_id == faction_id && s.automation.auto_mine)
        .map(|(&id, _)| id)
        .collect();

    if ship_ids.is_empty() {
        return Vec::new();
    }

    let routing_ctx = RoutingContext { systems: &state.systems, jump_points: &state.jump_points };
    let mut reserved_bodies: HashSet<Id> = HashSet::new();
    let mut assignments = Vec::new();

    for ship_id in ship_ids {
        let Some(ship) = state.ships.get(&ship_id) else { continue };
        let design_stats = content
            .designs
            .get(&ship.design_id)
            .map(|d| &d.stats)
            .or_else(|| state.custom_designs.get(&ship.design_id).map(|d| &d.stats));
        let Some(stats) = design_stats else { continue };
        if stats.mining_tons_per_day <= 0.0 || stats.cargo_tons < MIN_TONS {
            continue;
        }

        let cargo_used = cargo_used_tons(&ship.cargo);
        let cargo_free = (stats.cargo_tons - cargo_used).max(0.0);

        if cargo_used > 1e-6 {
            let Some(&dest) = colony_ids.first() else { continue };
            assignments.push(MineAssignment {
                ship_id,
                kind: MineAssignmentKind::DeliverCargo,
                body_id: None,
                dest_colony_id: Some(dest),
                mineral: None,
                expected_tons: 0.0,
                eta_total_days: 0.0,
            });
            continue;
        }

        let desired_mineral = ship.automation.auto_mine_mineral.clone();
        let dest_colony = ship.automation.home_colony.filter(|c| colony_ids.contains(c)).or_else(|| colony_ids.first().copied());
        let dest_pos_sys = dest_colony.and_then(|cid| state.colonies.get(&cid)).and_then(|c| state.bodies.get(&c.body_id)).map(|b| (b.system_id, b.position_mkm));

        let mut best: Option<(Id, f64, f64, f64)> = None; // body_id, expected, eta_total, score
        for (&body_id, body) in &state.bodies {
            if reserved_bodies.contains(&body_id) || body.body_type == BodyType::Star {
                continue;
            }
            let deposit = deposit_tons_for(body, &desired_mineral);
            if deposit < MIN_TONS {
                continue;
            }
            let expected = deposit.min(cargo_free);
            if expected <= 1e-9 {
                continue;
            }
            let mine_days = expected / stats.mining_tons_per_day.max(1e-6);
            let Some(route_to_mine) = plan_jump_route(&routing_ctx, ship.system_id, ship.position_mkm, speed_mkm_per_day, body.system_id, body.position_mkm, None) else {
                continue;
            };
            let eta_to_dest = match dest_pos_sys {
                Some((sys, pos)) => match plan_jump_route(&routing_ctx, body.system_id, body.position_mkm, speed_mkm_per_day, sys, pos, None) {
                    Some(r) => r.eta_days,
                    None => continue,
                },
                None => 0.0,
            };
            let total_days = route_to_mine.eta_days + mine_days + eta_to_dest;
            let mut score = expected / total_days.max(0.25);
            if matches!(body.body_type, BodyType::Asteroid | BodyType::Comet) {
                score *= ASTEROID_COMET_BONUS;
            }
            let better = match &best {
                None => true,
                Some((_, _, _, best_score)) => score > *best_score,
            };
            if better {
                best = Some((body_id, expected, total_days, score));
            }
        }

        if let Some((body_id, expected, total_days, _)) = best {
            reserved_bodies.insert(body_id);
            assignments.push(MineAssignment {
                ship_id,
                kind: MineAssignmentKind::MineAndDeliver,
                body_id: Some(body_id),
                dest_colony_id: dest_colony,
                mineral: desired_mineral,
                expected_tons: expected,
                eta_total_days: total_days,
            });
        }
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, empty_state};
    use crate::state::{Body, OrbitalParams, StarSystem};
    use std::collections::HashMap;

    #[test]
    fn idle_miner_targets_richest_reachable_body() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let faction_id = *state.factions.keys().next().unwrap();

        let system_id = state.next_id.alloc();
        state.systems.insert(
            system_id,
            StarSystem { id: system_id, name: "Home".into(), galaxy_pos: Vec2::ZERO, bodies: Vec::new(), ships: Vec::new(), jump_points: Vec::new(), region_id: Id::INVALID, nebula_density: 0.0 },
        );
        let body_id = state.next_id.alloc();
        state.bodies.insert(
            body_id,
            Body {
                id: body_id,
                system_id,
                name: "Rock".into(),
                body_type: BodyType::Asteroid,
                orbit: OrbitalParams { radius_mkm: 0.0, period_days: 0.0, phase_radians: 0.0 },
                position_mkm: Vec2::new(5.0, 0.0),
                surface_temp_k: 200.0,
                atmosphere_atm: 0.0,
                terraform_target_temp_k: None,
                terraform_target_atm: None,
                mineral_deposits: HashMap::from([(ResourceId::from("duranium"), 500.0)]),
            },
        );
        state.systems.get_mut(&system_id).unwrap().bodies.push(body_id);

        let ship_id = state.next_id.alloc();
        state.ships.insert(
            ship_id,
            crate::state::Ship {
                id: ship_id,
                faction_id,
                system_id,
                position_mkm: Vec2::ZERO,
                design_id: crate::content::ShipDesignId::from("surveyor_mk1"),
                hp: 10.0,
                shields: 0.0,
                fuel: 500.0,
                cargo: HashMap::new(),
                troops: 0.0,
                automation: crate::state::ShipAutomation { auto_mine: true, ..Default::default() },
                missile_reload_remaining_days: Vec::new(),
            },
        );

        let plan = compute_mine_plan(&state, &content, faction_id, 5.0 * 86.4);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].body_id, Some(body_id));
        assert_eq!(plan[0].kind, MineAssignmentKind::MineAndDeliver);
    }
}
