//! Colony economy: installation production/consumption, shipyards,
//! construction queues, terraforming, troop training.

use crate::content::{GameContent, ResourceId};
use crate::id::Id;
use crate::state::{EventLevel, GameState, Ship, ShipAutomation};
use crate::vec2::Vec2;

pub fn run_colony_economy_tick(state: &mut GameState, content: &GameContent, hours: f64) {
    let day_frac = hours / 24.0;
    let colony_ids: Vec<Id> = state.colonies.keys().copied().collect();
    for colony_id in colony_ids {
        run_production(state, content, colony_id, day_frac);
        run_terraforming(state, content, colony_id, day_frac);
        run_troop_training(state, content, colony_id, day_frac);
        advance_shipyard(state, content, colony_id, day_frac);
        advance_construction(state, content, colony_id, day_frac);
        auto_construct(state, colony_id);
    }
}

fn run_production(state: &mut GameState, content: &GameContent, colony_id: Id, day_frac: f64) {
    let Some(colony) = state.colonies.get(&colony_id) else { return };
    let body_id = colony.body_id;
    let installations: Vec<(crate::content::InstallationDefId, u32)> =
        colony.installations.iter().map(|(k, &v)| (k.clone(), v)).collect();

    let mut research_output = 0.0;

    for (inst_id, multiplicity) in installations {
        let Some(def) = content.installations.get(&inst_id) else { continue };
        let m = f64::from(multiplicity);

        let satisfiable = def.consumes_per_day.iter().all(|(res, &per_day)| {
            let need = per_day * m * day_frac;
            if need <= 0.0 {
                return true;
            }
            state.colonies[&colony_id].stockpile.get(res).copied().unwrap_or(0.0) >= need
        });

        if satisfiable && !def.consumes_per_day.is_empty() {
            let colony = state.colonies.get_mut(&colony_id).unwrap();
            for (res, &per_day) in &def.consumes_per_day {
                *colony.stockpile.entry(res.clone()).or_insert(0.0) -= per_day * m * day_frac;
            }
            for (res, &per_day) in &def.produces_per_day {
                *colony.stockpile.entry(res.clone()).or_insert(0.0) += per_day * m * day_frac;
            }
        } else if def.consumes_per_day.is_empty() {
            let colony = state.colonies.get_mut(&colony_id).unwrap();
            for (res, &per_day) in &def.produces_per_day {
                *colony.stockpile.entry(res.clone()).or_insert(0.0) += per_day * m * day_frac;
            }
        }

        if def.mining_tons_per_day > 0.0 {
            mine_colony_deposit(state, colony_id, body_id, def.mining_tons_per_day * m * day_frac);
        }

        research_output += def.research_points_per_day * m * day_frac;
    }

    if research_output > 0.0 {
        let faction_id = state.colonies[&colony_id].faction_id;
        if let Some(faction) = state.factions.get_mut(&faction_id) {
            if faction.active_research_id.is_some() {
                faction.active_research_progress += research_output;
            } else {
                faction.research_points += research_output;
            }
        }
    }
}

fn mine_colony_deposit(state: &mut GameState, _colony_id: Id, body_id: Id, tons: f64) {
    let Some(body) = state.bodies.get_mut(&body_id) else { return };
    if body.mineral_deposits.is_empty() {
        // Unlimited deposit: pick any mineable resource to emit, defaulting
        // to Duranium, matching the base-content scenario.
        let colony = state.colonies.get_mut(&_colony_id);
        if let Some(colony) = colony {
            *colony.stockpile.entry(ResourceId::from("duranium")).or_insert(0.0) += tons;
        }
        return;
    }
    let total: f64 = body.mineral_deposits.values().sum();
    if total <= 0.0 {
        return;
    }
    let shares: Vec<(ResourceId, f64)> = body
        .mineral_deposits
        .iter()
        .map(|(k, &v)| (k.clone(), v / total))
        .collect();
    for (res, share) in shares {
        let take = (tons * share).min(body.mineral_deposits.get(&res).copied().unwrap_or(0.0));
        if let Some(entry) = body.mineral_deposits.get_mut(&res) {
            *entry -= take;
        }
        if let Some(colony) = state.colonies.get_mut(&_colony_id) {
            *colony.stockpile.entry(res).or_insert(0.0) += take;
        }
    }
}

fn run_terraforming(state: &mut GameState, content: &GameContent, colony_id: Id, day_frac: f64) {
    let Some(colony) = state.colonies.get(&colony_id) else { return };
    let body_id = colony.body_id;
    let points_per_day: f64 = colony
        .installations
        .iter()
        .filter_map(|(id, &mult)| content.installations.get(id).map(|d| d.terraforming_points_per_day * f64::from(mult)))
        .sum();
    if points_per_day <= 0.0 {
        return;
    }
    // Terraforming points step surface_temp_k (K) and atmosphere_atm (atm)
    // toward their targets, 1 point per unit per day for each dimension.
    let max_delta = points_per_day * day_frac;

    let Some(body) = state.bodies.get_mut(&body_id) else { return };
    if let Some(target_temp) = body.terraform_target_temp_k {
        let delta = (target_temp - body.surface_temp_k).clamp(-max_delta, max_delta);
        body.surface_temp_k += delta;
    }
    if let Some(target_atm) = body.terraform_target_atm {
        let delta = (target_atm - body.atmosphere_atm).clamp(-max_delta, max_delta);
        body.atmosphere_atm += delta;
    }
}

fn run_troop_training(state: &mut GameState, content: &GameContent, colony_id: Id, day_frac: f64) {
    let Some(colony) = state.colonies.get(&colony_id) else { return };
    let rate: f64 = colony
        .installations
        .iter()
        .filter_map(|(id, &mult)| content.installations.get(id).map(|d| d.troop_training_points_per_day * f64::from(mult)))
        .sum();
    let gained = rate * day_frac;
    if gained <= 0.0 {
        return;
    }
    let colony = state.colonies.get_mut(&colony_id).unwrap();
    colony.troop_training_queue += gained;
    // 1 training point == 1 trained trooper, a simplifying but explicit
    // conversion since content doesn't specify a different ratio.
    let whole = colony.troop_training_queue.floor();
    if whole > 0.0 {
        colony.ground_forces.troops += whole;
        colony.troop_training_queue -= whole;
    }
}

fn advance_shipyard(state: &mut GameState, content: &GameContent, colony_id: Id, day_frac: f64) {
    let Some(colony) = state.colonies.get(&colony_id) else { return };
    if colony.shipyard_queue.is_empty() {
        return;
    }
    let rate: f64 = colony
        .installations
        .iter()
        .filter_map(|(id, &mult)| content.installations.get(id).map(|d| d.build_rate_tons_per_day * f64::from(mult)))
        .sum();
    if rate <= 0.0 {
        return;
    }
    let tons_step = rate * day_frac;

    let Some(build_costs) = colony
        .installations
        .keys()
        .find_map(|id| content.installations.get(id).filter(|d| d.build_rate_tons_per_day > 0.0))
        .map(|d| d.build_costs_per_ton.clone())
    else {
        return;
    };

    let affordable = build_costs
        .iter()
        .filter(|(_, &cost)| cost > 0.0)
        .map(|(res, &cost)| colony.stockpile.get(res).copied().unwrap_or(0.0) / cost)
        .fold(f64::INFINITY, f64::min);
    let tons_step = tons_step.min(affordable.max(0.0));
    if tons_step <= 0.0 {
        return;
    }

    let colony = state.colonies.get_mut(&colony_id).unwrap();
    for (res, &cost) in &build_costs {
        *colony.stockpile.entry(res.clone()).or_insert(0.0) -= cost * tons_step;
    }
    let order = colony.shipyard_queue.first_mut().unwrap();
    order.tons_remaining -= tons_step;

    if order.tons_remaining <= 1e-9 {
        let design_id = order.design_id.clone();
        colony.shipyard_queue.remove(0);
        spawn_ship(state, content, colony_id, design_id);
    }
}

fn spawn_ship(state: &mut GameState, content: &GameContent, colony_id: Id, design_id: crate::content::ShipDesignId) {
    let Some(colony) = state.colonies.get(&colony_id) else { return };
    let faction_id = colony.faction_id;
    let body_id = colony.body_id;
    let Some(body) = state.bodies.get(&body_id) else { return };
    let (system_id, position_mkm) = (body.system_id, body.position_mkm);

    let Some(stats) = content.designs.get(&design_id).map(|d| d.stats.clone()) else { return };
    let ship_id = state.next_id.alloc();
    state.ships.insert(
        ship_id,
        Ship {
            id: ship_id,
            faction_id,
            system_id,
            position_mkm,
            design_id,
            hp: stats.max_hp,
            shields: stats.max_shields,
            fuel: stats.fuel_capacity,
            cargo: Default::default(),
            troops: 0.0,
            automation: ShipAutomation::default(),
            missile_reload_remaining_days: vec![0.0; stats.missile_rack_count as usize],
        },
    );
    state.ship_orders.insert(ship_id, Default::default());
    if let Some(sys) = state.systems.get_mut(&system_id) {
        sys.ships.push(ship_id);
    }
    state.emit(EventLevel::Info, "shipyard", format!("Colony {colony_id} launched ship {ship_id}"));
}

fn advance_construction(state: &mut GameState, content: &GameContent, colony_id: Id, day_frac: f64) {
    let Some(colony) = state.colonies.get(&colony_id) else { return };
    if colony.construction_queue.is_empty() {
        return;
    }
    let cp_rate: f64 = colony
        .installations
        .iter()
        .filter_map(|(id, &mult)| content.installations.get(id).map(|d| d.construction_points_per_day * f64::from(mult)))
        .sum();
    if cp_rate <= 0.0 {
        return;
    }
    let cp_step = cp_rate * day_frac;
    let colony = state.colonies.get_mut(&colony_id).unwrap();
    let order = colony.construction_queue.first_mut().unwrap();
    order.cp_remaining -= cp_step;
    if order.cp_remaining <= 0.0 {
        let inst_id = order.installation_id.clone();
        *colony.installations.entry(inst_id).or_insert(0) += 1;
        let order = colony.construction_queue.first_mut().unwrap();
        order.quantity_remaining = order.quantity_remaining.saturating_sub(1);
        if order.quantity_remaining == 0 {
            colony.construction_queue.remove(0);
        } else {
            order.cp_remaining = order.cp_total;
        }
    }
}

fn auto_construct(state: &mut GameState, colony_id: Id) {
    let Some(colony) = state.colonies.get(&colony_id) else { return };
    let deficits: Vec<(crate::content::InstallationDefId, u32)> = colony
        .installation_targets
        .iter()
        .filter_map(|(id, &target)| {
            let current = colony.installations.get(id).copied().unwrap_or(0);
            let already_queued = colony.construction_queue.iter().any(|o| &o.installation_id == id);
            if target > current && !already_queued {
                Some((id.clone(), target - current))
            } else {
                None
            }
        })
        .collect();
    if deficits.is_empty() {
        return;
    }
    let colony = state.colonies.get_mut(&colony_id).unwrap();
    for (id, qty) in deficits {
        colony.construction_queue.push(crate::state::InstallationOrder {
            installation_id: id,
            cp_total: 100.0,
            cp_remaining: 100.0,
            quantity_remaining: qty,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, empty_state};
    use std::collections::HashMap;

    fn colony_with_smelter_and_processor(state: &mut GameState) -> Id {
        let faction_id = *state.factions.keys().next().unwrap();
        let body_id = state.next_id.alloc();
        state.bodies.insert(
            body_id,
            crate::state::Body {
                id: body_id,
                system_id: Id::INVALID,
                name: "Home".to_string(),
                body_type: crate::state::BodyType::Planet,
                orbit: crate::state::OrbitalParams { radius_mkm: 0.0, period_days: 0.0, phase_radians: 0.0 },
                position_mkm: Vec2::ZERO,
                surface_temp_k: 288.0,
                atmosphere_atm: 1.0,
                terraform_target_temp_k: None,
                terraform_target_atm: None,
                mineral_deposits: HashMap::new(),
            },
        );
        let colony_id = state.next_id.alloc();
        let mut installations = HashMap::new();
        installations.insert(crate::content::InstallationDefId::from("metal_smelter"), 1);
        installations.insert(crate::content::InstallationDefId::from("mineral_processor"), 1);
        let mut stockpile = HashMap::new();
        stockpile.insert(ResourceId::from("duranium"), 100.0);
        stockpile.insert(ResourceId::from("tritanium"), 50.0);
        stockpile.insert(ResourceId::from("boronide"), 50.0);
        stockpile.insert(ResourceId::from("corundium"), 50.0);
        stockpile.insert(ResourceId::from("gallicite"), 50.0);
        stockpile.insert(ResourceId::from("uridium"), 50.0);
        stockpile.insert(ResourceId::from("mercassium"), 50.0);
        state.colonies.insert(
            colony_id,
            crate::state::Colony {
                id: colony_id,
                faction_id,
                body_id,
                population_millions: 1.0,
                stockpile,
                installations,
                shipyard_queue: Vec::new(),
                construction_queue: Vec::new(),
                ground_forces: Default::default(),
                troop_training_queue: 0.0,
                installation_targets: HashMap::new(),
            },
        );
        colony_id
    }

    #[test]
    fn full_inputs_produce_metals_and_minerals() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let colony_id = colony_with_smelter_and_processor(&mut state);
        run_colony_economy_tick(&mut state, &content, 24.0);
        let colony = &state.colonies[&colony_id];
        assert!((colony.stockpile[&ResourceId::from("metals")] - 100.0).abs() < 1e-6);
        assert!((colony.stockpile[&ResourceId::from("minerals")] - 100.0).abs() < 1e-6);
    }

    #[test]
    fn depleted_tritanium_blocks_mineral_processor_only() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let colony_id = colony_with_smelter_and_processor(&mut state);
        state.colonies.get_mut(&colony_id).unwrap().stockpile.insert(ResourceId::from("tritanium"), 0.0);
        run_colony_economy_tick(&mut state, &content, 24.0);
        let colony = &state.colonies[&colony_id];
        assert_eq!(colony.stockpile.get(&ResourceId::from("minerals")).copied().unwrap_or(0.0), 0.0);
        assert!((colony.stockpile[&ResourceId::from("metals")] - 100.0).abs() < 1e-6);
    }
}
