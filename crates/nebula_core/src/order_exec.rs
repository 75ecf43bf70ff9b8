//! Order executor.
//!
//! Each ship processes the head of its queue for the current tick. Orders
//! are state-machine nodes that either stay active (consuming time) or
//! complete (are popped).

use crate::content::{DesignStats, GameContent, TonsMap};
use crate::id::Id;
use crate::intercept::compute_intercept_aim;
use crate::orders::Order;
use crate::state::{EventLevel, GameState, Wreck};
use crate::vec2::Vec2;

const ARRIVAL_EPS_MKM: f64 = 0.01;
pub(crate) const MKM_PER_KM_S_DAY: f64 = 86.4;
const MINE_RANGE_MKM: f64 = 1.0;
const TRANSFER_RANGE_MKM: f64 = 1.0;
const JUMP_RADIUS_MKM: f64 = 0.5;

fn design_stats<'a>(state: &'a GameState, content: &'a GameContent, design_id: &crate::content::ShipDesignId) -> Option<&'a DesignStats> {
    content
        .designs
        .get(design_id)
        .map(|d| &d.stats)
        .or_else(|| state.custom_designs.get(design_id).map(|d| &d.stats))
}

/// Per-resource construction cost used to compute scrap/wreck refunds.
/// Ships carry no cost table of their own, so this borrows the cost table
/// of the first shipyard-capable installation in the content db — the same
/// table `advance_shipyard` charges against when it builds a ship.
pub(crate) fn refund_cost_table(content: &GameContent) -> Option<&TonsMap> {
    content.installations.values().find(|d| d.build_rate_tons_per_day > 0.0).map(|d| &d.build_costs_per_ton)
}

/// Moves a ship toward `target_pos` (tracking `target_vel` via the intercept
/// solver), consuming fuel. Returns `true` once within `ARRIVAL_EPS_MKM`.
fn advance_toward(state: &mut GameState, content: &GameContent, ship_id: Id, target_pos: Vec2, target_vel: Vec2, hours: f64) -> bool {
    let Some(ship) = state.ships.get(&ship_id) else {
        return true;
    };
    let design_id = ship.design_id.clone();
    let Some(stats) = design_stats(state, content, &design_id) else {
        return true;
    };
    let speed_mkm_per_day = stats.speed_km_s * MKM_PER_KM_S_DAY;
    let fuel_use_per_mkm = stats.fuel_use_per_mkm;
    let pos = ship.position_mkm;

    if pos.distance(target_pos) <= ARRIVAL_EPS_MKM {
        return true;
    }

    let aim = compute_intercept_aim(pos, speed_mkm_per_day, target_pos, target_vel, 0.0, 3650.0);
    let heading = if aim.has_solution {
        aim.aim_position.sub(pos).normalize()
    } else {
        target_pos.sub(pos).normalize()
    };

    let max_travel_mkm = speed_mkm_per_day * (hours / 24.0);
    let remaining = pos.distance(target_pos);
    let step = max_travel_mkm.min(remaining);

    let fuel_needed = fuel_use_per_mkm * step;
    let ship = state.ships.get_mut(&ship_id).unwrap();
    if fuel_needed > 0.0 && ship.fuel < fuel_needed {
        let affordable_step = if fuel_use_per_mkm > 0.0 { ship.fuel / fuel_use_per_mkm } else { 0.0 };
        ship.position_mkm = ship.position_mkm.add(heading.scale(affordable_step));
        ship.fuel = 0.0;
        state.emit(EventLevel::Warn, "fuel", format!("Ship {ship_id} ran out of fuel"));
        return false;
    }
    ship.position_mkm = ship.position_mkm.add(heading.scale(step));
    ship.fuel -= fuel_needed;
    ship.position_mkm.distance(target_pos) <= ARRIVAL_EPS_MKM
}

/// Exposed for the combat pass: advances a ship toward a pursuit target
/// without consuming/popping any order.
pub fn move_ship_toward_for_combat(state: &mut GameState, content: &GameContent, ship_id: Id, target_pos: Vec2, hours: f64) {
    advance_toward(state, content, ship_id, target_pos, Vec2::ZERO, hours);
}

/// Runs one tick's worth (`hours`) of order execution for every ship,
/// ascending by id for determinism.
pub fn execute_ship_orders(state: &mut GameState, content: &GameContent, hours: f64, scrap_recovery_rate: f64) {
    let ship_ids: Vec<Id> = state.ships.keys().copied().collect();
    for ship_id in ship_ids {
        step_ship(state, content, ship_id, hours, scrap_recovery_rate);
    }
}

fn step_ship(state: &mut GameState, content: &GameContent, ship_id: Id, hours: f64, scrap_recovery_rate: f64) {
    let Some(head) = state
        .ship_orders
        .get(&ship_id)
        .and_then(|o| o.queue.front())
        .cloned()
    else {
        return;
    };

    let completed = match head {
        Order::MoveToPoint { destination } => advance_toward(state, content, ship_id, destination, Vec2::ZERO, hours),
        Order::MoveToBody { body_id } => match state.bodies.get(&body_id).map(|b| b.position_mkm) {
            Some(body_pos) => advance_toward(state, content, ship_id, body_pos, Vec2::ZERO, hours),
            None => true,
        },
        Order::TravelViaJump { jump_id } => match state.jump_points.get(&jump_id).map(|j| j.position_mkm) {
            Some(jp_pos) => {
                let arrived = advance_toward(state, content, ship_id, jp_pos, Vec2::ZERO, hours);
                if arrived
                    && state
                        .ships
                        .get(&ship_id)
                        .map(|s| s.position_mkm.distance(jp_pos) <= JUMP_RADIUS_MKM)
                        .unwrap_or(false)
                {
                    teleport_through_jump(state, ship_id, jump_id);
                }
                arrived
            }
            None => true,
        },
        Order::AttackShip { .. } => true, // The combat pass handles engagement; this order just keeps the ship present.
        Order::MineBody { body_id, mineral, stop_when_cargo_full } => mine_body(state, content, ship_id, body_id, &mineral, stop_when_cargo_full, hours),
        Order::SalvageWreck { wreck_id } => salvage_wreck(state, content, ship_id, wreck_id, hours),
        Order::LoadMineral { colony_id, mineral, tons } => {
            load_mineral(state, colony_id, ship_id, mineral, tons);
            true
        }
        Order::UnloadMineral { colony_id, mineral, tons } => {
            unload_mineral(state, colony_id, ship_id, mineral, tons);
            true
        }
        Order::OrbitBody { body_id, duration_days, elapsed_days } => orbit_body(state, ship_id, body_id, duration_days, elapsed_days, hours),
        Order::WaitDays { days, elapsed_days } => wait_days(state, ship_id, days, elapsed_days, hours),
        Order::TransferCargoToShip { target_ship_id, mineral, tons } => {
            transfer_cargo(state, ship_id, target_ship_id, mineral, tons);
            true
        }
        Order::TransferFuelToShip { target_ship_id, tons } => {
            transfer_fuel(state, ship_id, target_ship_id, tons);
            true
        }
        Order::TransferTroopsToShip { target_ship_id, troops } => {
            transfer_troops(state, ship_id, target_ship_id, troops);
            true
        }
        Order::EscortShip { target_ship_id } => {
            let target_pos = state.ships.get(&target_ship_id).map(|s| s.position_mkm);
            match target_pos {
                Some(pos) => {
                    advance_toward(state, content, ship_id, pos, Vec2::ZERO, hours);
                    false
                }
                None => true,
            }
        }
        Order::SurveyJumpPoint { jump_id, progress_days } => survey_jump_point(state, content, ship_id, jump_id, progress_days, hours),
        Order::ScrapShip { colony_id } => scrap_ship(state, content, ship_id, colony_id, hours, scrap_recovery_rate),
    };

    if completed {
        if let Some(orders) = state.ship_orders.get_mut(&ship_id) {
            orders.queue.pop_front();
            orders.maybe_reenqueue_repeat();
        }
    } else {
        // Non-terminal orders that mutate themselves (dwell timers) need to
        // write their progress back into the queue head.
        rewrite_progress(state, ship_id, &head, hours);
    }
}

fn rewrite_progress(state: &mut GameState, ship_id: Id, original: &Order, hours: f64) {
    let Some(orders) = state.ship_orders.get_mut(&ship_id) else {
        return;
    };
    let Some(head) = orders.queue.front_mut() else {
        return;
    };
    match (head, original) {
        (Order::OrbitBody { elapsed_days, .. }, Order::OrbitBody { .. }) => *elapsed_days += hours / 24.0,
        (Order::WaitDays { elapsed_days, .. }, Order::WaitDays { .. }) => *elapsed_days += hours / 24.0,
        (Order::SurveyJumpPoint { progress_days, .. }, Order::SurveyJumpPoint { .. }) => {
            let sensor_power = 1.0;
            *progress_days += sensor_power * (hours / 24.0);
        }
        _ => {}
    }
}

fn teleport_through_jump(state: &mut GameState, ship_id: Id, jump_id: Id) {
    let Some(linked_id) = state.jump_points.get(&jump_id).map(|j| j.linked_jump_id) else {
        return;
    };
    if !linked_id.is_valid() {
        return;
    }
    let Some(linked) = state.jump_points.get(&linked_id) else {
        return;
    };
    let (new_system, new_pos) = (linked.system_id, linked.position_mkm);

    if let Some(ship) = state.ships.get_mut(&ship_id) {
        let old_system = ship.system_id;
        ship.system_id = new_system;
        ship.position_mkm = new_pos;
        let faction_id = ship.faction_id;
        if let Some(sys) = state.systems.get_mut(&old_system) {
            sys.ships.retain(|&s| s != ship_id);
        }
        if let Some(sys) = state.systems.get_mut(&new_system) {
            sys.ships.push(ship_id);
        }
        if let Some(faction) = state.factions.get_mut(&faction_id) {
            faction.discovered_systems.insert(new_system);
        }
    }
    state.emit(EventLevel::Info, "jump", format!("Ship {ship_id} transited jump {jump_id}"));
}

fn mine_body(state: &mut GameState, content: &GameContent, ship_id: Id, body_id: Id, mineral: &crate::content::ResourceId, stop_when_cargo_full: bool, hours: f64) -> bool {
    let Some(body_pos) = state.bodies.get(&body_id).map(|b| b.position_mkm) else {
        return true;
    };
    let Some(ship) = state.ships.get(&ship_id) else {
        return true;
    };
    if ship.position_mkm.distance(body_pos) > MINE_RANGE_MKM {
        advance_toward(state, content, ship_id, body_pos, Vec2::ZERO, hours);
        return false;
    }
    let design_id = ship.design_id.clone();
    let Some(stats) = design_stats(state, content, &design_id) else {
        return true;
    };
    let rate_tons_per_day = stats.mining_tons_per_day;
    let cargo_cap = stats.cargo_tons;
    let mined = rate_tons_per_day * (hours / 24.0);

    let Some(body) = state.bodies.get_mut(&body_id) else {
        return true;
    };
    let deposit_unlimited = body.mineral_deposits.is_empty();
    let available = if deposit_unlimited {
        mined
    } else {
        body.mineral_deposits.get(mineral).copied().unwrap_or(0.0).min(mined)
    };
    if !deposit_unlimited {
        if let Some(entry) = body.mineral_deposits.get_mut(mineral) {
            *entry -= available;
        }
    }
    let deposit_exhausted = !deposit_unlimited && body.mineral_deposits.get(mineral).copied().unwrap_or(0.0) <= 0.0;

    let ship = state.ships.get_mut(&ship_id).unwrap();
    let current_cargo: f64 = ship.cargo.values().sum();
    let room = (cargo_cap - current_cargo).max(0.0);
    let loaded = available.min(room);
    *ship.cargo.entry(mineral.clone()).or_insert(0.0) += loaded;
    let cargo_now_full = stop_when_cargo_full && (current_cargo + loaded) >= cargo_cap - 1e-9;

    cargo_now_full || deposit_exhausted
}

fn salvage_wreck(state: &mut GameState, content: &GameContent, ship_id: Id, wreck_id: Id, hours: f64) -> bool {
    let Some(wreck_pos) = state.wrecks.get(&wreck_id).map(|w| w.position_mkm) else {
        return true;
    };
    let Some(ship) = state.ships.get(&ship_id) else {
        return true;
    };
    if ship.position_mkm.distance(wreck_pos) > MINE_RANGE_MKM {
        advance_toward(state, content, ship_id, wreck_pos, Vec2::ZERO, hours);
        return false;
    }
    let design_id = ship.design_id.clone();
    let Some(stats) = design_stats(state, content, &design_id) else {
        return true;
    };
    let cargo_cap = stats.cargo_tons;
    let rate = (0.5_f64).max(0.02 * cargo_cap);
    let amount = rate * (hours / 24.0);

    let Some(wreck) = state.wrecks.get_mut(&wreck_id) else {
        return true;
    };
    let mut done = true;
    let keys: Vec<_> = wreck.minerals.keys().cloned().collect();
    let mut taken_total = 0.0;
    for key in keys {
        let avail = wreck.minerals.get(&key).copied().unwrap_or(0.0);
        if avail <= 0.0 {
            continue;
        }
        let take = avail.min(amount - taken_total);
        if take <= 0.0 {
            continue;
        }
        *wreck.minerals.get_mut(&key).unwrap() -= take;
        taken_total += take;
        if let Some(ship) = state.ships.get_mut(&ship_id) {
            *ship.cargo.entry(key).or_insert(0.0) += take;
        }
        if taken_total >= amount {
            break;
        }
    }
    let remaining: f64 = wreck.minerals.values().sum();
    if remaining > 1e-9 {
        done = false;
    }
    if done {
        state.wrecks.remove(&wreck_id);
    }
    done
}

fn load_mineral(state: &mut GameState, colony_id: Id, ship_id: Id, mineral: Option<crate::content::ResourceId>, tons: f64) {
    let Some(colony) = state.colonies.get_mut(&colony_id) else {
        return;
    };
    let keys: Vec<_> = match &mineral {
        Some(m) => vec![m.clone()],
        None => colony.stockpile.keys().cloned().collect(),
    };
    let mut moved = 0.0;
    for key in keys {
        if tons > 0.0 && moved >= tons {
            break;
        }
        let avail = colony.stockpile.get(&key).copied().unwrap_or(0.0);
        let want = if tons > 0.0 { (tons - moved).min(avail) } else { avail };
        if want <= 0.0 {
            continue;
        }
        *colony.stockpile.get_mut(&key).unwrap() -= want;
        moved += want;
        if let Some(ship) = state.ships.get_mut(&ship_id) {
            *ship.cargo.entry(key).or_insert(0.0) += want;
        }
    }
}

fn unload_mineral(state: &mut GameState, colony_id: Id, ship_id: Id, mineral: Option<crate::content::ResourceId>, tons: f64) {
    let Some(ship) = state.ships.get_mut(&ship_id) else {
        return;
    };
    let keys: Vec<_> = match &mineral {
        Some(m) => vec![m.clone()],
        None => ship.cargo.keys().cloned().collect(),
    };
    let mut moved = 0.0;
    for key in keys {
        if tons > 0.0 && moved >= tons {
            break;
        }
        let avail = ship.cargo.get(&key).copied().unwrap_or(0.0);
        let want = if tons > 0.0 { (tons - moved).min(avail) } else { avail };
        if want <= 0.0 {
            continue;
        }
        *ship.cargo.get_mut(&key).unwrap() -= want;
        moved += want;
        if let Some(colony) = state.colonies.get_mut(&colony_id) {
            *colony.stockpile.entry(key).or_insert(0.0) += want;
        }
    }
}

fn orbit_body(state: &mut GameState, ship_id: Id, body_id: Id, duration_days: f64, elapsed_days: f64, hours: f64) -> bool {
    let Some(body_pos) = state.bodies.get(&body_id).map(|b| b.position_mkm) else {
        return true;
    };
    if let Some(ship) = state.ships.get_mut(&ship_id) {
        ship.position_mkm = body_pos;
    }
    if duration_days < 0.0 {
        return false;
    }
    (elapsed_days + hours / 24.0) >= duration_days
}

fn wait_days(_state: &mut GameState, _ship_id: Id, days: f64, elapsed_days: f64, hours: f64) -> bool {
    (elapsed_days + hours / 24.0) >= days
}

fn transfer_cargo(state: &mut GameState, from: Id, to: Id, mineral: Option<crate::content::ResourceId>, tons: f64) {
    let in_range = same_system_in_range(state, from, to);
    if !in_range {
        return;
    }
    let Some(from_ship) = state.ships.get(&from) else { return };
    let keys: Vec<_> = match &mineral {
        Some(m) => vec![m.clone()],
        None => from_ship.cargo.keys().cloned().collect(),
    };
    let mut moved = 0.0;
    for key in keys {
        if tons > 0.0 && moved >= tons {
            break;
        }
        let avail = state.ships.get(&from).and_then(|s| s.cargo.get(&key)).copied().unwrap_or(0.0);
        let want = if tons > 0.0 { (tons - moved).min(avail) } else { avail };
        if want <= 0.0 {
            continue;
        }
        if let Some(s) = state.ships.get_mut(&from) {
            *s.cargo.get_mut(&key).unwrap() -= want;
        }
        if let Some(s) = state.ships.get_mut(&to) {
            *s.cargo.entry(key).or_insert(0.0) += want;
        }
        moved += want;
    }
}

fn transfer_fuel(state: &mut GameState, from: Id, to: Id, tons: f64) {
    if !same_system_in_range(state, from, to) {
        return;
    }
    let Some(from_ship) = state.ships.get(&from) else { return };
    let amount = if tons > 0.0 { tons.min(from_ship.fuel) } else { from_ship.fuel };
    if let Some(s) = state.ships.get_mut(&from) {
        s.fuel -= amount;
    }
    if let Some(s) = state.ships.get_mut(&to) {
        s.fuel += amount;
    }
}

fn transfer_troops(state: &mut GameState, from: Id, to: Id, troops: f64) {
    if !same_system_in_range(state, from, to) {
        return;
    }
    let Some(from_ship) = state.ships.get(&from) else { return };
    let amount = if troops > 0.0 { troops.min(from_ship.troops) } else { from_ship.troops };
    if let Some(s) = state.ships.get_mut(&from) {
        s.troops -= amount;
    }
    if let Some(s) = state.ships.get_mut(&to) {
        s.troops += amount;
    }
}

fn same_system_in_range(state: &GameState, a: Id, b: Id) -> bool {
    let (Some(sa), Some(sb)) = (state.ships.get(&a), state.ships.get(&b)) else {
        return false;
    };
    sa.system_id == sb.system_id && sa.position_mkm.distance(sb.position_mkm) <= TRANSFER_RANGE_MKM
}

fn survey_jump_point(state: &mut GameState, content: &GameContent, ship_id: Id, jump_id: Id, progress_days: f64, hours: f64) -> bool {
    let Some(jp_pos) = state.jump_points.get(&jump_id).map(|j| j.position_mkm) else {
        return true;
    };
    let Some(ship) = state.ships.get(&ship_id) else {
        return true;
    };
    if ship.position_mkm.distance(jp_pos) > MINE_RANGE_MKM {
        advance_toward(state, content, ship_id, jp_pos, Vec2::ZERO, hours);
        return false;
    }
    const SURVEY_THRESHOLD_DAYS: f64 = 5.0;
    if progress_days + hours / 24.0 >= SURVEY_THRESHOLD_DAYS {
        if let Some(ship) = state.ships.get(&ship_id) {
            let faction_id = ship.faction_id;
            let system_id = state.jump_points.get(&jump_id).map(|j| j.system_id);
            if let (Some(faction), Some(system_id)) = (state.factions.get_mut(&faction_id), system_id) {
                faction.discovered_systems.insert(system_id);
                if let Some(linked) = state.jump_points.get(&jump_id).map(|j| j.linked_jump_id) {
                    if let Some(linked_sys) = state.jump_points.get(&linked).map(|j| j.system_id) {
                        state.factions.get_mut(&faction_id).unwrap().discovered_systems.insert(linked_sys);
                    }
                }
            }
        }
        return true;
    }
    false
}

fn scrap_ship(state: &mut GameState, content: &GameContent, ship_id: Id, colony_id: Id, hours: f64, recovery_rate: f64) -> bool {
    let Some(colony_body) = state.colonies.get(&colony_id).map(|c| c.body_id) else {
        return true;
    };
    let Some(colony_pos) = state.bodies.get(&colony_body).map(|b| b.position_mkm) else {
        return true;
    };
    let Some(ship) = state.ships.get(&ship_id) else {
        return true;
    };
    if ship.position_mkm.distance(colony_pos) > MINE_RANGE_MKM {
        advance_toward(state, content, ship_id, colony_pos, Vec2::ZERO, hours);
        return false;
    }

    let design_id = ship.design_id.clone();
    let mass_tons = design_stats(state, content, &design_id).map(|s| s.mass_tons).unwrap_or(0.0);
    let refund = refund_cost_table(content).map(|costs| {
        costs
            .iter()
            .map(|(res, &cost_per_ton)| (res.clone(), cost_per_ton * mass_tons * recovery_rate))
            .collect::<Vec<_>>()
    });
    if let Some(colony) = state.colonies.get_mut(&colony_id) {
        for (res, tons) in refund.into_iter().flatten() {
            *colony.stockpile.entry(res).or_insert(0.0) += tons;
        }
    }
    state.ships.remove(&ship_id);
    state.ship_orders.remove(&ship_id);
    state.emit(EventLevel::Info, "scrap", format!("Ship {ship_id} scrapped at colony {colony_id}"));
    true
}

/// Creates a `Wreck` at a destroyed ship's last position, used by the
/// combat pass. `recovery_rate` mirrors `scrap_ship`'s refund, inverting
/// `build_costs_per_ton` per resource instead of paying out a single
/// flat-fraction metals lump sum.
pub fn spawn_wreck_for_destroyed_ship(state: &mut GameState, content: &GameContent, ship_id: Id, recovery_rate: f64) {
    let Some(ship) = state.ships.get(&ship_id) else {
        return;
    };
    let (system_id, position_mkm, design_id) = (ship.system_id, ship.position_mkm, ship.design_id.clone());
    let mass_tons = design_stats(state, content, &design_id).map(|s| s.mass_tons).unwrap_or(0.0);
    let wreck_id = state.next_id.alloc();
    let minerals: std::collections::HashMap<_, _> = refund_cost_table(content)
        .map(|costs| costs.iter().map(|(res, &cost_per_ton)| (res.clone(), cost_per_ton * mass_tons * recovery_rate)).collect())
        .unwrap_or_default();
    state.wrecks.insert(
        wreck_id,
        Wreck {
            id: wreck_id,
            system_id,
            position_mkm,
            minerals,
        },
    );
    state.ships.remove(&ship_id);
    state.ship_orders.remove(&ship_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ResourceId;
    use crate::state::{Body, BodyType, OrbitalParams};
    use crate::test_fixtures::{base_content, empty_state};

    fn place_surveyor(state: &mut GameState, content: &GameContent, pos: Vec2) -> Id {
        let id = state.next_id.alloc();
        state.ships.insert(
            id,
            crate::state::Ship {
                id,
                faction_id: state.factions.keys().next().copied().unwrap(),
                system_id: Id::INVALID,
                position_mkm: pos,
                design_id: content.designs.get(&crate::content::ShipDesignId::from("surveyor_mk1")).unwrap().id.clone(),
                hp: 10.0,
                shields: 0.0,
                fuel: 1000.0,
                cargo: Default::default(),
                troops: 0.0,
                automation: Default::default(),
                missile_reload_remaining_days: Vec::new(),
            },
        );
        state.ship_orders.insert(id, ShipOrders::default());
        id
    }

    #[test]
    fn wait_days_completes_after_elapsed_time() {
        let mut content = base_content();
        content.recompute_design_stats();
        let mut state = empty_state(&content, 1);
        let ship_id = place_surveyor(&mut state, &content, Vec2::ZERO);
        state.ship_orders.get_mut(&ship_id).unwrap().queue.push_back(Order::WaitDays { days: 1.0, elapsed_days: 0.0 });

        execute_ship_orders(&mut state, &content, 12.0, 0.5);
        assert_eq!(state.ship_orders[&ship_id].queue.len(), 1);
        execute_ship_orders(&mut state, &content, 12.0, 0.5);
        assert!(state.ship_orders[&ship_id].queue.is_empty());
    }

    #[test]
    fn move_to_point_consumes_fuel_and_advances_position() {
        let mut content = base_content();
        content.recompute_design_stats();
        let mut state = empty_state(&content, 1);
        let ship_id = place_surveyor(&mut state, &content, Vec2::ZERO);
        state
            .ship_orders
            .get_mut(&ship_id)
            .unwrap()
            .queue
            .push_back(Order::MoveToPoint { destination: Vec2::new(1000.0, 0.0) });

        let fuel_before = state.ships[&ship_id].fuel;
        execute_ship_orders(&mut state, &content, 24.0, 0.5);
        let ship = &state.ships[&ship_id];
        assert!(ship.position_mkm.x > 0.0);
        assert!(ship.fuel < fuel_before);
    }

    #[test]
    fn mine_body_fills_cargo_and_stops_when_full() {
        let mut content = base_content();
        content.recompute_design_stats();
        let mut state = empty_state(&content, 1);
        let body_id = state.next_id.alloc();
        state.bodies.insert(
            body_id,
            Body {
                id: body_id,
                system_id: Id::INVALID,
                name: "Rock".to_string(),
                body_type: BodyType::Asteroid,
                orbit: OrbitalParams { radius_mkm: 0.0, period_days: 0.0, phase_radians: 0.0 },
                position_mkm: Vec2::ZERO,
                surface_temp_k: 200.0,
                atmosphere_atm: 0.0,
                terraform_target_temp_k: None,
                terraform_target_atm: None,
                mineral_deposits: std::collections::HashMap::new(),
            },
        );
        let ship_id = place_surveyor(&mut state, &content, Vec2::ZERO);
        state.ship_orders.get_mut(&ship_id).unwrap().queue.push_back(Order::MineBody {
            body_id,
            mineral: ResourceId::from("duranium"),
            stop_when_cargo_full: true,
        });

        // cargo_hold cap is 200 tons, mining rate 10 t/day. 30 days fills it.
        for _ in 0..40 {
            execute_ship_orders(&mut state, &content, 24.0, 0.5);
            if state.ship_orders[&ship_id].queue.is_empty() {
                break;
            }
        }
        let total: f64 = state.ships[&ship_id].cargo.values().sum();
        assert!(total <= 200.0 + 1e-6);
        assert!(total >= 200.0 - 1e-6);
        assert!(state.ship_orders[&ship_id].queue.is_empty());
    }
}
