//! Exploration bookkeeping: anomaly investigation progress, wreck decay,
//! and the discovery of new anomalies/derelicts over time.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::content::GameContent;
use crate::id::Id;
use crate::state::{Anomaly, AnomalyKind, EventLevel, GameState, Wreck};

const INVESTIGATION_RATE_PER_DAY: f64 = 10.0;
const WRECK_MINERAL_DECAY_FRACTION_PER_DAY: f64 = 0.01;
const ANOMALY_SPAWN_BASE_CHANCE_PER_DAY: f64 = 0.01;
const WRECK_SPAWN_BASE_CHANCE_PER_DAY: f64 = 0.005;

pub fn run_exploration_tick(state: &mut GameState, content: &GameContent, hours: f64) {
    let day_frac = hours / 24.0;
    advance_anomaly_investigations(state, day_frac);
    decay_wrecks(state, day_frac);
    spawn_anomalies_and_wrecks(state, content, day_frac);
}

fn advance_anomaly_investigations(state: &mut GameState, day_frac: f64) {
    let anomaly_ids: Vec<Id> = state.anomalies.keys().copied().collect();
    for anomaly_id in anomaly_ids {
        let Some(anomaly) = state.anomalies.get(&anomaly_id) else { continue };
        if anomaly.resolution_faction_id.is_some() {
            continue;
        }
        let system_id = anomaly.system_id;
        let pos = anomaly.position_mkm;

        let investigator = state.ships.values().find(|s| {
            s.system_id == system_id && s.position_mkm.distance(pos) <= 1.0
        });
        let Some(investigator) = investigator else { continue };
        let faction_id = investigator.faction_id;

        let anomaly = state.anomalies.get_mut(&anomaly_id).unwrap();
        anomaly.investigation_progress += INVESTIGATION_RATE_PER_DAY * day_frac;
        if anomaly.investigation_progress >= 100.0 {
            anomaly.resolution_faction_id = Some(faction_id);
            state.emit(
                EventLevel::Info,
                "exploration",
                format!("Anomaly {anomaly_id} resolved by faction {faction_id}"),
            );
        }
    }
}

fn decay_wrecks(state: &mut GameState, day_frac: f64) {
    let mut emptied = Vec::new();
    for (id, wreck) in state.wrecks.iter_mut() {
        let mut total = 0.0;
        for amount in wreck.minerals.values_mut() {
            *amount *= 1.0 - WRECK_MINERAL_DECAY_FRACTION_PER_DAY * day_frac;
            total += *amount;
        }
        if total <= 1.0 {
            emptied.push(*id);
        }
    }
    for id in emptied {
        state.wrecks.remove(&id);
    }
}

fn pick_random_position(state: &GameState, system_id: Id, rng: &mut impl Rng) -> crate::vec2::Vec2 {
    let bodies = state.systems.get(&system_id).map(|s| s.bodies.as_slice()).unwrap_or(&[]);
    if bodies.is_empty() {
        return crate::vec2::Vec2::ZERO;
    }
    let body_id = bodies[rng.gen_range(0..bodies.len())];
    state.bodies.get(&body_id).map(|b| b.position_mkm).unwrap_or(crate::vec2::Vec2::ZERO)
}

/// Rolls, once per system per tick, a chance to surface a fresh anomaly
/// (rate scaled by the system's region `ruins_density`) and a derelict
/// wreck (rate scaled by `nebula_bias`, since dense nebulae hide debris
/// fields sensors would otherwise have already found). The roll is seeded
/// from `(state.seed, date_days, system_id)`, so it reproduces from a save
/// without needing a persisted RNG.
fn spawn_anomalies_and_wrecks(state: &mut GameState, content: &GameContent, day_frac: f64) {
    let system_ids: Vec<Id> = state.systems.keys().copied().collect();
    for system_id in system_ids {
        let Some(region_id) = state.systems.get(&system_id).map(|s| s.region_id) else { continue };
        let Some(modifiers) = state.regions.get(&region_id).map(|r| r.modifiers.clone()) else { continue };

        let seed = state.seed
            ^ (state.date_days as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ system_id.0.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        let mut rng = StdRng::seed_from_u64(seed);

        let anomaly_chance = ANOMALY_SPAWN_BASE_CHANCE_PER_DAY * modifiers.ruins_density.max(0.0) * day_frac;
        if rng.gen::<f64>() < anomaly_chance {
            let position_mkm = pick_random_position(state, system_id, &mut rng);
            let kind = match rng.gen_range(0..3) {
                0 => AnomalyKind::DerelictSignal,
                1 => AnomalyKind::SensorGhost,
                _ => AnomalyKind::Ruins,
            };
            let id = state.next_id.alloc();
            state.anomalies.insert(
                id,
                Anomaly { id, system_id, position_mkm, kind, lead_chain: Vec::new(), resolution_faction_id: None, investigation_progress: 0.0 },
            );
            state.emit(EventLevel::Info, "exploration", format!("Anomaly {id} detected in system {system_id}"));
        }

        let wreck_chance = WRECK_SPAWN_BASE_CHANCE_PER_DAY * (1.0 + modifiers.nebula_bias.max(0.0)) * day_frac;
        if rng.gen::<f64>() < wreck_chance {
            let mut mineable: Vec<_> = content.resources.values().filter(|r| r.mineable).map(|r| r.id.clone()).collect();
            mineable.sort();
            if mineable.is_empty() {
                continue;
            }
            let position_mkm = pick_random_position(state, system_id, &mut rng);
            let mut minerals = HashMap::new();
            for res in mineable.into_iter().take(2) {
                minerals.insert(res, rng.gen_range(5.0..30.0));
            }
            let id = state.next_id.alloc();
            state.wrecks.insert(id, Wreck { id, system_id, position_mkm, minerals });
            state.emit(EventLevel::Info, "exploration", format!("Derelict wreck {id} drifting in system {system_id}"));
        }
    }
}
