//! Contract planner: pairs idle ships with open/accepted contracts. Scored
//! as `reward_rp / (total_days + 1.0)`, discounted by risk, with a small
//! role-fit bonus so e.g. combatants win escort ties over freighters.

use crate::content::GameContent;
use crate::id::Id;
use crate::routing::{plan_jump_route, RoutingContext};
use crate::state::{ContractKind, ContractStatus, GameState, ShipRole};

use super::common::{greedy_assign_by_score, Assignment};

const RISK_PENALTY: f64 = 0.5;
const HOP_OVERHEAD_DAYS: f64 = 0.25;

fn role_bonus(role: ShipRole, kind: ContractKind) -> f64 {
    match (kind, role) {
        (ContractKind::InvestigateAnomaly, ShipRole::Surveyor) => 0.20,
        (ContractKind::InvestigateAnomaly, ShipRole::Combatant) => 0.08,
        (ContractKind::SalvageWreck, ShipRole::Freighter) => 0.25,
        (ContractKind::SurveyJumpPoint, ShipRole::Surveyor) => 0.25,
        (ContractKind::SurveyJumpPoint, ShipRole::Combatant) => 0.05,
        (ContractKind::EscortConvoy, ShipRole::Combatant) => 0.25,
        (ContractKind::EscortConvoy, ShipRole::Surveyor) => 0.05,
        _ => 0.0,
    }
}

fn target_pos(state: &GameState, kind: ContractKind, target_id: Id) -> Option<(Id, crate::vec2::Vec2)> {
    match kind {
        ContractKind::InvestigateAnomaly => state.anomalies.get(&target_id).map(|a| (a.system_id, a.position_mkm)),
        ContractKind::SalvageWreck => state.wrecks.get(&target_id).map(|w| (w.system_id, w.position_mkm)),
        ContractKind::SurveyJumpPoint => state.jump_points.get(&target_id).map(|jp| (jp.system_id, jp.position_mkm)),
        ContractKind::EscortConvoy => state.ships.get(&target_id).map(|s| (s.system_id, s.position_mkm)),
    }
}

pub fn compute_contract_plan(state: &GameState, content: &GameContent, faction_id: Id) -> Vec<Assignment> {
    let routing_ctx = RoutingContext { systems: &state.systems, jump_points: &state.jump_points };

    let contract_ids: Vec<Id> = state
        .contracts
        .iter()
        .filter(|(_, c)| {
            c.assignee_faction_id == Some(faction_id)
                && matches!(c.status, ContractStatus::Offered | ContractStatus::Accepted)
        })
        .map(|(&id, _)| id)
        .collect();
    if contract_ids.is_empty() {
        return Vec::new();
    }

    let ship_ids: Vec<Id> = state
        .ships
        .iter()
        .filter(|(_, s)| {
            s.faction_id == faction_id
                && state.ship_orders.get(&s.id).map(|o| o.queue.is_empty()).unwrap_or(true)
        })
        .map(|(&id, _)| id)
        .collect();
    if ship_ids.is_empty() {
        return Vec::new();
    }

    let mut edges = Vec::new();
    for &contract_id in &contract_ids {
        let contract = &state.contracts[&contract_id];
        let Some((target_system, target_position)) = target_pos(state, contract.kind, contract.target_id) else {
            continue;
        };

        for &ship_id in &ship_ids {
            let ship = &state.ships[&ship_id];
            let stats = content
                .designs
                .get(&ship.design_id)
                .map(|d| &d.stats)
                .or_else(|| state.custom_designs.get(&ship.design_id).map(|d| &d.stats));
            let Some(stats) = stats else { continue };
            if stats.speed_km_s <= 0.0 {
                continue;
            }
            if contract.kind == ContractKind::SurveyJumpPoint && stats.sensor_range_mkm <= 0.0 {
                continue;
            }

            let speed_mkm_per_day = stats.speed_km_s * 86.4;
            let Some(route) = plan_jump_route(&routing_ctx, ship.system_id, ship.position_mkm, speed_mkm_per_day, target_system, target_position, None) else {
                continue;
            };
            let hops = route.jump_ids.len() as f64;
            let total_days = route.eta_days + HOP_OVERHEAD_DAYS * hops;

            let mut score = contract.reward_research_points / (total_days + 1.0);
            score *= (1.0 - contract.risk_estimate.clamp(0.0, 1.0) * RISK_PENALTY).max(0.0);

            let role = content.designs.get(&ship.design_id).map(|d| d.role).unwrap_or(ShipRole::Unknown);
            score *= 1.0 + role_bonus(role, contract.kind);

            edges.push(Assignment { actor_id: ship_id, target_id: contract_id, score });
        }
    }

    greedy_assign_by_score(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, empty_state};
    use crate::state::{Anomaly, AnomalyKind};
    use crate::vec2::Vec2;

    #[test]
    fn idle_surveyor_wins_investigate_contract() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let faction_id = *state.factions.keys().next().unwrap();

        let anomaly_id = state.next_id.alloc();
        state.anomalies.insert(
            anomaly_id,
            Anomaly { id: anomaly_id, system_id: Id::INVALID, position_mkm: Vec2::ZERO, kind: AnomalyKind::Ruins, lead_chain: Vec::new(), resolution_faction_id: None, investigation_progress: 0.0 },
        );
        let contract_id = state.next_id.alloc();
        state.contracts.insert(
            contract_id,
            crate::state::Contract {
                id: contract_id,
                kind: ContractKind::InvestigateAnomaly,
                status: ContractStatus::Offered,
                issuer_faction_id: faction_id,
                assignee_faction_id: Some(faction_id),
                assigned_ship_id: None,
                target_id: anomaly_id,
                target_id2: None,
                reward_research_points: 100.0,
                risk_estimate: 0.0,
                hops_estimate: 0,
                offered_day: 0.0,
                accepted_day: None,
                expires_day: 30.0,
                resolved_day: None,
            },
        );
        let ship_id = state.next_id.alloc();
        state.ships.insert(
            ship_id,
            crate::state::Ship {
                id: ship_id,
                faction_id,
                system_id: Id::INVALID,
                position_mkm: Vec2::ZERO,
                design_id: crate::content::ShipDesignId::from("surveyor_mk1"),
                hp: 10.0,
                shields: 0.0,
                fuel: 500.0,
                cargo: Default::default(),
                troops: 0.0,
                automation: Default::default(),
                missile_reload_remaining_days: Vec::new(),
            },
        );
        state.ship_orders.insert(ship_id, Default::default());

        let plan = compute_contract_plan(&state, &content, faction_id);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].actor_id, ship_id);
        assert_eq!(plan[0].target_id, contract_id);
    }
}
