//! Contract lifecycle tick: expiry of unaccepted offers, completion
//! detection for accepted contracts, and reward payout. Distinct from the
//! contract *planner* (`planners::contract`), which decides what to offer.

use crate::content::{GameContent, ShipRole};
use crate::id::Id;
use crate::orders::Order;
use crate::state::{Contract, ContractKind, ContractStatus, EventLevel, GameState};

const SURVEY_COMPLETE_DAYS: f64 = 100.0;
const CONTRACT_EXPIRY_DAYS: f64 = 30.0;
const ANOMALY_REWARD_RP: f64 = 100.0;
const SURVEY_REWARD_RP: f64 = 60.0;
const ESCORT_REWARD_RP: f64 = 40.0;
const SALVAGE_REWARD_RP_PER_TON: f64 = 0.5;

pub fn run_contracts_tick(state: &mut GameState, content: &GameContent) {
    let day = state.day_fraction();
    let contract_ids: Vec<Id> = state.contracts.keys().copied().collect();

    for contract_id in contract_ids {
        let Some(contract) = state.contracts.get(&contract_id) else { continue };
        match contract.status {
            ContractStatus::Offered => {
                if day >= contract.expires_day {
                    state.contracts.get_mut(&contract_id).unwrap().status = ContractStatus::Expired;
                }
            }
            ContractStatus::Accepted => {
                if is_complete(state, contract_id) {
                    complete_contract(state, contract_id, day);
                } else if day >= contract.expires_day {
                    state.contracts.get_mut(&contract_id).unwrap().status = ContractStatus::Failed;
                }
            }
            _ => {}
        }
    }

    generate_contracts(state, content, day);
}

fn has_open_contract_for(state: &GameState, kind: ContractKind, target_id: Id) -> bool {
    state
        .contracts
        .values()
        .any(|c| c.kind == kind && c.target_id == target_id && matches!(c.status, ContractStatus::Offered | ContractStatus::Accepted))
}

fn offer_contract(
    state: &mut GameState,
    faction_id: Id,
    kind: ContractKind,
    target_id: Id,
    target_id2: Option<Id>,
    reward_research_points: f64,
    risk_estimate: f64,
    hops_estimate: u32,
    day: f64,
) {
    let id = state.next_id.alloc();
    state.contracts.insert(
        id,
        Contract {
            id,
            kind,
            status: ContractStatus::Offered,
            issuer_faction_id: faction_id,
            assignee_faction_id: Some(faction_id),
            assigned_ship_id: None,
            target_id,
            target_id2,
            reward_research_points,
            risk_estimate,
            hops_estimate,
            offered_day: day,
            accepted_day: None,
            expires_day: day + CONTRACT_EXPIRY_DAYS,
            resolved_day: None,
        },
    );
}

/// Surfaces fresh work for factions: unresolved anomalies, salvageable
/// wrecks, unsurveyed jump points, and unescorted freighters mid-jump
/// become `Offered` contracts the faction's own idle ships can then pick
/// up via `planners::contract`. One contract per target per faction; a
/// target already covered by an open contract isn't re-offered.
fn generate_contracts(state: &mut GameState, content: &GameContent, day: f64) {
    let faction_ids: Vec<Id> = state.factions.keys().copied().collect();

    for faction_id in faction_ids {
        let discovered = state.factions[&faction_id].discovered_systems.clone();

        let anomaly_ids: Vec<Id> = state
            .anomalies
            .iter()
            .filter(|(_, a)| a.resolution_faction_id.is_none() && discovered.contains(&a.system_id))
            .map(|(&id, _)| id)
            .collect();
        for anomaly_id in anomaly_ids {
            if has_open_contract_for(state, ContractKind::InvestigateAnomaly, anomaly_id) {
                continue;
            }
            offer_contract(state, faction_id, ContractKind::InvestigateAnomaly, anomaly_id, None, ANOMALY_REWARD_RP, 0.1, 1, day);
        }

        let wreck_ids: Vec<Id> = state
            .wrecks
            .iter()
            .filter(|(_, w)| discovered.contains(&w.system_id) && w.minerals.values().any(|&t| t > 0.0))
            .map(|(&id, _)| id)
            .collect();
        for wreck_id in wreck_ids {
            if has_open_contract_for(state, ContractKind::SalvageWreck, wreck_id) {
                continue;
            }
            let total_tons: f64 = state.wrecks[&wreck_id].minerals.values().sum();
            offer_contract(state, faction_id, ContractKind::SalvageWreck, wreck_id, None, total_tons * SALVAGE_REWARD_RP_PER_TON, 0.05, 0, day);
        }

        let jump_point_ids: Vec<Id> = state
            .jump_points
            .iter()
            .filter(|(_, jp)| discovered.contains(&jp.system_id) && jp.survey_progress.get(&faction_id).copied().unwrap_or(0.0) < SURVEY_COMPLETE_DAYS)
            .map(|(&id, _)| id)
            .collect();
        for jp_id in jump_point_ids {
            if has_open_contract_for(state, ContractKind::SurveyJumpPoint, jp_id) {
                continue;
            }
            offer_contract(state, faction_id, ContractKind::SurveyJumpPoint, jp_id, None, SURVEY_REWARD_RP, 0.0, 0, day);
        }

        let escort_targets: Vec<(Id, Id)> = state
            .ships
            .iter()
            .filter(|(_, s)| s.faction_id == faction_id)
            .filter_map(|(&ship_id, ship)| {
                if state.fleets.values().any(|f| f.ship_ids.contains(&ship_id)) {
                    return None;
                }
                let role = content
                    .designs
                    .get(&ship.design_id)
                    .map(|d| d.role)
                    .or_else(|| state.custom_designs.get(&ship.design_id).map(|d| d.role))?;
                if role != ShipRole::Freighter {
                    return None;
                }
                let Some(Order::TravelViaJump { jump_id }) = state.ship_orders.get(&ship_id).and_then(|o| o.queue.front()) else {
                    return None;
                };
                let dest_system = state
                    .jump_points
                    .get(jump_id)
                    .and_then(|jp| state.jump_points.get(&jp.linked_jump_id))
                    .map(|dest_jp| dest_jp.system_id)?;
                Some((ship_id, dest_system))
            })
            .collect();
        for (ship_id, dest_system) in escort_targets {
            if has_open_contract_for(state, ContractKind::EscortConvoy, ship_id) {
                continue;
            }
            offer_contract(state, faction_id, ContractKind::EscortConvoy, ship_id, Some(dest_system), ESCORT_REWARD_RP, 0.15, 1, day);
        }
    }
}

fn is_complete(state: &GameState, contract_id: Id) -> bool {
    let Some(contract) = state.contracts.get(&contract_id) else { return false };
    let Some(assignee) = contract.assignee_faction_id else { return false };
    match contract.kind {
        ContractKind::InvestigateAnomaly => state
            .anomalies
            .get(&contract.target_id)
            .is_some_and(|a| a.resolution_faction_id == Some(assignee)),
        ContractKind::SalvageWreck => !state.wrecks.contains_key(&contract.target_id),
        ContractKind::SurveyJumpPoint => state
            .jump_points
            .get(&contract.target_id)
            .and_then(|jp| jp.survey_progress.get(&assignee))
            .is_some_and(|&p| p >= SURVEY_COMPLETE_DAYS),
        ContractKind::EscortConvoy => {
            let Some(ship_id) = contract.assigned_ship_id else { return false };
            let Some(dest_system) = contract.target_id2 else { return false };
            state.ships.get(&ship_id).is_some_and(|s| s.system_id == dest_system)
        }
    }
}

fn complete_contract(state: &mut GameState, contract_id: Id, day: f64) {
    let Some(contract) = state.contracts.get_mut(&contract_id) else { return };
    contract.status = ContractStatus::Completed;
    contract.resolved_day = Some(day);
    let reward = contract.reward_research_points;
    let Some(assignee) = contract.assignee_faction_id else { return };
    if let Some(faction) = state.factions.get_mut(&assignee) {
        faction.research_points += reward;
    }
    state.emit(
        EventLevel::Info,
        "contracts",
        format!("Contract {contract_id} completed by faction {assignee}, reward {reward}"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, empty_state};
    use crate::state::{Anomaly, AnomalyKind};
    use crate::vec2::Vec2;

    fn make_contract(state: &mut GameState, target_id: Id, assignee: Id) -> Id {
        let id = state.next_id.alloc();
        state.contracts.insert(
            id,
            crate::state::Contract {
                id,
                kind: ContractKind::InvestigateAnomaly,
                status: ContractStatus::Accepted,
                issuer_faction_id: assignee,
                assignee_faction_id: Some(assignee),
                assigned_ship_id: None,
                target_id,
                target_id2: None,
                reward_research_points: 50.0,
                risk_estimate: 0.1,
                hops_estimate: 1,
                offered_day: 0.0,
                accepted_day: Some(0.0),
                expires_day: 10.0,
                resolved_day: None,
            },
        );
        id
    }

    #[test]
    fn resolved_anomaly_completes_contract_and_pays_reward() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let faction_id = *state.factions.keys().next().unwrap();
        let anomaly_id = state.next_id.alloc();
        state.anomalies.insert(
            anomaly_id,
            Anomaly {
                id: anomaly_id,
                system_id: Id::INVALID,
                position_mkm: Vec2::ZERO,
                kind: AnomalyKind::Ruins,
                lead_chain: Vec::new(),
                resolution_faction_id: Some(faction_id),
                investigation_progress: 100.0,
            },
        );
        let contract_id = make_contract(&mut state, anomaly_id, faction_id);
        run_contracts_tick(&mut state, &content);
        assert_eq!(state.contracts[&contract_id].status, ContractStatus::Completed);
        assert!((state.factions[&faction_id].research_points - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unresolved_contract_expires_after_deadline() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let faction_id = *state.factions.keys().next().unwrap();
        let contract_id = make_contract(&mut state, Id(999), faction_id);
        state.date_days = 20;
        run_contracts_tick(&mut state, &content);
        assert_eq!(state.contracts[&contract_id].status, ContractStatus::Failed);
    }

    #[test]
    fn unresolved_discovered_anomaly_generates_an_offered_contract() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let faction_id = *state.factions.keys().next().unwrap();
        let system_id = state.next_id.alloc();
        state.factions.get_mut(&faction_id).unwrap().discovered_systems.insert(system_id);
        let anomaly_id = state.next_id.alloc();
        state.anomalies.insert(
            anomaly_id,
            Anomaly {
                id: anomaly_id,
                system_id,
                position_mkm: Vec2::ZERO,
                kind: AnomalyKind::Ruins,
                lead_chain: Vec::new(),
                resolution_faction_id: None,
                investigation_progress: 0.0,
            },
        );

        run_contracts_tick(&mut state, &content);

        let generated = state
            .contracts
            .values()
            .find(|c| c.kind == ContractKind::InvestigateAnomaly && c.target_id == anomaly_id);
        assert!(generated.is_some());
        assert_eq!(generated.unwrap().status, ContractStatus::Offered);

        // Running the tick again must not offer a second contract for the same anomaly.
        run_contracts_tick(&mut state, &content);
        let count = state.contracts.values().filter(|c| c.kind == ContractKind::InvestigateAnomaly && c.target_id == anomaly_id).count();
        assert_eq!(count, 1);
    }
}
