//! State validator/fixer.
//!
//! Ground truth for the checks and their message wording:
//! `examples/original_source/src/core/state_validation.cpp`. The validator
//! never mutates; `fix_game_state` is the only repair path and is
//! idempotent.

use std::collections::BTreeSet;

use crate::content::GameContent;
use crate::id::Id;
use crate::state::GameState;

/// Returns a sorted list of human-readable issues. Empty means the state is
/// internally consistent.
pub fn validate_game_state(state: &GameState, content: &GameContent) -> Vec<String> {
    let mut errors = Vec::new();

    for (&id, ship) in &state.ships {
        if ship.system_id.is_valid() && !state.systems.contains_key(&ship.system_id) {
            errors.push(format!("Ship {id} references unknown system_id {}", ship.system_id.0));
        }
        if !content.designs.contains_key(&ship.design_id) && !state.custom_designs.contains_key(&ship.design_id) {
            errors.push(format!("Ship {id} references unknown design_id {}", ship.design_id));
        }
    }

    for (&id, sys) in &state.systems {
        for &body_id in &sys.bodies {
            match state.bodies.get(&body_id) {
                Some(b) if b.system_id != id => {
                    errors.push(format!("System {id} lists body {} whose system_id is {}", body_id.0, b.system_id.0));
                }
                None => errors.push(format!("System {id} lists unknown body {}", body_id.0)),
                _ => {}
            }
        }
        for &ship_id in &sys.ships {
            match state.ships.get(&ship_id) {
                Some(s) if s.system_id != id => {
                    errors.push(format!("System {id} lists ship {} whose system_id is {}", ship_id.0, s.system_id.0));
                }
                None => errors.push(format!("System {id} lists unknown ship {}", ship_id.0)),
                _ => {}
            }
        }
        for &jp_id in &sys.jump_points {
            match state.jump_points.get(&jp_id) {
                Some(j) if j.system_id != id => {
                    errors.push(format!("System {id} lists jump point {} whose system_id is {}", jp_id.0, j.system_id.0));
                }
                None => errors.push(format!("System {id} lists unknown jump point {}", jp_id.0)),
                _ => {}
            }
        }
    }

    for (&id, jp) in &state.jump_points {
        if !jp.linked_jump_id.is_valid() {
            continue;
        }
        if jp.linked_jump_id == id {
            errors.push(format!("Jump point {id} links to itself"));
            continue;
        }
        match state.jump_points.get(&jp.linked_jump_id) {
            Some(other) if other.linked_jump_id != id => {
                errors.push(format!("Jump point {id} links to {} but that link is not mutual", jp.linked_jump_id.0));
            }
            None => errors.push(format!("Jump point {id} links to unknown jump point {}", jp.linked_jump_id.0)),
            _ => {}
        }
    }

    let max_id = [
        state.systems.keys().max(),
        state.bodies.keys().max(),
        state.jump_points.keys().max(),
        state.ships.keys().max(),
        state.colonies.keys().max(),
        state.factions.keys().max(),
        state.fleets.keys().max(),
        state.regions.keys().max(),
        state.anomalies.keys().max(),
        state.wrecks.keys().max(),
        state.contracts.keys().max(),
    ]
    .into_iter()
    .flatten()
    .max()
    .copied()
    .unwrap_or(Id::INVALID);
    if state.next_id.peek_next() <= max_id.0 {
        errors.push(format!(
            "next_id {} is not greater than max existing id {}",
            state.next_id.peek_next(),
            max_id.0
        ));
    }

    let max_seq = state.events.iter().map(|e| e.seq).max().unwrap_or(0);
    if !state.events.is_empty() && state.next_event_seq <= max_seq {
        errors.push(format!("next_event_seq {} is not greater than max existing seq {max_seq}", state.next_event_seq));
    }

    let mut ship_fleet_count: std::collections::HashMap<Id, u32> = std::collections::HashMap::new();
    for (&id, fleet) in &state.fleets {
        for &ship_id in &fleet.ship_ids {
            *ship_fleet_count.entry(ship_id).or_insert(0) += 1;
            if !state.ships.contains_key(&ship_id) {
                errors.push(format!("Fleet {id} references unknown ship {}", ship_id.0));
            }
        }
        if let Some(leader) = fleet.leader_ship_id {
            if !fleet.ship_ids.contains(&leader) {
                errors.push(format!("Fleet {id} leader {} is not a member of the fleet", leader.0));
            }
        }
    }
    for (ship_id, count) in ship_fleet_count {
        if count > 1 {
            errors.push(format!("Ship {} belongs to {count} fleets (must be at most 1)", ship_id.0));
        }
    }

    for (&id, faction) in &state.factions {
        let mut seen = BTreeSet::new();
        for &sys_id in &faction.discovered_systems {
            if !seen.insert(sys_id) {
                errors.push(format!("Faction {id} has duplicate discovered_systems entry {}", sys_id.0));
            }
            if !state.systems.contains_key(&sys_id) {
                errors.push(format!("Faction {id} discovered_systems references unknown system {}", sys_id.0));
            }
        }
        if let Some(active) = &faction.active_research_id {
            if !content.techs.contains_key(active) {
                errors.push(format!("Faction {id} active_research_id references unknown tech {active}"));
            }
        }
        for tech in &faction.research_queue {
            if !content.techs.contains_key(tech) {
                errors.push(format!("Faction {id} research_queue references unknown tech {tech}"));
            }
        }
    }

    if let Some(cycle_tech) = find_tech_cycle(content) {
        errors.push(format!("Tech prereq graph contains a cycle reachable from {cycle_tech}"));
    }

    for (&id, colony) in &state.colonies {
        if !state.bodies.contains_key(&colony.body_id) {
            errors.push(format!("Colony {id} references unknown body_id {}", colony.body_id.0));
        }
        if !state.factions.contains_key(&colony.faction_id) {
            errors.push(format!("Colony {id} references unknown faction_id {}", colony.faction_id.0));
        }
        for inst_id in colony.installations.keys() {
            if !content.installations.contains_key(inst_id) {
                errors.push(format!("Colony {id} references unknown installation {inst_id}"));
            }
        }
        for resource_id in colony.stockpile.keys() {
            if !content.resources.contains_key(resource_id) {
                errors.push(format!("Colony {id} stockpile references unknown resource {resource_id}"));
            }
        }
    }

    errors.sort();
    errors
}

fn find_tech_cycle(content: &GameContent) -> Option<String> {
    use std::collections::HashMap;
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        id: &'a str,
        content: &'a GameContent,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> bool {
        match marks.get(id) {
            Some(Mark::Done) => return false,
            Some(Mark::Visiting) => return true,
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        if let Some(def) = content.techs.get(&crate::content::TechDefId(id.to_string())) {
            for prereq in &def.prereqs {
                if visit(&prereq.0, content, marks) {
                    return true;
                }
            }
        }
        marks.insert(id, Mark::Done);
        false
    }

    for id in content.techs.keys() {
        if visit(&id.0, content, &mut marks) {
            return Some(id.0.clone());
        }
    }
    None
}

/// Idempotent repair pass: drops dangling references and restores the
/// invariants the validator checks. Running it twice produces identical
/// state after the first pass, and re-validating yields no errors.
pub fn fix_game_state(state: &mut GameState, content: &GameContent) {
    let stray_ship_ids: Vec<Id> = state
        .ships
        .iter()
        .filter(|(_, s)| !content.designs.contains_key(&s.design_id) && !state.custom_designs.contains_key(&s.design_id))
        .map(|(&id, _)| id)
        .collect();
    for id in &stray_ship_ids {
        state.ships.remove(id);
        state.ship_orders.remove(id);
    }
    for sys in state.systems.values_mut() {
        sys.ships.retain(|s| !stray_ship_ids.contains(s));
    }
    for fleet in state.fleets.values_mut() {
        for id in &stray_ship_ids {
            fleet.ship_ids.remove(id);
        }
        if fleet.leader_ship_id.is_some_and(|l| stray_ship_ids.contains(&l)) {
            fleet.leader_ship_id = None;
        }
    }

    for ship in state.ships.values_mut() {
        if ship.system_id.is_valid() && !state.systems.contains_key(&ship.system_id) {
            ship.system_id = Id::INVALID;
        }
    }

    let stray_colony_ids: Vec<Id> = state
        .colonies
        .iter()
        .filter(|(_, c)| !state.bodies.contains_key(&c.body_id) || !state.factions.contains_key(&c.faction_id))
        .map(|(&id, _)| id)
        .collect();
    for id in stray_colony_ids {
        state.colonies.remove(&id);
    }

    for colony in state.colonies.values_mut() {
        colony.installations.retain(|inst_id, _| content.installations.contains_key(inst_id));
        colony.stockpile.retain(|resource_id, _| content.resources.contains_key(resource_id));
    }

    for sys in state.systems.values_mut() {
        sys.bodies.retain(|b| state.bodies.get(b).is_some_and(|body| body.system_id == sys.id));
        sys.ships.retain(|s| state.ships.get(s).is_some_and(|ship| ship.system_id == sys.id));
        sys.jump_points.retain(|j| state.jump_points.get(j).is_some_and(|jp| jp.system_id == sys.id));
    }

    let jump_ids: Vec<Id> = state.jump_points.keys().copied().collect();
    for id in jump_ids {
        let linked = state.jump_points.get(&id).map(|j| j.linked_jump_id);
        if let Some(linked) = linked {
            if !linked.is_valid() {
                continue;
            }
            let mutual = state
                .jump_points
                .get(&linked)
                .map(|other| other.linked_jump_id == id)
                .unwrap_or(false);
            if !mutual || linked == id {
                if let Some(jp) = state.jump_points.get_mut(&id) {
                    jp.linked_jump_id = Id::INVALID;
                }
            }
        }
    }

    let mut seen_in_fleet: std::collections::HashSet<Id> = std::collections::HashSet::new();
    for fleet in state.fleets.values_mut() {
        fleet.ship_ids.retain(|s| state.ships.contains_key(s));
        fleet.ship_ids.retain(|s| seen_in_fleet.insert(*s));
        if let Some(leader) = fleet.leader_ship_id {
            if !fleet.ship_ids.contains(&leader) {
                fleet.leader_ship_id = None;
            }
        }
    }

    for faction in state.factions.values_mut() {
        let mut seen = BTreeSet::new();
        faction.discovered_systems.retain(|s| state.systems.contains_key(s) && seen.insert(*s));
        if let Some(active) = &faction.active_research_id {
            if !content.techs.contains_key(active) {
                faction.active_research_id = None;
                faction.active_research_progress = 0.0;
            }
        }
        faction.research_queue.retain(|t| content.techs.contains_key(t));
    }

    let max_id = [
        state.systems.keys().max(),
        state.bodies.keys().max(),
        state.jump_points.keys().max(),
        state.ships.keys().max(),
        state.colonies.keys().max(),
        state.factions.keys().max(),
        state.fleets.keys().max(),
        state.regions.keys().max(),
        state.anomalies.keys().max(),
        state.wrecks.keys().max(),
        state.contracts.keys().max(),
    ]
    .into_iter()
    .flatten()
    .max()
    .copied()
    .unwrap_or(Id::INVALID);
    state.next_id.observe(max_id);

    if let Some(max_seq) = state.events.iter().map(|e| e.seq).max() {
        if state.next_event_seq <= max_seq {
            state.next_event_seq = max_seq + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::content::ResourceId;
    use crate::test_fixtures::base_content;
    use crate::test_fixtures::empty_state;

    #[test]
    fn clean_state_has_no_errors() {
        let content = base_content();
        let state = empty_state(&content, 1);
        assert!(validate_game_state(&state, &content).is_empty());
    }

    #[test]
    fn dangling_ship_system_is_reported_and_fixed() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let ship_id = state.next_id.alloc();
        state.ships.insert(
            ship_id,
            crate::state::Ship {
                id: ship_id,
                faction_id: Id::INVALID,
                system_id: Id(999_999),
                position_mkm: crate::vec2::Vec2::ZERO,
                design_id: content.designs.keys().next().unwrap().clone(),
                hp: 10.0,
                shields: 0.0,
                fuel: 0.0,
                cargo: Default::default(),
                troops: 0.0,
                automation: Default::default(),
                missile_reload_remaining_days: Vec::new(),
            },
        );
        let errors = validate_game_state(&state, &content);
        assert!(errors.iter().any(|e| e.contains(&format!("references unknown system_id {}", 999_999))));

        fix_game_state(&mut state, &content);
        assert!(validate_game_state(&state, &content).is_empty());
    }

    #[test]
    fn dangling_ship_design_is_fixed() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let ship_id = state.next_id.alloc();
        state.ships.insert(
            ship_id,
            crate::state::Ship {
                id: ship_id,
                faction_id: Id::INVALID,
                system_id: Id::INVALID,
                position_mkm: crate::vec2::Vec2::ZERO,
                design_id: crate::content::ShipDesignId::from("no_such_design"),
                hp: 10.0,
                shields: 0.0,
                fuel: 0.0,
                cargo: Default::default(),
                troops: 0.0,
                automation: Default::default(),
                missile_reload_remaining_days: Vec::new(),
            },
        );
        let errors = validate_game_state(&state, &content);
        assert!(errors.iter().any(|e| e.contains("unknown design_id")));

        fix_game_state(&mut state, &content);
        assert!(!state.ships.contains_key(&ship_id));
        assert!(validate_game_state(&state, &content).is_empty());
    }

    #[test]
    fn dangling_colony_references_are_fixed() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let colony_id = state.next_id.alloc();
        state.colonies.insert(
            colony_id,
            crate::state::Colony {
                id: colony_id,
                faction_id: Id(999_999),
                body_id: Id(999_999),
                population_millions: 1.0,
                stockpile: HashMap::from([(ResourceId::from("no_such_resource"), 5.0)]),
                installations: HashMap::from([(crate::content::InstallationDefId::from("no_such_installation"), 1)]),
                shipyard_queue: Vec::new(),
                construction_queue: Vec::new(),
                ground_forces: Default::default(),
                troop_training_queue: 0.0,
                installation_targets: HashMap::new(),
            },
        );
        let errors = validate_game_state(&state, &content);
        assert!(errors.iter().any(|e| e.contains("unknown body_id")));
        assert!(errors.iter().any(|e| e.contains("unknown faction_id")));
        assert!(errors.iter().any(|e| e.contains("unknown installation")));
        assert!(errors.iter().any(|e| e.contains("unknown resource")));

        fix_game_state(&mut state, &content);
        assert!(!state.colonies.contains_key(&colony_id));
        assert!(validate_game_state(&state, &content).is_empty());
    }

    #[test]
    fn fixer_is_idempotent() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        fix_game_state(&mut state, &content);
        let once = serde_json::to_string(&state).unwrap();
        fix_game_state(&mut state, &content);
        let twice = serde_json::to_string(&state).unwrap();
        assert_eq!(once, twice);
    }
}
