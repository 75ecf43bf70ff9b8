//! Tech research: accrues research points on the active tech, unlocks
//! components/installations, and advances the queue.

use crate::content::GameContent;
use crate::state::{EventLevel, GameState};

pub fn run_research_tick(state: &mut GameState, content: &GameContent) {
    let faction_ids: Vec<_> = state.factions.keys().copied().collect();
    for faction_id in faction_ids {
        advance_active_research(state, content, faction_id);
    }
}

fn advance_active_research(state: &mut GameState, content: &GameContent, faction_id: crate::id::Id) {
    loop {
        let Some(faction) = state.factions.get_mut(&faction_id) else { return };
        if faction.active_research_id.is_none() {
            // Prereqs are enforced at dequeue time: scan for the first queued
            // tech whose prereqs are all already known rather than always
            // taking the head, so a locked tech doesn't block ones behind it.
            let idx = faction
                .research_queue
                .iter()
                .position(|tech_id| content.techs.get(tech_id).map(|t| t.prereqs.iter().all(|p| faction.known_techs.contains(p))).unwrap_or(true));
            match idx {
                Some(idx) => {
                    let next = faction.research_queue.remove(idx);
                    faction.active_research_id = Some(next);
                    faction.active_research_progress = 0.0;
                }
                None => return,
            }
        }
        let Some(tech_id) = faction.active_research_id.clone() else { return };
        let Some(tech) = content.techs.get(&tech_id) else {
            // Unknown tech id in queue/active slot: drop it rather than stall forever.
            faction.active_research_id = None;
            continue;
        };
        if faction.active_research_progress < tech.cost {
            return;
        }
        complete_tech(state, content, faction_id, &tech_id);
        let faction = state.factions.get_mut(&faction_id).unwrap();
        faction.active_research_id = None;
        faction.active_research_progress = 0.0;
    }
}

fn complete_tech(state: &mut GameState, content: &GameContent, faction_id: crate::id::Id, tech_id: &crate::content::TechDefId) {
    let Some(tech) = content.techs.get(tech_id) else { return };
    let effects = tech.effects.clone();
    let Some(faction) = state.factions.get_mut(&faction_id) else { return };
    faction.known_techs.insert(tech_id.clone());
    for effect in effects {
        match effect {
            crate::content::TechEffect::UnlockComponent { value } => {
                faction.unlocked_components.insert(crate::content::ComponentDefId::from(value.as_str()));
            }
            crate::content::TechEffect::UnlockInstallation { value } => {
                faction.unlocked_installations.insert(crate::content::InstallationDefId::from(value.as_str()));
            }
        }
    }
    state.emit(EventLevel::Info, "research", format!("Faction {faction_id} completed tech {tech_id}"));
}
