//! Victory check: last-faction-standing and score-threshold conditions.
//! Fires at most once; sets `GameState.victory_state` and emits the
//! terminal event on the tick the condition first holds.

use crate::content::GameContent;
use crate::id::Id;
use crate::state::{EventLevel, GameState, VictoryReason};

pub fn run_victory_check(state: &mut GameState, _content: &GameContent) {
    if !state.victory_rules.enabled || state.victory_state.game_over {
        return;
    }

    if state.victory_rules.elimination_enabled {
        if let Some(winner) = check_last_faction_standing(state) {
            declare_victory(state, winner, VictoryReason::LastFactionStanding);
            return;
        }
    }

    if let Some(winner) = check_score_threshold(state) {
        declare_victory(state, winner, VictoryReason::ScoreThreshold);
    }
}

fn check_last_faction_standing(state: &GameState) -> Option<Id> {
    let contenders: Vec<Id> = state
        .factions
        .keys()
        .copied()
        .filter(|id| !state.victory_rules.exclude_pirates || !is_pirate(state, *id))
        .filter(|id| !state.victory_rules.elimination_requires_colony || has_colony(state, *id))
        .collect();
    if contenders.len() == 1 {
        Some(contenders[0])
    } else {
        None
    }
}

fn is_pirate(state: &GameState, faction_id: Id) -> bool {
    matches!(
        state.factions.get(&faction_id).map(|f| f.control_mode),
        Some(crate::state::ControlMode::AiPirate)
    )
}

fn has_colony(state: &GameState, faction_id: Id) -> bool {
    state.colonies.values().any(|c| c.faction_id == faction_id)
}

fn check_score_threshold(state: &GameState) -> Option<Id> {
    state
        .factions
        .keys()
        .copied()
        .find(|&id| score_for_faction(state, id) >= state.victory_rules.score_threshold)
}

fn score_for_faction(state: &GameState, faction_id: Id) -> f64 {
    let colony_score: f64 = state
        .colonies
        .values()
        .filter(|c| c.faction_id == faction_id)
        .map(|c| c.population_millions * 1000.0)
        .sum();
    let research_score = state.factions.get(&faction_id).map(|f| f.known_techs.len() as f64 * 500.0).unwrap_or(0.0);
    colony_score + research_score
}

fn declare_victory(state: &mut GameState, winner: Id, reason: VictoryReason) {
    state.victory_state.game_over = true;
    state.victory_state.winner_faction_id = Some(winner);
    state.victory_state.reason = Some(reason);
    if !state.victory_state.terminal_event_emitted {
        state.victory_state.terminal_event_emitted = true;
        state.emit(EventLevel::Info, "victory", format!("Faction {winner} wins ({reason:?})"));
    }
}
