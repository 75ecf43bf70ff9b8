//! Diplomacy drift: relation scores ease back toward a neutral baseline
//! each tick, absent any event that pushes them away from it.

use crate::content::GameContent;
use crate::id::Id;
use crate::state::GameState;

const NEUTRAL_BASELINE: f64 = 0.0;
const DRIFT_RATE_PER_DAY: f64 = 0.5;

pub fn run_diplomacy_tick(state: &mut GameState, _content: &GameContent, hours: f64) {
    let day_frac = hours / 24.0;
    let faction_ids: Vec<Id> = state.factions.keys().copied().collect();
    for faction_id in faction_ids {
        let Some(faction) = state.factions.get_mut(&faction_id) else { continue };
        for score in faction.diplomacy.values_mut() {
            let delta = (NEUTRAL_BASELINE - *score).clamp(-DRIFT_RATE_PER_DAY * day_frac, DRIFT_RATE_PER_DAY * day_frac);
            *score += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, empty_state};

    #[test]
    fn relation_drifts_toward_neutral() {
        let content = base_content();
        let mut state = empty_state(&content, 1);
        let faction_id = *state.factions.keys().next().unwrap();
        let other = state.next_id.alloc();
        state.factions.get_mut(&faction_id).unwrap().diplomacy.insert(other, -10.0);
        run_diplomacy_tick(&mut state, &content, 24.0);
        let score = state.factions[&faction_id].diplomacy[&other];
        assert!(score > -10.0 && score <= -9.5);
    }
}
