//! Threshold rules evaluated against recent [`MetricsSnapshot`] history,
//! each firing a `SimEvent` into the game log on rising/falling edge.

use std::collections::{HashSet, VecDeque};

use nebula_core::metrics::MetricsSnapshot;
use nebula_core::state::{EventLevel, GameState};

#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertDetail {
    pub id: String,
    pub severity: String,
    pub message: String,
    pub suggested_action: String,
}

type RuleFn = fn(&VecDeque<MetricsSnapshot>) -> bool;

struct AlertRule {
    id: &'static str,
    severity: &'static str,
    check: RuleFn,
    message: &'static str,
    suggested_action: &'static str,
}

const RULES: &[AlertRule] = &[
    AlertRule {
        id: "FLEET_IDLE_WITH_WORK",
        severity: "Warning",
        check: |h| latest(h).is_some_and(|s| s.ships_idle > 0 && (s.unresolved_anomalies > 0 || s.active_contracts > 0)),
        message: "Ships idle while anomalies or contracts are waiting",
        suggested_action: "Assign idle ships via automation flags or explicit orders",
    },
    AlertRule {
        id: "FUEL_CRISIS",
        severity: "Warning",
        check: |h| tail(h, 3).iter().all(|s| s.ships_low_fuel > 0) && h.len() >= 3,
        message: "Ships below 10% fuel for 3+ consecutive samples",
        suggested_action: "Route a tanker or enable auto_tanker automation",
    },
    AlertRule {
        id: "RESEARCH_STALLED",
        severity: "Warning",
        check: |h| {
            let recent = tail(h, 20);
            if recent.len() < 2 {
                return false;
            }
            let delta = max_f(&recent, |s| s.total_research_points) - min_f(&recent, |s| s.total_research_points);
            delta.abs() < f64::EPSILON
        },
        message: "Research points unchanged across the last 20 samples",
        suggested_action: "Check that a faction has an active research project queued",
    },
    AlertRule {
        id: "STOCKPILE_DEPLETION",
        severity: "Warning",
        check: |h| {
            let recent = tail(h, 10);
            if recent.len() < 2 {
                return false;
            }
            let first = recent.last().map(|s| s.total_stockpile_tons).unwrap_or(0.0);
            let last = recent.first().map(|s| s.total_stockpile_tons).unwrap_or(0.0);
            first > 0.0 && last < first * 0.5
        },
        message: "Total colony stockpiles have halved over the last 10 samples",
        suggested_action: "Check mining and freight assignments",
    },
    AlertRule {
        id: "ANOMALIES_PILING_UP",
        severity: "Info",
        check: |h| latest(h).is_some_and(|s| s.unresolved_anomalies >= 5),
        message: "Five or more anomalies remain uninvestigated",
        suggested_action: "Offer investigation contracts or route a surveyor",
    },
];

fn latest(h: &VecDeque<MetricsSnapshot>) -> Option<&MetricsSnapshot> {
    h.back()
}

fn tail(h: &VecDeque<MetricsSnapshot>, n: usize) -> Vec<&MetricsSnapshot> {
    h.iter().rev().take(n).collect()
}

fn max_f(snapshots: &[&MetricsSnapshot], f: fn(&MetricsSnapshot) -> f64) -> f64 {
    snapshots.iter().map(|s| f(s)).fold(f64::NEG_INFINITY, f64::max)
}

fn min_f(snapshots: &[&MetricsSnapshot], f: fn(&MetricsSnapshot) -> f64) -> f64 {
    snapshots.iter().map(|s| f(s)).fold(f64::INFINITY, f64::min)
}

pub struct AlertEngine {
    active: HashSet<String>,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self { active: HashSet::new() }
    }

    pub fn active_alert_ids(&self) -> Vec<String> {
        self.active.iter().cloned().collect()
    }

    pub fn active_alert_details(&self) -> Vec<AlertDetail> {
        RULES
            .iter()
            .filter(|rule| self.active.contains(rule.id))
            .map(|rule| AlertDetail {
                id: rule.id.to_string(),
                severity: rule.severity.to_string(),
                message: rule.message.to_string(),
                suggested_action: rule.suggested_action.to_string(),
            })
            .collect()
    }

    /// Evaluates all rules against recent history, emitting a `SimEvent` for
    /// every rising/falling edge directly into `state.events`.
    pub fn evaluate(&mut self, history: &VecDeque<MetricsSnapshot>, state: &mut GameState) {
        for rule in RULES {
            let fired = (rule.check)(history);
            let was_active = self.active.contains(rule.id);

            if fired && !was_active {
                self.active.insert(rule.id.to_string());
                state.emit(EventLevel::Warn, "alert", format!("{}: {}", rule.id, rule.message));
            } else if !fired && was_active {
                self.active.remove(rule.id);
                state.emit(EventLevel::Info, "alert", format!("{} cleared", rule.id));
            }
        }
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_low_fuel() -> MetricsSnapshot {
        MetricsSnapshot { ships_low_fuel: 1, ..Default::default() }
    }

    #[test]
    fn fuel_crisis_fires_after_three_consecutive_samples() {
        let mut history = VecDeque::new();
        history.push_back(snapshot_with_low_fuel());
        history.push_back(snapshot_with_low_fuel());
        assert!(!(RULES.iter().find(|r| r.id == "FUEL_CRISIS").unwrap().check)(&history));
        history.push_back(snapshot_with_low_fuel());
        assert!((RULES.iter().find(|r| r.id == "FUEL_CRISIS").unwrap().check)(&history));
    }

    #[test]
    fn evaluate_emits_an_event_on_rising_edge() {
        let content = nebula_core::test_fixtures::base_content();
        let mut state = nebula_core::test_fixtures::empty_state(&content, 1);
        let mut engine = AlertEngine::new();
        let mut history = VecDeque::new();
        history.push_back(MetricsSnapshot { unresolved_anomalies: 5, ..Default::default() });

        let before = state.events.len();
        engine.evaluate(&history, &mut state);
        assert_eq!(state.events.len(), before + 1);
        assert_eq!(engine.active_alert_ids(), vec!["ANOMALIES_PILING_UP".to_string()]);
    }
}
