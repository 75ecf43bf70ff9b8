//! Periodic numeric snapshots used by `nebula_daemon`'s alert/advisor
//! endpoints and `nebula_bench`'s run summaries. A pure function over
//! `GameState` — no history, no side effects, safe to call every tick or
//! once every N ticks.

use serde::{Deserialize, Serialize};

use crate::content::GameContent;
use crate::state::{ContractStatus, EventLevel, GameState};

const LOW_FUEL_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub day: f64,
    pub ships_total: u32,
    pub ships_idle: u32,
    pub ships_low_fuel: u32,
    pub colonies_total: u32,
    pub total_population_millions: f64,
    pub total_stockpile_tons: f64,
    pub total_research_points: f64,
    pub active_contracts: u32,
    pub unresolved_anomalies: u32,
    pub events_warn_count: u32,
    pub events_error_count: u32,
}

#[allow(clippy::cast_possible_truncation)]
pub fn compute_metrics(state: &GameState, content: &GameContent) -> MetricsSnapshot {
    let ships_idle = state.ship_orders.values().filter(|o| o.queue.is_empty()).count() as u32;
    let ships_low_fuel = state
        .ships
        .values()
        .filter(|s| {
            let capacity = content
                .designs
                .get(&s.design_id)
                .map(|d| d.stats.fuel_capacity)
                .or_else(|| state.custom_designs.get(&s.design_id).map(|d| d.stats.fuel_capacity))
                .unwrap_or(0.0);
            capacity > 0.0 && s.fuel / capacity < LOW_FUEL_FRACTION
        })
        .count() as u32;

    let active_contracts = state
        .contracts
        .values()
        .filter(|c| matches!(c.status, ContractStatus::Offered | ContractStatus::Accepted))
        .count() as u32;
    let unresolved_anomalies = state.anomalies.values().filter(|a| a.resolution_faction_id.is_none()).count() as u32;
    let events_warn_count = state.events.iter().filter(|e| e.level == EventLevel::Warn).count() as u32;
    let events_error_count = state.events.iter().filter(|e| e.level == EventLevel::Error).count() as u32;

    MetricsSnapshot {
        tick: state.date_days,
        day: state.day_fraction(),
        ships_total: state.ships.len() as u32,
        ships_idle,
        ships_low_fuel,
        colonies_total: state.colonies.len() as u32,
        total_population_millions: state.colonies.values().map(|c| c.population_millions).sum(),
        total_stockpile_tons: state.colonies.values().flat_map(|c| c.stockpile.values()).sum(),
        total_research_points: state.factions.values().map(|f| f.research_points).sum(),
        active_contracts,
        unresolved_anomalies,
        events_warn_count,
        events_error_count,
    }
}

/// Writes a full metrics history to a CSV file, one row per snapshot.
pub fn write_metrics_csv(path: &str, snapshots: &[MetricsSnapshot]) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    writeln!(
        file,
        "tick,day,ships_total,ships_idle,ships_low_fuel,colonies_total,total_population_millions,\
         total_stockpile_tons,total_research_points,active_contracts,unresolved_anomalies,\
         events_warn_count,events_error_count"
    )?;
    for s in snapshots {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            s.tick,
            s.day,
            s.ships_total,
            s.ships_idle,
            s.ships_low_fuel,
            s.colonies_total,
            s.total_population_millions,
            s.total_stockpile_tons,
            s.total_research_points,
            s.active_contracts,
            s.unresolved_anomalies,
            s.events_warn_count,
            s.events_error_count,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, empty_state};

    #[test]
    fn compute_metrics_counts_idle_ships_and_colonies() {
        let content = base_content();
        let state = empty_state(&content, 1);
        let snapshot = compute_metrics(&state, &content);
        assert_eq!(snapshot.ships_total, 0);
        assert_eq!(snapshot.colonies_total, 0);
        assert_eq!(snapshot.tick, state.date_days);
    }

    #[test]
    fn write_metrics_csv_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        let snapshots = vec![MetricsSnapshot { tick: 0, ships_total: 2, ..Default::default() }, MetricsSnapshot { tick: 1, ships_total: 3, ..Default::default() }];
        write_metrics_csv(path.to_str().unwrap(), &snapshots).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("tick,day,ships_total"));
        assert!(lines[1].starts_with("0,"));
        assert!(lines[2].starts_with("1,"));
    }
}
