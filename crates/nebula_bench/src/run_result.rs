use nebula_core::metrics::MetricsSnapshot;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub run_schema_version: u32,
    pub run_status: String,
    pub run_id: String,
    pub git_sha: String,
    pub git_dirty: bool,
    pub seed: u64,
    pub scenario_name: String,
    pub scenario_params: serde_json::Value,
    pub tick_start: u64,
    pub tick_end: u64,
    pub total_ticks: u64,
    pub wall_time_ms: u64,
    pub sim_ticks_per_second: f64,
    pub summary_metrics: Option<SummaryMetrics>,
    pub alert_counts_by_type: HashMap<String, u64>,
    pub alert_first_tick_by_type: HashMap<String, u64>,
    pub alert_last_tick_by_type: HashMap<String, u64>,
    pub collapse_occurred: bool,
    pub collapse_tick: Option<u64>,
    pub collapse_reason: Option<String>,
    pub metrics_path: String,
    pub alerts_path: Option<String>,
    pub events_path: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryMetrics {
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

impl SummaryMetrics {
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        Self {
            ships_total: snapshot.ships_total,
            ships_idle: snapshot.ships_idle,
            ships_low_fuel: snapshot.ships_low_fuel,
            colonies_total: snapshot.colonies_total,
            total_population_millions: snapshot.total_population_millions,
            total_stockpile_tons: snapshot.total_stockpile_tons,
            total_research_points: snapshot.total_research_points,
            active_contracts: snapshot.active_contracts,
            unresolved_anomalies: snapshot.unresolved_anomalies,
            events_warn_count: snapshot.events_warn_count,
            events_error_count: snapshot.events_error_count,
        }
    }
}

impl RunResult {
    /// Write JSON atomically: write to `.tmp` then rename.
    pub fn write_atomic(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Detect collapse: every ship idle while at least one is fuel-starved, i.e.
/// the fleet has stopped moving for lack of fuel rather than lack of orders.
pub fn detect_collapse(snapshot: &MetricsSnapshot) -> (bool, Option<String>) {
    let collapsed = snapshot.ships_total > 0 && snapshot.ships_low_fuel > 0 && snapshot.ships_idle == snapshot.ships_total;
    if collapsed {
        (true, Some("ships_low_fuel + ships_idle == ships_total".to_string()))
    } else {
        (false, None)
    }
}

pub fn git_sha() -> String {
    env!("GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("GIT_DIRTY") == "true"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            tick: 1000,
            day: 1000.0,
            ships_total: 3,
            ships_idle: 1,
            ships_low_fuel: 0,
            colonies_total: 2,
            total_population_millions: 12.5,
            total_stockpile_tons: 4200.0,
            total_research_points: 380.0,
            active_contracts: 1,
            unresolved_anomalies: 2,
            events_warn_count: 0,
            events_error_count: 0,
        }
    }

    #[test]
    fn test_summary_metrics_from_snapshot() {
        let snapshot = sample_snapshot();
        let metrics = SummaryMetrics::from_snapshot(&snapshot);
        assert!((metrics.total_stockpile_tons - 4200.0).abs() < 1e-3);
        assert_eq!(metrics.ships_total, 3);
        assert_eq!(metrics.colonies_total, 2);
    }

    #[test]
    fn test_run_result_round_trip_serialization() {
        let snapshot = sample_snapshot();
        let result = RunResult {
            run_schema_version: 1,
            run_status: "completed".to_string(),
            run_id: "test-uuid".to_string(),
            git_sha: "abc123".to_string(),
            git_dirty: false,
            seed: 42,
            scenario_name: "test_scenario".to_string(),
            scenario_params: serde_json::json!({"ticks": 1000}),
            tick_start: 0,
            tick_end: 1000,
            total_ticks: 1000,
            wall_time_ms: 500,
            sim_ticks_per_second: 2000.0,
            summary_metrics: Some(SummaryMetrics::from_snapshot(&snapshot)),
            alert_counts_by_type: HashMap::new(),
            alert_first_tick_by_type: HashMap::new(),
            alert_last_tick_by_type: HashMap::new(),
            collapse_occurred: false,
            collapse_tick: None,
            collapse_reason: None,
            metrics_path: "metrics_000.csv".to_string(),
            alerts_path: None,
            events_path: None,
            error_message: None,
        };

        let json = serde_json::to_string_pretty(&result).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["run_schema_version"], 1);
        assert_eq!(parsed["run_status"], "completed");
        assert_eq!(parsed["seed"], 42);
        assert!(parsed["summary_metrics"]["total_stockpile_tons"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_atomic_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run_result.json");
        let result = RunResult {
            run_schema_version: 1,
            run_status: "completed".to_string(),
            run_id: "test-uuid".to_string(),
            git_sha: "abc123".to_string(),
            git_dirty: false,
            seed: 42,
            scenario_name: "test".to_string(),
            scenario_params: serde_json::json!({}),
            tick_start: 0,
            tick_end: 100,
            total_ticks: 100,
            wall_time_ms: 50,
            sim_ticks_per_second: 2000.0,
            summary_metrics: None,
            alert_counts_by_type: HashMap::new(),
            alert_first_tick_by_type: HashMap::new(),
            alert_last_tick_by_type: HashMap::new(),
            collapse_occurred: false,
            collapse_tick: None,
            collapse_reason: None,
            metrics_path: "metrics_000.csv".to_string(),
            alerts_path: None,
            events_path: None,
            error_message: None,
        };

        result.write_atomic(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["run_schema_version"], 1);
    }

    #[test]
    fn test_collapse_detection_healthy() {
        let snapshot = sample_snapshot();
        let (collapsed, reason) = detect_collapse(&snapshot);
        assert!(!collapsed);
        assert!(reason.is_none());
    }

    #[test]
    fn test_collapse_detection_collapsed() {
        let mut snapshot = sample_snapshot();
        snapshot.ships_low_fuel = 3;
        snapshot.ships_idle = 3;
        snapshot.ships_total = 3;
        let (collapsed, reason) = detect_collapse(&snapshot);
        assert!(collapsed);
        assert!(reason.is_some());
    }

    #[test]
    fn test_git_sha_not_empty() {
        let sha = git_sha();
        assert!(!sha.is_empty());
    }
}
