use nebula_core::metrics::MetricsSnapshot;
use serde::Serialize;

type Extractor = (&'static str, Box<dyn Fn(&MetricsSnapshot) -> f64>);

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    pub collapsed_count: usize,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

pub fn compute_summary(snapshots: &[(u64, &MetricsSnapshot)]) -> SummaryStats {
    let seed_count = snapshots.len();

    // A seed has collapsed if its final snapshot shows every ship idle while
    // at least one is fuel-starved.
    let collapsed_count = snapshots
        .iter()
        .filter(|(_, s)| s.ships_total > 0 && s.ships_low_fuel > 0 && s.ships_idle == s.ships_total)
        .count();

    let extractors: Vec<Extractor> = vec![
        (
            "ships_idle_pct",
            Box::new(|s| {
                if s.ships_total == 0 {
                    0.0
                } else {
                    f64::from(s.ships_idle) / f64::from(s.ships_total)
                }
            }),
        ),
        ("ships_low_fuel", Box::new(|s| f64::from(s.ships_low_fuel))),
        ("colonies_total", Box::new(|s| f64::from(s.colonies_total))),
        ("total_population_millions", Box::new(|s| s.total_population_millions)),
        ("total_stockpile_tons", Box::new(|s| s.total_stockpile_tons)),
        ("total_research_points", Box::new(|s| s.total_research_points)),
        ("active_contracts", Box::new(|s| f64::from(s.active_contracts))),
        ("unresolved_anomalies", Box::new(|s| f64::from(s.unresolved_anomalies))),
        ("events_warn_count", Box::new(|s| f64::from(s.events_warn_count))),
        ("events_error_count", Box::new(|s| f64::from(s.events_error_count))),
    ];

    let metrics = extractors
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = snapshots.iter().map(|(_, s)| extract(s)).collect();
            compute_metric_summary(name, &values)
        })
        .collect();

    SummaryStats {
        seed_count,
        collapsed_count,
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    let stddev = variance.sqrt();

    MetricSummary {
        name: name.to_string(),
        mean,
        min,
        max,
        stddev,
    }
}

/// Build aggregated metrics in the contract format:
/// `{ "key": { "mean": ..., "min": ..., "max": ..., "stddev": ... }, ... }`
/// Covers all `SummaryMetrics` keys.
pub fn build_aggregated_metrics(snapshots: &[&MetricsSnapshot]) -> serde_json::Value {
    let contract_extractors: Vec<Extractor> = vec![
        ("ships_total", Box::new(|s| f64::from(s.ships_total))),
        ("ships_idle", Box::new(|s| f64::from(s.ships_idle))),
        ("ships_low_fuel", Box::new(|s| f64::from(s.ships_low_fuel))),
        ("colonies_total", Box::new(|s| f64::from(s.colonies_total))),
        ("total_population_millions", Box::new(|s| s.total_population_millions)),
        ("total_stockpile_tons", Box::new(|s| s.total_stockpile_tons)),
        ("total_research_points", Box::new(|s| s.total_research_points)),
        ("active_contracts", Box::new(|s| f64::from(s.active_contracts))),
        ("unresolved_anomalies", Box::new(|s| f64::from(s.unresolved_anomalies))),
        ("events_warn_count", Box::new(|s| f64::from(s.events_warn_count))),
        ("events_error_count", Box::new(|s| f64::from(s.events_error_count))),
    ];

    let mut map = serde_json::Map::new();
    for (name, extract) in &contract_extractors {
        let values: Vec<f64> = snapshots.iter().map(|s| extract(s)).collect();
        let summary = compute_metric_summary(name, &values);
        map.insert(
            name.to_string(),
            serde_json::json!({
                "mean": summary.mean,
                "min": summary.min,
                "max": summary.max,
                "stddev": summary.stddev,
            }),
        );
    }
    serde_json::Value::Object(map)
}

pub fn print_summary(scenario_name: &str, ticks: u64, stats: &SummaryStats) {
    let tick_display = if ticks >= 1000 {
        format!("{}k", ticks / 1000)
    } else {
        ticks.to_string()
    };
    println!(
        "\n=== {} ({} seeds, {} ticks each) ===\n",
        scenario_name, stats.seed_count, tick_display
    );
    println!(
        "{:<30} {:>8} {:>8} {:>8} {:>8}",
        "Metric", "Mean", "Min", "Max", "StdDev"
    );
    println!("{}", "-".repeat(70));
    for metric in &stats.metrics {
        println!(
            "{:<30} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            metric.name, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
    println!(
        "{:<30} {}/{}",
        "collapse_rate", stats.collapsed_count, stats.seed_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    fn make_snapshot(
        tick: u64,
        ships_total: u32,
        ships_idle: u32,
        ships_low_fuel: u32,
        colonies_total: u32,
        total_stockpile_tons: f64,
        total_research_points: f64,
        unresolved_anomalies: u32,
    ) -> MetricsSnapshot {
        MetricsSnapshot {
            tick,
            day: tick as f64,
            ships_total,
            ships_idle,
            ships_low_fuel,
            colonies_total,
            total_population_millions: 0.0,
            total_stockpile_tons,
            total_research_points,
            active_contracts: 0,
            unresolved_anomalies,
            events_warn_count: 0,
            events_error_count: 0,
        }
    }

    #[test]
    fn test_summary_basic_stats() {
        let s1 = make_snapshot(100, 2, 0, 0, 1, 500.0, 30.0, 0);
        let s2 = make_snapshot(100, 2, 0, 0, 1, 700.0, 50.0, 0);
        let snapshots: Vec<(u64, &MetricsSnapshot)> = vec![(1, &s1), (2, &s2)];
        let stats = compute_summary(&snapshots);

        assert_eq!(stats.seed_count, 2);
        assert_eq!(stats.collapsed_count, 0);

        let storage = &stats.metrics[3];
        assert_eq!(storage.name, "total_stockpile_tons");
        assert!((storage.mean - 600.0).abs() < 1e-5);
        assert!((storage.min - 500.0).abs() < 1e-5);
        assert!((storage.max - 700.0).abs() < 1e-5);
    }

    #[test]
    fn test_collapse_detection() {
        let collapsed = make_snapshot(100, 2, 2, 1, 1, 500.0, 30.0, 0);
        let healthy = make_snapshot(100, 2, 0, 0, 1, 500.0, 30.0, 0);
        let snapshots: Vec<(u64, &MetricsSnapshot)> = vec![(1, &collapsed), (2, &healthy)];
        let stats = compute_summary(&snapshots);

        assert_eq!(stats.collapsed_count, 1);
    }

    #[test]
    fn test_stddev_zero_for_identical() {
        let s1 = make_snapshot(100, 2, 1, 0, 1, 500.0, 30.0, 0);
        let s2 = make_snapshot(100, 2, 1, 0, 1, 500.0, 30.0, 0);
        let snapshots: Vec<(u64, &MetricsSnapshot)> = vec![(1, &s1), (2, &s2)];
        let stats = compute_summary(&snapshots);

        for metric in &stats.metrics {
            assert!(
                metric.stddev.abs() < 1e-10,
                "stddev for {} should be 0, got {}",
                metric.name,
                metric.stddev
            );
        }
    }

    #[test]
    fn test_build_aggregated_metrics_has_all_keys() {
        let s1 = make_snapshot(100, 2, 0, 0, 1, 500.0, 30.0, 0);
        let s2 = make_snapshot(100, 2, 1, 1, 1, 700.0, 50.0, 1);
        let snapshots: Vec<&MetricsSnapshot> = vec![&s1, &s2];
        let agg = build_aggregated_metrics(&snapshots);

        let obj = agg.as_object().unwrap();
        let expected_keys = [
            "ships_total",
            "ships_idle",
            "ships_low_fuel",
            "colonies_total",
            "total_population_millions",
            "total_stockpile_tons",
            "total_research_points",
            "active_contracts",
            "unresolved_anomalies",
            "events_warn_count",
            "events_error_count",
        ];
        assert_eq!(obj.len(), 11);
        for key in &expected_keys {
            let entry = obj
                .get(*key)
                .unwrap_or_else(|| panic!("missing key: {key}"));
            assert!(entry.get("mean").is_some(), "missing mean for {key}");
            assert!(entry.get("min").is_some(), "missing min for {key}");
            assert!(entry.get("max").is_some(), "missing max for {key}");
            assert!(entry.get("stddev").is_some(), "missing stddev for {key}");
        }
    }

    #[test]
    fn test_build_aggregated_metrics_values() {
        let s1 = make_snapshot(100, 4, 1, 0, 1, 500.0, 30.0, 0);
        let s2 = make_snapshot(100, 6, 3, 0, 1, 700.0, 50.0, 0);
        let snapshots: Vec<&MetricsSnapshot> = vec![&s1, &s2];
        let agg = build_aggregated_metrics(&snapshots);

        let ships_total = &agg["ships_total"];
        assert!((ships_total["mean"].as_f64().unwrap() - 5.0).abs() < 1e-5);
        assert!((ships_total["min"].as_f64().unwrap() - 4.0).abs() < 1e-5);
        assert!((ships_total["max"].as_f64().unwrap() - 6.0).abs() < 1e-5);
    }
}
