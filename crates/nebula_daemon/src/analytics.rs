//! Trend/bottleneck digest built from recent [`MetricsSnapshot`] history,
//! for the `/api/v1/digest` advisor endpoint.

use std::collections::VecDeque;

use nebula_core::metrics::MetricsSnapshot;
use serde::Serialize;

use crate::alerts::AlertDetail;

#[derive(Debug, Clone, Serialize)]
pub struct AdvisorDigest {
    pub tick: u64,
    pub snapshot: MetricsSnapshot,
    pub trends: Vec<TrendInfo>,
    pub rates: Rates,
    pub bottleneck: Bottleneck,
    pub alerts: Vec<AlertDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendInfo {
    pub metric: String,
    pub direction: TrendDirection,
    pub short_avg: f64,
    pub long_avg: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rates {
    pub population_growth_per_sample: f64,
    pub stockpile_change_per_sample: f64,
    pub research_points_per_sample: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum Bottleneck {
    FleetIdle,
    FuelCrisis,
    StockpileDepletion,
    ResearchStalled,
    AnomalyBacklog,
    Healthy,
}

struct TrackedMetric {
    name: &'static str,
    extract: fn(&MetricsSnapshot) -> f64,
    higher_is_better: bool,
}

const TRACKED_METRICS: &[TrackedMetric] = &[
    TrackedMetric { name: "total_population_millions", extract: |s| s.total_population_millions, higher_is_better: true },
    TrackedMetric { name: "total_stockpile_tons", extract: |s| s.total_stockpile_tons, higher_is_better: true },
    TrackedMetric { name: "total_research_points", extract: |s| s.total_research_points, higher_is_better: true },
    TrackedMetric { name: "ships_idle", extract: |s| f64::from(s.ships_idle), higher_is_better: false },
    TrackedMetric { name: "unresolved_anomalies", extract: |s| f64::from(s.unresolved_anomalies), higher_is_better: false },
];

const SHORT_WINDOW: usize = 10;
const LONG_WINDOW: usize = 50;

fn compute_trends(history: &VecDeque<MetricsSnapshot>) -> Vec<TrendInfo> {
    TRACKED_METRICS
        .iter()
        .map(|metric| {
            let short_avg = window_average(history, SHORT_WINDOW, metric.extract);
            let long_avg = window_average(history, LONG_WINDOW, metric.extract);

            let direction = if long_avg == 0.0 && short_avg == 0.0 {
                TrendDirection::Stable
            } else if short_avg > long_avg * 1.05 {
                if metric.higher_is_better { TrendDirection::Improving } else { TrendDirection::Declining }
            } else if short_avg < long_avg * 0.95 {
                if metric.higher_is_better { TrendDirection::Declining } else { TrendDirection::Improving }
            } else {
                TrendDirection::Stable
            };

            TrendInfo { metric: metric.name.to_string(), direction, short_avg, long_avg }
        })
        .collect()
}

fn window_average(history: &VecDeque<MetricsSnapshot>, window: usize, extract: fn(&MetricsSnapshot) -> f64) -> f64 {
    let count = history.len().min(window);
    if count == 0 {
        return 0.0;
    }
    let sum: f64 = history.iter().rev().take(count).map(extract).sum();
    sum / count as f64
}

fn compute_rates(history: &VecDeque<MetricsSnapshot>) -> Rates {
    if history.len() < 2 {
        return Rates { population_growth_per_sample: 0.0, stockpile_change_per_sample: 0.0, research_points_per_sample: 0.0 };
    }
    let last = &history[history.len() - 1];
    let prev = &history[history.len() - 2];
    Rates {
        population_growth_per_sample: last.total_population_millions - prev.total_population_millions,
        stockpile_change_per_sample: last.total_stockpile_tons - prev.total_stockpile_tons,
        research_points_per_sample: last.total_research_points - prev.total_research_points,
    }
}

fn detect_bottleneck(history: &VecDeque<MetricsSnapshot>) -> Bottleneck {
    let Some(latest) = history.back() else {
        return Bottleneck::Healthy;
    };

    if latest.ships_low_fuel > 0 {
        return Bottleneck::FuelCrisis;
    }
    if latest.ships_idle > 0 && latest.ships_total > 1 {
        return Bottleneck::FleetIdle;
    }
    if latest.unresolved_anomalies >= 5 {
        return Bottleneck::AnomalyBacklog;
    }
    if latest.total_stockpile_tons < 1.0 {
        return Bottleneck::StockpileDepletion;
    }
    if latest.total_research_points == 0.0 {
        return Bottleneck::ResearchStalled;
    }

    Bottleneck::Healthy
}

pub fn compute_digest(history: &VecDeque<MetricsSnapshot>, alerts: Vec<AlertDetail>) -> Option<AdvisorDigest> {
    let latest = history.back()?;
    Some(AdvisorDigest {
        tick: latest.tick,
        snapshot: *latest,
        trends: compute_trends(history),
        rates: compute_rates(history),
        bottleneck: detect_bottleneck(history),
        alerts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_digest_returns_none_on_empty_history() {
        assert!(compute_digest(&VecDeque::new(), Vec::new()).is_none());
    }

    #[test]
    fn detect_bottleneck_flags_low_fuel_first() {
        let mut history = VecDeque::new();
        history.push_back(MetricsSnapshot { ships_low_fuel: 2, ships_idle: 3, ships_total: 5, ..Default::default() });
        assert_eq!(detect_bottleneck(&history), Bottleneck::FuelCrisis);
    }

    #[test]
    fn compute_rates_is_zero_with_a_single_sample() {
        let mut history = VecDeque::new();
        history.push_back(MetricsSnapshot::default());
        let rates = compute_rates(&history);
        assert_eq!(rates.population_growth_per_sample, 0.0);
    }
}
