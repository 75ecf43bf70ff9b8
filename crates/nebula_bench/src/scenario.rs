use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub ticks: u64,
    #[serde(default = "default_metrics_every")]
    pub metrics_every: u64,
    pub seeds: SeedSpec,
    #[serde(default = "default_content_paths")]
    pub content_paths: Vec<String>,
    #[serde(default = "default_tech_paths")]
    pub tech_paths: Vec<String>,
    /// Optional base `GameState` JSON file loaded instead of procedurally
    /// generating one from the seed.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub overrides: HashMap<String, serde_json::Value>,
}

fn default_metrics_every() -> u64 {
    60
}

fn default_content_paths() -> Vec<String> {
    vec!["data/blueprints/starting_blueprints.json".to_string()]
}

fn default_tech_paths() -> Vec<String> {
    vec!["data/tech/tech_tree.json".to_string()]
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    List(Vec<u64>),
    Range { range: [u64; 2] },
}

impl SeedSpec {
    pub fn expand(&self) -> Vec<u64> {
        match self {
            SeedSpec::List(seeds) => seeds.clone(),
            SeedSpec::Range { range } => (range[0]..=range[1]).collect(),
        }
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario file: {}", path.display()))?;
    if scenario.name.is_empty() {
        bail!("scenario 'name' must not be empty");
    }
    if scenario.ticks == 0 {
        bail!("scenario 'ticks' must be > 0");
    }
    let seeds = scenario.seeds.expand();
    if seeds.is_empty() {
        bail!("scenario 'seeds' must produce at least one seed");
    }
    Ok(scenario)
}
