//! Command-line driver: load content, load or generate a game, advance it
//! by a fixed number of days, and optionally save/dump the result.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use nebula_control::{AutopilotController, OrderSource, Simulation};
use nebula_core::engine::SimConfig;

const DEFAULT_CONTENT_PATH: &str = "data/blueprints/starting_blueprints.json";
const DEFAULT_TECH_PATH: &str = "data/tech/tech_tree.json";

#[derive(Parser, Debug)]
#[command(name = "nebula4x", about = "Deterministic tick-driven 4X space simulation engine")]
struct Cli {
    /// Number of days to simulate.
    #[arg(long, default_value_t = 30)]
    days: u64,

    /// Content file(s) to load, `;`/`,`-separated. Falls back to
    /// `NEBULA4X_CONTENT`, then a built-in default path.
    #[arg(long)]
    content: Option<String>,

    /// Load an existing save file instead of generating a fresh game.
    #[arg(long)]
    load: Option<String>,

    /// Save the final state to this path after the run.
    #[arg(long)]
    save: Option<String>,

    /// Print the final state as JSON to stdout.
    #[arg(long)]
    dump: bool,
}

fn resolve_content_paths(cli_content: Option<&str>) -> Vec<String> {
    if let Some(raw) = cli_content {
        return nebula_world::split_path_list(raw);
    }
    if let Ok(raw) = std::env::var("NEBULA4X_CONTENT") {
        return nebula_world::split_path_list(&raw);
    }
    vec![DEFAULT_CONTENT_PATH.to_string()]
}

fn resolve_tech_paths() -> Vec<String> {
    if let Ok(raw) = std::env::var("NEBULA4X_TECH") {
        return nebula_world::split_path_list(&raw);
    }
    vec![DEFAULT_TECH_PATH.to_string()]
}

fn run(cli: &Cli) -> Result<()> {
    let content_paths = resolve_content_paths(cli.content.as_deref());
    let tech_paths = resolve_tech_paths();
    let content = nebula_world::load_all_content(&content_paths, &tech_paths)?;

    for issue in nebula_world::validate_content_db(&content) {
        eprintln!("Warning: {issue}");
    }

    let (state, _rng) = nebula_world::load_or_build_state(&content, None, cli.load.as_deref())?;
    let mut simulation = Simulation::new(state, content, SimConfig::default());
    let mut autopilot = AutopilotController;

    for _ in 0..cli.days {
        if simulation.state.victory_state.game_over {
            break;
        }
        let mut sources: [&mut dyn OrderSource; 1] = [&mut autopilot];
        simulation.advance(&mut sources);
    }

    for warning in simulation.validate_and_fix() {
        eprintln!("Warning: {warning}");
    }

    if let Some(save_path) = &cli.save {
        nebula_world::save_state_atomic(&simulation.state, Path::new(save_path))?;
    }

    if cli.dump {
        println!("{}", serde_json::to_string_pretty(&simulation.state)?);
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Fatal: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_content_paths_prefers_cli_flag_over_default() {
        assert_eq!(resolve_content_paths(Some("a.json;b.json")), vec!["a.json", "b.json"]);
    }

    #[test]
    fn resolve_content_paths_falls_back_to_default_when_unset() {
        std::env::remove_var("NEBULA4X_CONTENT");
        assert_eq!(resolve_content_paths(None), vec![DEFAULT_CONTENT_PATH.to_string()]);
    }
}
