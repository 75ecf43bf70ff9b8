mod alerts;
mod analytics;
mod routes;
mod state;
mod tick_loop;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nebula_control::{AutopilotController, Simulation};
use nebula_core::engine::SimConfig;
use nebula_core::state::SimEvent;
use parking_lot::Mutex;
use routes::make_router_with_cors;
use state::{AppState, SimState};
use tick_loop::run_tick_loop;
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "nebula4x-daemon", about = "Nebula4X simulation daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        /// Generate a world procedurally with this seed. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Load initial GameState from a JSON file. Mutually exclusive with --seed.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, default_value_t = 3001)]
        port: u16,
        /// Ticks per second. 0 = as fast as possible.
        #[arg(long, default_value_t = 10.0)]
        ticks_per_sec: f64,
        #[arg(long)]
        max_ticks: Option<u64>,
        /// Sample metrics every N ticks (default 1). 0 = disabled.
        #[arg(long, default_value_t = 1)]
        metrics_every: u64,
        /// Disable the run directory and alert engine.
        #[arg(long)]
        no_metrics: bool,
        /// CORS origin allowed to hit this daemon's HTTP API.
        #[arg(long, default_value = "http://localhost:5173")]
        cors_origin: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { seed, state_file, content, port, ticks_per_sec, max_ticks, metrics_every, no_metrics, cors_origin } => {
            let content_paths = resolve_content_paths(content.as_deref());
            let tech_paths = resolve_tech_paths();
            let game_content = nebula_world::load_all_content(&content_paths, &tech_paths)?;
            for issue in nebula_world::validate_content_db(&game_content) {
                tracing::warn!("content validation: {issue}");
            }
            let (game_state, mut rng) = nebula_world::load_or_build_state(&game_content, seed, state_file.as_deref())?;

            let run_dir = if no_metrics {
                None
            } else {
                let run_id = nebula_world::generate_run_id(game_state.seed, &mut rng);
                let dir = nebula_world::create_run_dir(&run_id)?;
                nebula_world::write_run_info(
                    &dir,
                    &run_id,
                    game_state.seed,
                    &game_content.content_version,
                    serde_json::json!({"runner": "nebula_daemon", "max_ticks": max_ticks}),
                )?;
                println!("Run directory: {}", dir.display());
                Some(dir)
            };

            let alert_engine = if no_metrics { None } else { Some(alerts::AlertEngine::new()) };

            let (event_tx, _) = broadcast::channel::<Vec<SimEvent>>(256);
            let sim = Arc::new(Mutex::new(SimState {
                simulation: Simulation::new(game_state, game_content, SimConfig::default()),
                autopilot: AutopilotController,
                metrics_every,
                metrics_history: VecDeque::new(),
                alert_engine,
            }));
            let app_state = AppState {
                sim: sim.clone(),
                commands: Arc::new(Mutex::new(Vec::new())),
                event_tx: event_tx.clone(),
                ticks_per_sec: Arc::new(AtomicU64::new(ticks_per_sec.to_bits())),
                run_dir,
                paused: Arc::new(AtomicBool::new(false)),
            };

            let router = make_router_with_cors(app_state.clone(), &cors_origin);
            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
            let speed = if ticks_per_sec == 0.0 { "max".to_string() } else { format!("{ticks_per_sec} ticks/sec") };
            println!("nebula_daemon listening on http://localhost:{port}  speed={speed}");

            tokio::spawn(run_tick_loop(sim, app_state.commands.clone(), event_tx, app_state.ticks_per_sec.clone(), max_ticks, app_state.paused.clone()));

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await?;
        }
    }
    Ok(())
}

fn resolve_content_paths(cli_content: Option<&str>) -> Vec<String> {
    if let Some(raw) = cli_content {
        return nebula_world::split_path_list(raw);
    }
    if let Ok(raw) = std::env::var("NEBULA4X_CONTENT") {
        return nebula_world::split_path_list(&raw);
    }
    vec!["data/blueprints/starting_blueprints.json".to_string()]
}

fn resolve_tech_paths() -> Vec<String> {
    if let Ok(raw) = std::env::var("NEBULA4X_TECH") {
        return nebula_world::split_path_list(&raw);
    }
    vec!["data/tech/tech_tree.json".to_string()]
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use nebula_core::test_fixtures::base_content;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use routes::make_router;
    use tower::ServiceExt;

    use super::*;

    fn make_test_state() -> AppState {
        let content = base_content();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let state = nebula_world::build_initial_state(&content, 0, &mut rng);
        let (event_tx, _) = tokio::sync::broadcast::channel(64);
        AppState {
            sim: Arc::new(Mutex::new(SimState {
                simulation: Simulation::new(state, content, SimConfig::default()),
                autopilot: AutopilotController,
                metrics_every: 1,
                metrics_history: VecDeque::new(),
                alert_engine: None,
            })),
            commands: Arc::new(Mutex::new(Vec::new())),
            event_tx,
            ticks_per_sec: Arc::new(AtomicU64::new(10.0_f64.to_bits())),
            run_dir: None,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    #[tokio::test]
    async fn test_meta_returns_200() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().uri("/api/v1/meta").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_meta_contains_tick() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().uri("/api/v1/meta").body(Body::empty()).unwrap()).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["tick"], 0);
    }

    #[tokio::test]
    async fn test_snapshot_returns_200() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().uri("/api/v1/snapshot").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_meta_contains_ticks_per_sec() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().uri("/api/v1/meta").body(Body::empty()).unwrap()).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["ticks_per_sec"], 10.0);
    }

    fn make_test_state_with_run_dir(run_dir: std::path::PathBuf) -> AppState {
        let mut state = make_test_state();
        state.run_dir = Some(run_dir);
        state
    }

    #[tokio::test]
    async fn test_save_returns_200_with_run_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let app = make_router(make_test_state_with_run_dir(tmp.path().to_path_buf()));
        let response = app.oneshot(Request::builder().method("POST").uri("/api/v1/save").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["tick"], 0);
        assert!(json["path"].as_str().unwrap().contains("save_0.json"));

        let save_path = json["path"].as_str().unwrap();
        let contents = std::fs::read_to_string(save_path).unwrap();
        let _state: nebula_core::state::GameState = serde_json::from_str(&contents).unwrap();
    }

    #[tokio::test]
    async fn test_save_returns_503_without_run_dir() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().method("POST").uri("/api/v1/save").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_snapshot_is_valid_json() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().uri("/api/v1/snapshot").body(Body::empty()).unwrap()).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let result: Result<serde_json::Value, _> = serde_json::from_slice(&body);
        assert!(result.is_ok(), "snapshot was not valid JSON: {:?}", body);
    }

    #[tokio::test]
    async fn test_command_queues_an_order() {
        let app = make_router(make_test_state());
        let body = serde_json::json!({"ship_id": 1, "order": {"type": "MoveToPoint", "destination": {"x": 1.0, "y": 2.0}}});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/command")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
