//! Memory-Scramble and replicated key/value server.
//!
//! One binary, three roles: the board server, the key/value leader, and a
//! key/value follower. The role is picked by `--mode` or the `MODE`
//! environment variable.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use memory_scramble::board;
use memory_scramble::kv::{DelayRange, Follower, HttpTransport, Leader, Store};
use pico_args::Arguments;

use ms_server::api::{self, AppState};
use ms_server::config::{Mode, ServerConfig};
use ms_server::{logging, metrics};

const HELP: &str = "\
Run a Memory-Scramble board server or a replicated key/value node

USAGE:
  ms_server [OPTIONS]

OPTIONS:
  --bind     IP:PORT                Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --mode     board|leader|follower  What this process serves    [default: env MODE or board]
  --board    PATH                   Board file (board mode)     [default: env BOARD_PATH]

FLAGS:
  -h, --help                        Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g. 0.0.0.0:8080)
  MODE                     board, leader, or follower
  BOARD_PATH               Board file path (board mode)
  FOLLOWERS                Comma-separated follower endpoints (leader mode)
  WRITE_QUORUM             Follower acks required per write (leader mode)
  MIN_DELAY, MAX_DELAY     Simulated replication delay range, ms (leader mode)
  FOLLOWER_ID              Name of this follower (follower mode)
  MS_METRICS_BIND          Prometheus exporter bind address
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // dotenvy does not override variables that are already set.
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let mode_override: Option<Mode> = pargs
        .opt_value_from_str::<_, String>("--mode")?
        .map(|raw| raw.parse())
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid --mode: {e}"))?;
    let board_override: Option<String> = pargs.opt_value_from_str("--board")?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, mode_override, board_override)
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    if let Err(e) = metrics::init_metrics(config.metrics_bind) {
        tracing::warn!("Failed to initialize metrics: {e}. Metrics will not be available.");
    } else {
        tracing::info!(
            "Metrics endpoint available at http://{}/metrics",
            config.metrics_bind
        );
    }

    tracing::info!("Starting {} server at {}", config.mode, config.bind);

    let state = match config.mode {
        Mode::Board => {
            let path = config.board_path.as_deref().unwrap_or_default();
            let board = board::load(path)
                .map_err(|e| anyhow::anyhow!("Failed to load board {path:?}: {e}"))?;
            tracing::info!("Loaded {}x{} board from {path}", board.height(), board.width());
            AppState::board(Arc::new(board))
        }
        Mode::Leader => {
            let replication = &config.replication;
            let leader = Leader::new(
                Arc::new(Store::new()),
                replication.followers.clone(),
                replication.write_quorum,
                DelayRange::new(replication.min_delay_ms, replication.max_delay_ms),
                Arc::new(HttpTransport::new()),
            );
            tracing::info!(
                "Leader with {} follower(s), write quorum {}",
                replication.followers.len(),
                replication.write_quorum
            );
            AppState::leader(Arc::new(leader))
        }
        Mode::Follower => {
            let follower = Follower::new(
                config.replication.follower_id.clone(),
                Arc::new(Store::new()),
            );
            tracing::info!("Follower {}", follower.id());
            AppState::follower(Arc::new(follower))
        }
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {e}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    tracing::info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
