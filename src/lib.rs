pub mod types;
pub mod config;
pub mod error;
pub mod identity;
pub mod store;
pub mod seeding;
pub mod draws;
pub mod matchups;
pub mod entries;
pub mod aggregate;
pub mod schedule;
pub mod filter;
pub mod participants;
pub mod server;
#[cfg(test)]
mod test_support;

pub use error::{ParticipantsError, Result};
pub use participants::{
    get_participant, get_participants, ParticipantView, ParticipantsQuery, ParticipantsResult,
    ScheduleAnalysis, Statistic,
};

use config::*;
use server::{start_server, ServerState};
use types::*;

use std::{fs, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() {
    load_env_file();

    // Initialize tracing with file output
    let logs_dir = repo_root().join("logs");
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "participants.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Competition participants service starting");

    let config = match load_config_inner() {
        Ok(config) => config,
        Err(e) => {
            warn!("{e}; falling back to environment defaults");
            apply_env_defaults(AppConfig::default())
        }
    };
    log_env_warnings(&config);

    let record_path = resolve_repo_path(&config.tournament_record_path);
    let tournament = match load_tournament_record(&record_path) {
        Ok(tournament) => tournament,
        Err(e) => {
            error!("{e}");
            return;
        }
    };
    info!(
        "Loaded tournament {} with {} participants and {} events",
        tournament.tournament_id,
        tournament.participants().len(),
        tournament.events.len()
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start tokio runtime: {e}");
            return;
        }
    };
    let addr = config.server_addr.clone();
    let state = ServerState {
        tournament: Arc::new(tournament),
        config: Arc::new(config),
    };
    runtime.block_on(start_server(state, &addr));
}
