use axum::{
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::ParticipantsError;
use crate::participants::{get_participant, get_participants, ParticipantsQuery, ScheduleAnalysis};
use crate::types::{AppConfig, SharedTournament};

#[derive(Clone)]
pub struct ServerState {
    pub tournament: SharedTournament,
    pub config: Arc<AppConfig>,
}

/// Flat query-string form of [`ParticipantsQuery`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantsParams {
    pub with_events: bool,
    pub with_draws: bool,
    pub with_match_ups: bool,
    pub with_opponents: bool,
    pub with_potential_match_ups: bool,
    pub with_statistics: bool,
    pub with_seeding: bool,
    pub with_schedule_items: bool,
    pub with_ranking_profile: bool,
    pub with_individual_participants: bool,
    pub use_publish_state: bool,
    pub diagnostics: bool,
    pub schedule_analysis: bool,
    pub scheduled_minutes_difference: Option<f64>,
    /// JSON-encoded filter object.
    pub participant_filters: Option<String>,
}

impl ParticipantsParams {
    /// Config flags switch options on; request parameters can only add to them.
    pub fn into_query(self, config: &AppConfig) -> Result<ParticipantsQuery, ParticipantsError> {
        let participant_filters = match self.participant_filters.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(serde_json::from_str(raw).map_err(|e| {
                ParticipantsError::InvalidObject {
                    context: format!("participantFilters: {e}"),
                }
            })?),
            _ => None,
        };
        let analyse = self.schedule_analysis || self.scheduled_minutes_difference.is_some();
        Ok(ParticipantsQuery {
            with_events: self.with_events,
            with_draws: self.with_draws,
            with_match_ups: self.with_match_ups,
            with_opponents: self.with_opponents,
            with_potential_match_ups: self.with_potential_match_ups,
            with_statistics: self.with_statistics,
            with_seeding: self.with_seeding,
            with_schedule_items: self.with_schedule_items,
            with_ranking_profile: self.with_ranking_profile,
            with_individual_participants: self.with_individual_participants,
            use_publish_state: self.use_publish_state || config.use_publish_state,
            diagnostics: self.diagnostics || config.diagnostics,
            schedule_analysis: analyse.then(|| ScheduleAnalysis {
                scheduled_minutes_difference: self
                    .scheduled_minutes_difference
                    .or(config.scheduled_minutes_difference),
            }),
            participant_filters,
        })
    }
}

fn json_response<T: serde::Serialize>(status: StatusCode, payload: &T) -> Response {
    (
        status,
        [("Cache-Control", "no-store")],
        Json(payload),
    )
        .into_response()
}

fn error_response(err: ParticipantsError) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_REQUEST
    };
    json_response(status, &err)
}

async fn list_participants(
    AxumState(state): AxumState<ServerState>,
    Query(params): Query<ParticipantsParams>,
) -> Response {
    let query = match params.into_query(&state.config) {
        Ok(query) => query,
        Err(err) => return error_response(err),
    };
    match get_participants(Some(&state.tournament), &query) {
        Ok(result) => json_response(StatusCode::OK, &result),
        Err(err) => error_response(err),
    }
}

async fn show_participant(
    AxumState(state): AxumState<ServerState>,
    Path(participant_id): Path<String>,
    Query(params): Query<ParticipantsParams>,
) -> Response {
    let query = match params.into_query(&state.config) {
        Ok(query) => query,
        Err(err) => return error_response(err),
    };
    match get_participant(Some(&state.tournament), &participant_id, &query) {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(err) => error_response(err),
    }
}

pub fn participants_router(state: ServerState) -> Router {
    Router::new()
        .route("/participants", get(list_participants))
        .route("/participants/:participant_id", get(show_participant))
        .with_state(state)
}

pub async fn start_server(state: ServerState, addr: &str) {
    let app = participants_router(state);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("participants server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("participants server listening at http://{addr}/participants");
    if let Err(e) = axum::serve(listener, app).await {
        error!("participants server error: {e}");
    }
}
