use crate::jobs::manager::{Job, JobManager, JobResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use seating_core::models::{
    GenerateOptions, RegenerateOptions, RosterRow, SessionAssignment,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shared state handed to every route: just the job tracker.
#[derive(Clone)]
pub struct AppState {
    pub job_manager: JobManager,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub roster: Vec<RosterRow>,
    pub num_tables: usize,
    pub num_sessions: usize,
    #[serde(default)]
    pub options: GenerateOptions,
}

#[derive(Deserialize)]
pub struct RegenerateRequest {
    pub existing: Vec<SessionAssignment>,
    pub roster: Vec<RosterRow>,
    pub session: u32,
    #[serde(default)]
    pub absent: Vec<String>,
    pub num_tables: usize,
    #[serde(default)]
    pub options: RegenerateOptions,
}

#[derive(Serialize)]
pub struct CreateJobResponse {
    job_id: Uuid,
}

pub async fn create_generate_job_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> (StatusCode, Json<CreateJobResponse>) {
    let job_id = state.job_manager.spawn(move || {
        seating_core::generate(
            &request.roster,
            request.num_tables,
            request.num_sessions,
            &request.options,
        )
        .map(JobResult::Generate)
        .map_err(|e| e.to_string())
    });
    (StatusCode::CREATED, Json(CreateJobResponse { job_id }))
}

pub async fn create_regenerate_job_handler(
    State(state): State<AppState>,
    Json(request): Json<RegenerateRequest>,
) -> (StatusCode, Json<CreateJobResponse>) {
    let job_id = state.job_manager.spawn(move || {
        seating_core::regenerate_session(
            &request.existing,
            &request.roster,
            request.session,
            &request.absent,
            request.num_tables,
            &request.options,
        )
        .map(JobResult::Regenerate)
        .map_err(|e| e.to_string())
    });
    (StatusCode::CREATED, Json(CreateJobResponse { job_id }))
}

#[axum::debug_handler]
pub async fn get_job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, StatusCode> {
    state
        .job_manager
        .get(job_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[axum::debug_handler]
pub async fn get_job_result_handler(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, StatusCode> {
    state
        .job_manager
        .get(job_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
