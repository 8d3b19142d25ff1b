//! Axum HTTP server for the marketplace API.
//!
//! Serves agent and job CRUD, the status overwrite, manual assignment,
//! per-job candidate rankings, and the matching trigger. Everything lives
//! under `/api`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::api::{ErrorBody, HealthResponse};
use crate::error::MarketError;
use crate::matching::{Candidate, MatchingEngine};
use crate::model::{
    Agent, AgentPatch, Job, JobFilter, JobPatch, JobStatus, MAX_PAGE_SIZE, NewAgent, NewJob, Page,
};
use crate::orchestrator::{MatchAck, MatchOrchestrator};
use crate::registry::{
    AgentRegistry, JobRegistry, MemoryAgentRegistry, MemoryJobRegistry, assign_manually,
};

pub type Orchestrator = MatchOrchestrator<MemoryJobRegistry, MemoryAgentRegistry>;

/// Shared state for all handlers.
pub struct AppState {
    pub jobs: Arc<MemoryJobRegistry>,
    pub agents: Arc<MemoryAgentRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(jobs: Arc<MemoryJobRegistry>, agents: Arc<MemoryAgentRegistry>) -> Self {
        let orchestrator = Arc::new(MatchOrchestrator::new(
            Arc::clone(&jobs),
            Arc::clone(&agents),
        ));
        Self {
            jobs,
            agents,
            orchestrator,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        // Matching
        .route("/agents/match-jobs", post(match_jobs_handler))
        .route("/agents/match-jobs/last", get(last_match_handler))
        // Agents
        .route("/agents", get(agents_list_handler).post(agents_create_handler))
        .route(
            "/agents/{id}",
            get(agents_detail_handler)
                .patch(agents_update_handler)
                .delete(agents_delete_handler),
        )
        // Jobs
        .route("/jobs", get(jobs_list_handler).post(jobs_create_handler))
        .route("/jobs/paginated", get(jobs_page_handler))
        .route(
            "/jobs/{id}",
            get(jobs_detail_handler)
                .patch(jobs_update_handler)
                .delete(jobs_delete_handler),
        )
        .route("/jobs/{id}/status/{status}", patch(jobs_status_handler))
        .route("/jobs/{id}/assign/{agent_id}", patch(jobs_assign_handler))
        .route("/jobs/{id}/candidates", get(jobs_candidates_handler));

    Router::new().nest("/api", api).with_state(state)
}

/// Bind and serve in a background task.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<(SocketAddr, JoinHandle<()>), MarketError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;
    let app = router(state);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    Ok((bound_addr, handle))
}

/// Serve in the foreground until Ctrl-C.
pub async fn run_server(addr: SocketAddr, state: Arc<AppState>) -> Result<(), MarketError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}/api", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = match &self {
            MarketError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketError::JobNotFound(_) | MarketError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            MarketError::AlreadyAssigned { .. } | MarketError::NotEligible { .. } => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.is_client_error() {
            debug!(error = %self, "request rejected");
            error_response(status, self.to_string())
        } else {
            error!(error = %self, "request failed");
            error_response(status, "internal error".to_string())
        }
    }
}

// Malformed bodies and query strings are validation errors like any other.
impl From<JsonRejection> for MarketError {
    fn from(rejection: JsonRejection) -> Self {
        MarketError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for MarketError {
    fn from(rejection: QueryRejection) -> Self {
        MarketError::validation(rejection.body_text())
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    let body = ErrorBody {
        status_code: status.as_u16(),
        message,
        error: status.canonical_reason().unwrap_or("Error").to_string(),
    };
    (status, Json(body)).into_response()
}

// --- Health ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// --- Matching ---

async fn match_jobs_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<MatchAck>) {
    let ack = state.orchestrator.trigger();
    info!(run_id = %ack.run_id, "matching pass triggered");
    (StatusCode::CREATED, Json(ack))
}

async fn last_match_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.last_report().await {
        Some(report) => Json(report).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "no matching pass has finished yet".to_string(),
        ),
    }
}

// --- Agents ---

async fn agents_list_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Agent>>, MarketError> {
    Ok(Json(state.agents.list().await?))
}

async fn agents_create_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewAgent>, JsonRejection>,
) -> Result<(StatusCode, Json<Agent>), MarketError> {
    let Json(new) = payload?;
    let agent = state.agents.create(new).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

async fn agents_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Agent>, MarketError> {
    Ok(Json(state.agents.get(&id).await?))
}

async fn agents_update_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<AgentPatch>, JsonRejection>,
) -> Result<Json<Agent>, MarketError> {
    let Json(patch) = payload?;
    Ok(Json(state.agents.update(&id, patch).await?))
}

async fn agents_delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, MarketError> {
    state.agents.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Jobs ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageQuery {
    page: Option<usize>,
    page_size: Option<usize>,
}

async fn jobs_list_handler(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<JobFilter>, QueryRejection>,
) -> Result<Json<Vec<Job>>, MarketError> {
    let Query(filter) = filter?;
    Ok(Json(state.jobs.list(&filter).await?))
}

async fn jobs_page_handler(
    State(state): State<Arc<AppState>>,
    paging: Result<Query<PageQuery>, QueryRejection>,
    filter: Result<Query<JobFilter>, QueryRejection>,
) -> Result<Json<Page<Job>>, MarketError> {
    let Query(paging) = paging?;
    let Query(filter) = filter?;
    let page = paging.page.unwrap_or(1);
    let page_size = paging.page_size.unwrap_or(10).min(MAX_PAGE_SIZE);
    Ok(Json(state.jobs.page(page, page_size, &filter).await?))
}

async fn jobs_create_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewJob>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), MarketError> {
    let Json(new) = payload?;
    let job = state.jobs.create(new).await?;
    info!(job_id = %job.id, auto_assign = job.auto_assign, "job created");
    Ok((StatusCode::CREATED, Json(job)))
}

async fn jobs_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, MarketError> {
    Ok(Json(state.jobs.get(&id).await?))
}

async fn jobs_update_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<JobPatch>, JsonRejection>,
) -> Result<Json<Job>, MarketError> {
    let Json(patch) = payload?;
    Ok(Json(state.jobs.update(&id, patch).await?))
}

async fn jobs_delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, MarketError> {
    state.jobs.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn jobs_status_handler(
    State(state): State<Arc<AppState>>,
    Path((id, status)): Path<(String, String)>,
) -> Result<Json<Job>, MarketError> {
    let status: JobStatus = status.parse()?;
    let job = state.jobs.set_status(&id, status).await?;
    info!(job_id = %job.id, status = %job.status, "job status updated");
    Ok(Json(job))
}

async fn jobs_assign_handler(
    State(state): State<Arc<AppState>>,
    Path((id, agent_id)): Path<(String, String)>,
) -> Result<Json<Job>, MarketError> {
    let job = assign_manually(state.jobs.as_ref(), state.agents.as_ref(), &id, &agent_id).await?;
    Ok(Json(job))
}

async fn jobs_candidates_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Candidate>>, MarketError> {
    let job = state.jobs.get(&id).await?;
    let agents = state.agents.list().await?;
    match MatchingEngine::rank(&job, &agents) {
        Ok(ranked) => Ok(Json(ranked)),
        Err(MarketError::NotEligible { .. }) => Ok(Json(Vec::new())),
        Err(e) => Err(e),
    }
}
