//! Refresh-all routes: start, observe, cancel, and history.
//!
//! The run itself executes on a background task; these handlers only
//! project its [`RefreshEvent`] stream into a shared status snapshot,
//! so polling `GET /refresh` never blocks the run.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch, Mutex};

use crate::error::AppError;
use crate::pricing::types::{BatchProgress, DisplayOutcome, RunSummary};
use crate::scheduler::{run_refresh_all, RefreshEvent};

use super::providers::{parse_filter, ProviderQuery};
use super::SharedState;

/// Snapshot of the refresh engine, as served by `GET /refresh`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshStatus {
    pub running: bool,
    pub progress: Option<BatchProgress>,
    pub last_summary: Option<RunSummary>,
}

/// Shared handle between the HTTP layer and the background run.
pub struct RefreshHandle {
    status: Mutex<RefreshStatus>,
    cancel: watch::Sender<bool>,
}

impl RefreshHandle {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            status: Mutex::new(RefreshStatus::default()),
            cancel,
        }
    }

    pub async fn status(&self) -> RefreshStatus {
        self.status.lock().await.clone()
    }
}

impl Default for RefreshHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Start a refresh over the currently-filtered provider set.
/// Returns 409 while another run is still in flight.
pub async fn start_refresh(
    State(state): State<SharedState>,
    Query(query): Query<ProviderQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let filter = parse_filter(&query)?;

    {
        let mut status = state.refresh.status.lock().await;
        if status.running {
            return Err((
                StatusCode::CONFLICT,
                Json(json!({ "error": "A refresh is already running" })),
            ));
        }
        status.running = true;
        status.progress = None;
    }
    state.refresh.cancel.send_replace(false);
    let cancel_rx = state.refresh.cancel.subscribe();

    let snapshot = state.directory.read().await.filtered(&filter);
    let total = snapshot.len();
    let ctx = state.refresh_context();
    let handle = state.refresh.clone();
    let repository = state.repository.clone();
    let started_at = Utc::now();

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    // Event consumer: keeps the shared status current and persists the
    // finished run.
    tokio::spawn(async move {
        let mut outcomes: Vec<(String, DisplayOutcome)> = Vec::new();
        while let Some(event) = events_rx.recv().await {
            match event {
                RefreshEvent::Started { .. } => {}
                RefreshEvent::ProviderResolved { provider, outcome } => {
                    outcomes.push((provider, outcome));
                }
                RefreshEvent::BatchCompleted { progress } => {
                    handle.status.lock().await.progress = Some(progress);
                }
                RefreshEvent::Finished { summary } => {
                    // persist before reporting idle, so a poller that
                    // sees the run finish also sees it in the history
                    if let Some(repository) = &repository {
                        if let Err(err) =
                            repository.record_run(started_at, &summary, &outcomes).await
                        {
                            tracing::warn!("Failed to record refresh run: {}", err);
                        }
                    }
                    let mut status = handle.status.lock().await;
                    status.last_summary = Some(summary);
                    status.running = false;
                }
            }
        }
    });

    tokio::spawn(run_refresh_all(ctx, snapshot, events_tx, cancel_rx));

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "started": true, "providers": total })),
    ))
}

pub async fn refresh_status(State(state): State<SharedState>) -> Json<RefreshStatus> {
    Json(state.refresh.status().await)
}

/// Request cooperative cancellation; takes effect between batches.
pub async fn cancel_refresh(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    let running = state.refresh.status.lock().await.running;
    if !running {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "No refresh is running" })),
        );
    }
    state.refresh.cancel.send_replace(true);
    (StatusCode::OK, Json(json!({ "cancelling": true })))
}

pub async fn refresh_history(
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let runs = match &state.repository {
        Some(repository) => repository
            .recent_runs(20)
            .await
            .map_err(|err| AppError::Database(err.to_string()))?,
        None => Vec::new(),
    };
    Ok(Json(json!({ "runs": runs })))
}
