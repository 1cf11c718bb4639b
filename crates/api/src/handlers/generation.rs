//! Handlers for the staged code-generation workflow.
//!
//! Routes:
//! - `POST /generations`               — submit a generation job
//! - `GET  /generations/{id}`          — job snapshot
//! - `GET  /generations/{id}/events`   — SSE stream of status transitions
//! - `POST /generations/{id}/cancel`   — request cancellation
//!
//! Submission is synchronous up to admission (validation + credit debit);
//! everything after that is observable through the event stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use vizcode_core::types::JobId;
use vizcode_core::{CoreError, FileSpec, JobRequest, JobStatus};
use vizcode_events::JobEvent;

use crate::config::SESSION_ACCOUNT_ID;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenerationRequest {
    pub prompt: String,
    pub model_id: String,
    pub files: Vec<FileSpec>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenerationResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelGenerationResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/generations
///
/// Validates the request and debits the model cost; on success the job is
/// accepted and runs asynchronously. Validation failures map to 400 with a
/// taxonomy code, affordability failures to 402.
pub async fn create_generation(
    State(state): State<AppState>,
    Json(input): Json<CreateGenerationRequest>,
) -> AppResult<impl IntoResponse> {
    let request = JobRequest {
        account_id: SESSION_ACCOUNT_ID.to_string(),
        prompt: input.prompt,
        model_id: input.model_id,
        files: input.files,
    };

    let job_id = state.orchestrator.submit(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: CreateGenerationResponse {
                job_id,
                status: JobStatus::Queued,
            },
        }),
    ))
}

/// GET /api/v1/generations/{id}
///
/// Returns a snapshot of the job's overall and per-file statuses.
pub async fn get_generation(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state
        .orchestrator
        .job(job_id)
        .await
        .ok_or_else(|| job_not_found(job_id))?;

    Ok(Json(DataResponse { data: snapshot }))
}

/// POST /api/v1/generations/{id}/cancel
///
/// Requests cancellation. Idempotent; cancelling a terminal job changes
/// nothing. The returned status is a snapshot and may still read `running`
/// until the job task observes the signal.
pub async fn cancel_generation(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    state.orchestrator.cancel(job_id).await?;

    let snapshot = state
        .orchestrator
        .job(job_id)
        .await
        .ok_or_else(|| job_not_found(job_id))?;

    Ok(Json(DataResponse {
        data: CancelGenerationResponse {
            job_id,
            status: snapshot.status,
        },
    }))
}

/// GET /api/v1/generations/{id}/events
///
/// Server-sent events: replays the job's journal, then follows the live
/// feed. One event per status transition, in emission order; the stream
/// ends after the job's terminal event.
pub async fn job_events(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    // Subscribe before reading the journal so no event can fall in between;
    // duplicates are filtered below by sequence number.
    let rx = state.event_bus.subscribe();

    let journal = state
        .orchestrator
        .journal(job_id)
        .await
        .ok_or_else(|| job_not_found(job_id))?;

    let last_seq = journal.last().map(|e| e.seq).unwrap_or(0);
    let finished = journal.iter().any(JobEvent::is_terminal);
    let replay = stream::iter(journal.into_iter().map(to_sse_event));

    let live = if finished {
        stream::empty().boxed()
    } else {
        stream::unfold((rx, false), move |(mut rx, done)| async move {
            if done {
                return None;
            }
            loop {
                match rx.recv().await {
                    Ok(event) if event.job_id == job_id && event.seq > last_seq => {
                        let terminal = event.is_terminal();
                        return Some((to_sse_event(event), (rx, terminal)));
                    }
                    Ok(_) => continue,
                    // Lagged receivers skip ahead to the oldest retained event.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    };

    let stream = replay.chain(live);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

fn to_sse_event(event: JobEvent) -> Result<Event, Infallible> {
    let name = event.kind.name();
    match Event::default().event(name).json_data(&event) {
        Ok(sse) => Ok(sse),
        Err(error) => {
            tracing::error!(job_id = %event.job_id, %error, "Failed to serialize job event");
            Ok(Event::default().event(name))
        }
    }
}

fn job_not_found(job_id: JobId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Job",
        id: job_id.to_string(),
    })
}
