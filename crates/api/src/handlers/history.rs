//! Handlers for the generation history.
//!
//! Routes:
//! - `GET    /history`               — list entries, most-recent first
//! - `DELETE /history/{id}`          — remove an entry (no-op when absent)
//! - `POST   /history/{id}/restore`  — read-only restore of an entry

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use vizcode_core::types::EntryId;
use vizcode_core::CoreError;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteHistoryResponse {
    pub id: EntryId,
    pub removed: bool,
}

/// GET /api/v1/history
pub async fn list_history(State(state): State<AppState>) -> impl IntoResponse {
    Json(DataResponse {
        data: state.history.list(),
    })
}

/// DELETE /api/v1/history/{id}
///
/// Removing an absent entry is a no-op, reported via `removed: false`.
pub async fn delete_history_entry(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> impl IntoResponse {
    let removed = state.history.remove(id);
    Json(DataResponse {
        data: DeleteHistoryResponse { id, removed },
    })
}

/// POST /api/v1/history/{id}/restore
///
/// Returns the entry so a new editing session can be repopulated from it.
/// Never mutates the store.
pub async fn restore_history_entry(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let entry = state.history.restore(id).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "HistoryEntry",
            id: id.to_string(),
        })
    })?;

    Ok(Json(DataResponse { data: entry }))
}
