//! Handler for the model catalog.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/models
///
/// Lists the model catalog in registry-insertion order.
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    Json(DataResponse {
        data: state.registry.list().to_vec(),
    })
}
