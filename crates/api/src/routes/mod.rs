pub mod health;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{credits, generation, history, models};
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// GET    /models                      model catalog, insertion order
/// GET    /credits                     session account balance
///
/// POST   /generations                 submit a generation job
/// GET    /generations/{id}            job snapshot
/// GET    /generations/{id}/events     SSE status transition stream
/// POST   /generations/{id}/cancel     request cancellation
///
/// GET    /history                     list entries, most-recent first
/// DELETE /history/{id}                remove an entry
/// POST   /history/{id}/restore        read-only restore
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(models::list_models))
        .route("/credits", get(credits::get_credits))
        .route("/generations", post(generation::create_generation))
        .route("/generations/{id}", get(generation::get_generation))
        .route("/generations/{id}/events", get(generation::job_events))
        .route(
            "/generations/{id}/cancel",
            post(generation::cancel_generation),
        )
        .route("/history", get(history::list_history))
        .route("/history/{id}", delete(history::delete_history_entry))
        .route("/history/{id}/restore", post(history::restore_history_entry))
}
