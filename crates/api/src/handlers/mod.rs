//! Request handlers.
//!
//! Each submodule provides async handler functions for one surface of the
//! API (generation workflow, model catalog, credits, history). Handlers
//! delegate to the shared state in [`crate::state::AppState`] and map
//! domain errors via [`crate::error::AppError`].

pub mod credits;
pub mod generation;
pub mod history;
pub mod models;
