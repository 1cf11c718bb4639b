use std::sync::Arc;

use vizcode_core::{CreditLedger, HistoryStore, ModelRegistry};
use vizcode_engine::Orchestrator;
use vizcode_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Static model catalog.
    pub registry: Arc<ModelRegistry>,
    /// Credit accounting, shared with the orchestrator.
    pub ledger: Arc<CreditLedger>,
    /// Bounded generation history, shared with the orchestrator.
    pub history: Arc<HistoryStore>,
    /// Generation orchestrator (job admission, progress, cancellation).
    pub orchestrator: Arc<Orchestrator>,
    /// Centralized event bus for job lifecycle events.
    pub event_bus: Arc<EventBus>,
}
