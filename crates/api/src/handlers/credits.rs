//! Handler for the session account's credit balance.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use vizcode_core::Tier;

use crate::config::SESSION_ACCOUNT_ID;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditBalance {
    pub plan: Tier,
    pub total: u32,
    pub consumed: u32,
    pub available: u32,
}

/// GET /api/v1/credits
///
/// Current quota of the session account.
pub async fn get_credits(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let account = state.ledger.account(SESSION_ACCOUNT_ID)?;

    Ok(Json(DataResponse {
        data: CreditBalance {
            plan: account.plan,
            total: account.total,
            consumed: account.consumed,
            available: account.available(),
        },
    }))
}
