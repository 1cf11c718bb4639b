//! Credit accounting: per-account quota tracking and the atomic
//! check-then-debit that gates generation requests.
//!
//! The ledger is the only mutable state shared between concurrently running
//! jobs (besides the history store). The affordability check and the debit
//! run inside one per-account critical section so two simultaneous requests
//! can never both pass the check before either debits.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{ModelDescriptor, Tier};
use crate::sync;
use crate::types::AccountId;

// ---------------------------------------------------------------------------
// RefundPolicy
// ---------------------------------------------------------------------------

/// What happens to already-debited credits when a job fails or is cancelled.
///
/// The product has historically kept the debit (provider cost is incurred
/// regardless of output quality), so `Keep` is the default; deployments that
/// prefer goodwill refunds can opt into `Refund`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefundPolicy {
    /// Debited credits stay consumed.
    #[default]
    Keep,
    /// Debited credits are returned to the account.
    Refund,
}

// ---------------------------------------------------------------------------
// CreditAccount
// ---------------------------------------------------------------------------

/// One account's quota within the current billing period.
///
/// `consumed` is monotonically non-decreasing within a period except for
/// explicit refunds; billing-cycle rollover is handled by an external
/// system that re-opens the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditAccount {
    pub plan: Tier,
    pub total: u32,
    pub consumed: u32,
}

impl CreditAccount {
    pub fn new(plan: Tier, total: u32) -> Self {
        Self {
            plan,
            total,
            consumed: 0,
        }
    }

    /// Credits still available. Never negative by construction.
    pub fn available(&self) -> u32 {
        self.total.saturating_sub(self.consumed)
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.available() >= cost
    }
}

// ---------------------------------------------------------------------------
// CreditLedger
// ---------------------------------------------------------------------------

/// Tracks consumed vs. available quota for every known account.
///
/// Thread-safe: account lookup goes through an outer `RwLock`, and every
/// balance mutation holds that account's own `Mutex` for the whole
/// check-then-act sequence.
#[derive(Debug, Default)]
pub struct CreditLedger {
    accounts: RwLock<HashMap<AccountId, Mutex<CreditAccount>>>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new account with a fresh quota.
    ///
    /// Stands in for the external signup / billing-rollover flow. Rejects
    /// ids that already exist so a stray re-open cannot silently reset a
    /// balance.
    pub fn open_account(
        &self,
        id: impl Into<AccountId>,
        plan: Tier,
        total: u32,
    ) -> Result<(), CoreError> {
        let id = id.into();
        let mut accounts = sync::write(&self.accounts);
        if accounts.contains_key(&id) {
            return Err(CoreError::Validation(format!(
                "Account '{id}' already exists"
            )));
        }
        accounts.insert(id, Mutex::new(CreditAccount::new(plan, total)));
        Ok(())
    }

    /// Snapshot of an account's current state.
    pub fn account(&self, id: &str) -> Result<CreditAccount, CoreError> {
        let accounts = sync::read(&self.accounts);
        let account = accounts.get(id).ok_or_else(|| not_found(id))?;
        let snapshot = *sync::lock(account);
        Ok(snapshot)
    }

    /// Credits the account can still spend.
    pub fn available_credits(&self, id: &str) -> Result<u32, CoreError> {
        Ok(self.account(id)?.available())
    }

    /// Whether the account could afford one generation with `model` right
    /// now. Advisory only; [`Self::debit`] re-checks atomically.
    pub fn can_afford(&self, id: &str, model: &ModelDescriptor) -> Result<bool, CoreError> {
        Ok(self.account(id)?.can_afford(model.credit_cost))
    }

    /// Atomically check affordability and debit the model's cost.
    ///
    /// Returns the new available balance, or
    /// [`CoreError::InsufficientCredits`] without touching the account.
    pub fn debit(&self, id: &str, model: &ModelDescriptor) -> Result<u32, CoreError> {
        let accounts = sync::read(&self.accounts);
        let account = accounts.get(id).ok_or_else(|| not_found(id))?;

        let mut account = sync::lock(account);
        if !account.can_afford(model.credit_cost) {
            return Err(CoreError::InsufficientCredits {
                required: model.credit_cost,
                available: account.available(),
            });
        }
        account.consumed += model.credit_cost;
        Ok(account.available())
    }

    /// Return previously debited credits to the account.
    ///
    /// Invoked by the orchestrator only under [`RefundPolicy::Refund`].
    /// Returns the new available balance.
    pub fn refund(&self, id: &str, amount: u32) -> Result<u32, CoreError> {
        let accounts = sync::read(&self.accounts);
        let account = accounts.get(id).ok_or_else(|| not_found(id))?;

        let mut account = sync::lock(account);
        account.consumed = account.consumed.saturating_sub(amount);
        Ok(account.available())
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "Account",
        id: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
