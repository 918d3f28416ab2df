//! Storage trait definitions for data access abstraction.
//!
//! All operations are async. The ledger store is the sole writer path
//! for balances: every mutation goes through [`LedgerStore::apply_entry`]
//! (or its processing/settle variants), and mutations for one account
//! are serialized by the implementation.

use uuid::Uuid;

use crate::error::EcoloopResult;
use crate::models::account::Account;
use crate::models::ledger::{CreateLedgerEntry, LedgerEntry};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Outcome applied when settling a `Processing` ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// External confirmation arrived; flip the entry to `Completed`.
    Completed,
    /// External side failed; flip to `Failed` and release the held
    /// amount back to the balance in the same transaction.
    Failed,
}

pub trait LedgerStore: Send + Sync {
    /// Fails with `AlreadyExists` if the account exists.
    fn create_account(
        &self,
        user_id: Uuid,
        initial_balance: u64,
    ) -> impl Future<Output = EcoloopResult<Account>> + Send;

    fn get_account(&self, user_id: Uuid) -> impl Future<Output = EcoloopResult<Account>> + Send;

    fn get_balance(&self, user_id: Uuid) -> impl Future<Output = EcoloopResult<u64>> + Send;

    /// Apply a completed balance change: re-reads the balance under the
    /// per-account serialization, rejects a debit that would go
    /// negative with `InsufficientBalance` (no partial application),
    /// then commits the entry insert and the balance update as a single
    /// atomic unit.
    fn apply_entry(
        &self,
        input: CreateLedgerEntry,
    ) -> impl Future<Output = EcoloopResult<(Account, LedgerEntry)>> + Send;

    /// Like [`Self::apply_entry`], but the entry is committed with
    /// status `Processing`: the amount is already debited (funds held)
    /// pending external confirmation via [`Self::settle_entry`].
    fn apply_processing_entry(
        &self,
        input: CreateLedgerEntry,
    ) -> impl Future<Output = EcoloopResult<(Account, LedgerEntry)>> + Send;

    /// Transition a `Processing` entry to `Completed` or `Failed`.
    /// Rejects entries in any other status.
    fn settle_entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        outcome: SettleOutcome,
    ) -> impl Future<Output = EcoloopResult<(Account, LedgerEntry)>> + Send;

    /// Entries for one account, newest-first, offset/limit restartable.
    fn list_entries(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = EcoloopResult<PaginatedResult<LedgerEntry>>> + Send;
}
