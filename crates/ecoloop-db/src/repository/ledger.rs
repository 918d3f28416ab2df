//! SurrealDB implementation of [`LedgerStore`].
//!
//! Balance mutations for one account are serialized through a
//! per-account async lock, then committed as a single SurrealDB
//! transaction (entry insert + balance update). Calls for different
//! accounts proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ecoloop_core::error::{EcoloopError, EcoloopResult};
use ecoloop_core::models::account::Account;
use ecoloop_core::models::ledger::{CreateLedgerEntry, EntryKind, EntryStatus, LedgerEntry};
use ecoloop_core::repository::{LedgerStore, PaginatedResult, Pagination, SettleOutcome};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AccountRow {
    balance: u64,
    entry_seq: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self, user_id: Uuid) -> Account {
        Account {
            user_id,
            balance: self.balance,
            entry_seq: self.entry_seq,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct for queries where the entry UUID is already known.
#[derive(Debug, SurrealValue)]
struct EntryRow {
    user_id: String,
    seq: u64,
    kind: String,
    amount: u64,
    description: String,
    payment_reference: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct EntryRowWithId {
    record_id: String,
    user_id: String,
    seq: u64,
    kind: String,
    amount: u64,
    description: String,
    payment_reference: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_kind(s: &str) -> Result<EntryKind, DbError> {
    match s {
        "Earned" => Ok(EntryKind::Earned),
        "Spent" => Ok(EntryKind::Spent),
        "ConvertedToCredits" => Ok(EntryKind::ConvertedToCredits),
        "ConvertedToMoney" => Ok(EntryKind::ConvertedToMoney),
        other => Err(DbError::Migration(format!("unknown entry kind: {other}"))),
    }
}

fn kind_to_string(kind: &EntryKind) -> &'static str {
    match kind {
        EntryKind::Earned => "Earned",
        EntryKind::Spent => "Spent",
        EntryKind::ConvertedToCredits => "ConvertedToCredits",
        EntryKind::ConvertedToMoney => "ConvertedToMoney",
    }
}

fn parse_status(s: &str) -> Result<EntryStatus, DbError> {
    match s {
        "Pending" => Ok(EntryStatus::Pending),
        "Processing" => Ok(EntryStatus::Processing),
        "Completed" => Ok(EntryStatus::Completed),
        "Failed" => Ok(EntryStatus::Failed),
        other => Err(DbError::Migration(format!("unknown entry status: {other}"))),
    }
}

fn status_to_string(status: &EntryStatus) -> &'static str {
    match status {
        EntryStatus::Pending => "Pending",
        EntryStatus::Processing => "Processing",
        EntryStatus::Completed => "Completed",
        EntryStatus::Failed => "Failed",
    }
}

impl EntryRow {
    fn into_entry(self, id: Uuid) -> Result<LedgerEntry, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        Ok(LedgerEntry {
            id,
            user_id,
            seq: self.seq,
            kind: parse_kind(&self.kind)?,
            amount: self.amount,
            description: self.description,
            payment_reference: self.payment_reference,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
        })
    }
}

impl EntryRowWithId {
    fn try_into_entry(self) -> Result<LedgerEntry, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        Ok(LedgerEntry {
            id,
            user_id,
            seq: self.seq,
            kind: parse_kind(&self.kind)?,
            amount: self.amount,
            description: self.description,
            payment_reference: self.payment_reference,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the ledger store.
#[derive(Clone)]
pub struct SurrealLedgerStore<C: Connection> {
    db: Surreal<C>,
    /// Per-account write locks; shared across clones of the store.
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl<C: Connection> SurrealLedgerStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The serialization primitive for one account's mutations.
    async fn lock_for(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(user_id).or_default().clone()
    }

    async fn fetch_account(&self, user_id: Uuid) -> EcoloopResult<Account> {
        let id_str = user_id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('account', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "account".into(),
            id: id_str,
        })?;

        Ok(row.into_account(user_id))
    }

    async fn fetch_entry(&self, user_id: Uuid, entry_id: Uuid) -> EcoloopResult<LedgerEntry> {
        let id_str = entry_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('ledger_entry', $id) \
                 WHERE user_id = $user_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EntryRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "ledger_entry".into(),
            id: id_str,
        })?;

        Ok(row.into_entry(entry_id)?)
    }

    /// Shared path for completed and processing entries. Caller decides
    /// the committed status; the balance moves either way (a
    /// `Processing` debit is a hold).
    async fn apply_with_status(
        &self,
        input: CreateLedgerEntry,
        status: EntryStatus,
    ) -> EcoloopResult<(Account, LedgerEntry)> {
        if input.amount == 0 {
            return Err(EcoloopError::Validation {
                message: "entry amount must be positive".into(),
            });
        }

        let lock = self.lock_for(input.user_id).await;
        let _guard = lock.lock().await;

        // Re-read under the lock; the balance decision must see the
        // latest committed state.
        let account = self.fetch_account(input.user_id).await?;

        let new_balance = if input.kind.is_credit() {
            account
                .balance
                .checked_add(input.amount)
                .ok_or_else(|| EcoloopError::Internal("balance overflow".into()))?
        } else {
            if account.balance < input.amount {
                return Err(EcoloopError::InsufficientBalance {
                    balance: account.balance,
                    requested: input.amount,
                });
            }
            account.balance - input.amount
        };

        let seq = account.entry_seq + 1;
        let entry_id = Uuid::new_v4();

        // Entry insert and balance update commit or fail together.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::record('account', $user_id) SET \
                 balance = $balance, entry_seq = $seq, \
                 updated_at = time::now(); \
                 CREATE type::record('ledger_entry', $entry_id) SET \
                 user_id = $user_id, seq = $seq, kind = $kind, \
                 amount = $amount, description = $description, \
                 payment_reference = $payment_reference, \
                 status = $status; \
                 COMMIT TRANSACTION;",
            )
            .bind(("user_id", input.user_id.to_string()))
            .bind(("balance", new_balance))
            .bind(("seq", seq))
            .bind(("entry_id", entry_id.to_string()))
            .bind(("kind", kind_to_string(&input.kind).to_string()))
            .bind(("amount", input.amount))
            .bind(("description", input.description))
            .bind(("payment_reference", input.payment_reference))
            .bind(("status", status_to_string(&status).to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let account = self.fetch_account(input.user_id).await?;
        let entry = self.fetch_entry(input.user_id, entry_id).await?;

        Ok((account, entry))
    }
}

impl<C: Connection> LedgerStore for SurrealLedgerStore<C> {
    async fn create_account(&self, user_id: Uuid, initial_balance: u64) -> EcoloopResult<Account> {
        let lock = self.lock_for(user_id).await;
        let _guard = lock.lock().await;

        if self.fetch_account(user_id).await.is_ok() {
            return Err(EcoloopError::AlreadyExists {
                entity: format!("account {user_id}"),
            });
        }

        let id_str = user_id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('account', $id) SET \
                 balance = $balance, entry_seq = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("balance", initial_balance))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "account".into(),
            id: id_str,
        })?;

        Ok(row.into_account(user_id))
    }

    async fn get_account(&self, user_id: Uuid) -> EcoloopResult<Account> {
        self.fetch_account(user_id).await
    }

    async fn get_balance(&self, user_id: Uuid) -> EcoloopResult<u64> {
        Ok(self.fetch_account(user_id).await?.balance)
    }

    async fn apply_entry(&self, input: CreateLedgerEntry) -> EcoloopResult<(Account, LedgerEntry)> {
        self.apply_with_status(input, EntryStatus::Completed).await
    }

    async fn apply_processing_entry(
        &self,
        input: CreateLedgerEntry,
    ) -> EcoloopResult<(Account, LedgerEntry)> {
        self.apply_with_status(input, EntryStatus::Processing).await
    }

    async fn settle_entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        outcome: SettleOutcome,
    ) -> EcoloopResult<(Account, LedgerEntry)> {
        let lock = self.lock_for(user_id).await;
        let _guard = lock.lock().await;

        let entry = self.fetch_entry(user_id, entry_id).await?;
        if entry.status != EntryStatus::Processing {
            return Err(EcoloopError::Validation {
                message: format!(
                    "ledger entry {entry_id} is {:?}, not Processing",
                    entry.status
                ),
            });
        }

        match outcome {
            SettleOutcome::Completed => {
                self.db
                    .query(
                        "UPDATE type::record('ledger_entry', $id) SET \
                         status = 'Completed'",
                    )
                    .bind(("id", entry_id.to_string()))
                    .await
                    .map_err(DbError::from)?
                    .check()
                    .map_err(|e| DbError::Migration(e.to_string()))?;
            }
            SettleOutcome::Failed => {
                // Release the hold: the entry flips to Failed and the
                // debited amount returns to the balance atomically.
                let account = self.fetch_account(user_id).await?;
                let restored = account
                    .balance
                    .checked_add(entry.amount)
                    .ok_or_else(|| EcoloopError::Internal("balance overflow".into()))?;

                self.db
                    .query(
                        "BEGIN TRANSACTION; \
                         UPDATE type::record('account', $user_id) SET \
                         balance = $balance, updated_at = time::now(); \
                         UPDATE type::record('ledger_entry', $id) SET \
                         status = 'Failed'; \
                         COMMIT TRANSACTION;",
                    )
                    .bind(("user_id", user_id.to_string()))
                    .bind(("balance", restored))
                    .bind(("id", entry_id.to_string()))
                    .await
                    .map_err(DbError::from)?
                    .check()
                    .map_err(|e| DbError::Migration(e.to_string()))?;
            }
        }

        let account = self.fetch_account(user_id).await?;
        let entry = self.fetch_entry(user_id, entry_id).await?;

        Ok((account, entry))
    }

    async fn list_entries(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> EcoloopResult<PaginatedResult<LedgerEntry>> {
        let user_id_str = user_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM ledger_entry \
                 WHERE user_id = $user_id GROUP ALL",
            )
            .bind(("user_id", user_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM ledger_entry \
                 WHERE user_id = $user_id \
                 ORDER BY seq DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("user_id", user_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EntryRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
