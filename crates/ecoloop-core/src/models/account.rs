//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Owned by the external identity provider; trusted as-is.
    pub user_id: Uuid,
    /// Current EcoCredits balance. Never negative.
    pub balance: u64,
    /// `seq` of the account's latest ledger entry. Incremented in the
    /// same transaction as every entry insert, so it doubles as a
    /// write-versioning witness.
    pub entry_seq: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
