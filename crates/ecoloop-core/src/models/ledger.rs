//! Ledger entry domain model — one immutable record per balance change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryKind {
    /// Pickup rewards and compensating refunds.
    Earned,
    /// Marketplace purchases.
    Spent,
    /// Inbound money converted into EcoCredits.
    ConvertedToCredits,
    /// EcoCredits converted into an outbound payout.
    ConvertedToMoney,
}

impl EntryKind {
    /// Whether this kind credits the account. `Spent` and
    /// `ConvertedToMoney` debit it.
    pub fn is_credit(&self) -> bool {
        matches!(self, EntryKind::Earned | EntryKind::ConvertedToCredits)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    /// Funds held; awaiting external confirmation (outbound payouts).
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Position in the account's history; unique and monotonic per
    /// account.
    pub seq: u64,
    pub kind: EntryKind,
    /// Positive magnitude; sign implied by `kind`.
    pub amount: u64,
    pub description: String,
    /// External correlation id (payment capture, payout, purchase).
    pub payment_reference: Option<String>,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLedgerEntry {
    pub user_id: Uuid,
    pub kind: EntryKind,
    pub amount: u64,
    pub description: String,
    pub payment_reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_split_into_credits_and_debits() {
        assert!(EntryKind::Earned.is_credit());
        assert!(EntryKind::ConvertedToCredits.is_credit());
        assert!(!EntryKind::Spent.is_credit());
        assert!(!EntryKind::ConvertedToMoney.is_credit());
    }
}
