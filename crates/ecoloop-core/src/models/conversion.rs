//! Conversion request types — transient, not persisted beyond the
//! ledger entries they produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How inbound money is captured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Upi { vpa: String },
    Card { token: String },
    NetBanking { bank_code: String },
}

/// Where an outbound payout lands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PayoutDestination {
    Upi { vpa: String },
    BankAccount { account_number: String, ifsc: String },
}

/// A requested money ↔ credits conversion. The variant is the
/// direction; `credit_amount = external_amount × conversion_rate`
/// with the rate a single deployment-wide constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConversionRequest {
    /// Inbound: capture `external_amount` rupees, mint credits.
    ToCredits {
        user_id: Uuid,
        external_amount: u64,
        method: PaymentMethod,
    },
    /// Outbound: burn `credit_amount` credits, pay out rupees.
    ToMoney {
        user_id: Uuid,
        credit_amount: u64,
        destination: PayoutDestination,
    },
}

impl ConversionRequest {
    pub fn user_id(&self) -> Uuid {
        match self {
            ConversionRequest::ToCredits { user_id, .. } => *user_id,
            ConversionRequest::ToMoney { user_id, .. } => *user_id,
        }
    }
}

/// Acknowledgement that a conversion was started and its challenge
/// dispatched. Carries the expiry only — the code itself travels
/// out-of-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionTicket {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
