//! External collaborator traits.
//!
//! Payment capture, payouts, marketplace inventory, and OTP delivery
//! are opaque collaborators behind these seams. The settlement layer
//! awaits them with a timeout; mock implementations stand in for them
//! in tests.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::conversion::{PaymentMethod, PayoutDestination};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider refused the operation (card declined, account
    /// blocked, item gone). Definitive — no money moved.
    #[error("declined: {0}")]
    Declined(String),

    /// The provider could not be reached or did not answer in time.
    /// Indeterminate for outbound payouts — money may have left.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Result of a successful inbound payment capture.
#[derive(Debug, Clone)]
pub struct PaymentCapture {
    /// Provider-side reference for the captured payment.
    pub reference: String,
}

/// Provider-side status of an initiated payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutStatus {
    Completed,
    Pending,
}

#[derive(Debug, Clone)]
pub struct PayoutInitiation {
    pub reference: String,
    pub status: PayoutStatus,
}

/// Availability and price of a marketplace item.
#[derive(Debug, Clone)]
pub struct ItemQuote {
    pub item_id: String,
    /// Price in EcoCredits.
    pub price: u64,
    pub available: bool,
}

pub trait PaymentGateway: Send + Sync {
    /// Capture `amount` rupees via `method`. Must succeed before any
    /// credit is recorded.
    fn capture(
        &self,
        user_id: Uuid,
        amount: u64,
        method: &PaymentMethod,
    ) -> impl Future<Output = Result<PaymentCapture, GatewayError>> + Send;
}

pub trait PayoutProvider: Send + Sync {
    /// Initiate a payout of `amount` rupees. `reference` is the
    /// caller-generated correlation id recorded on the ledger entry;
    /// providers treat it as an idempotency key.
    fn initiate(
        &self,
        user_id: Uuid,
        amount: u64,
        destination: &PayoutDestination,
        reference: &str,
    ) -> impl Future<Output = Result<PayoutInitiation, GatewayError>> + Send;
}

pub trait MarketplaceInventory: Send + Sync {
    fn quote(&self, item_id: &str)
    -> impl Future<Output = Result<ItemQuote, GatewayError>> + Send;

    /// Decrement stock for a purchased item. A failure after the
    /// ledger debit triggers a compensating refund entry.
    fn decrement_stock(&self, item_id: &str)
    -> impl Future<Output = Result<(), GatewayError>> + Send;
}

pub trait OtpDelivery: Send + Sync {
    /// Deliver the raw code out-of-band (SMS / app push). The code is
    /// never echoed through a caller-facing response.
    fn deliver(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
