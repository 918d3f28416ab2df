//! OTP challenge domain model.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored challenge. Only the digest of the code is retained; the raw
/// code exists once, in [`IssuedOtp`], on its way to the delivery
/// channel.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub user_id: Uuid,
    /// SHA-256 hex digest of the 6-digit code.
    pub code_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued challenge, handed to the out-of-band delivery
/// channel. Deliberately not serializable: the code must never ride
/// along in a caller-facing response.
#[derive(Debug)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}
