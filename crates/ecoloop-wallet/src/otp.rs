//! One-time challenge issuance and verification.
//!
//! Challenges live in an in-process TTL map keyed by user id. This is
//! a liveness shortcut, not a correctness one: a restart invalidates
//! outstanding codes and merely forces re-issue. Only the SHA-256
//! digest of a code is retained — the raw code exists once, on its
//! way to the out-of-band delivery channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use ecoloop_core::models::otp::{IssuedOtp, OtpChallenge};
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::SettlementError;

/// SHA-256 hex digest of a challenge code — the only form stored.
fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Issues, stores, and validates single-use time-bound numeric codes.
///
/// At most one active challenge exists per user; issuing always fully
/// replaces, never merges.
pub struct OtpChallengeManager {
    challenges: Mutex<HashMap<Uuid, OtpChallenge>>,
    lifetime: Duration,
}

impl OtpChallengeManager {
    pub fn new(lifetime_secs: u64) -> Self {
        Self {
            challenges: Mutex::new(HashMap::new()),
            lifetime: Duration::seconds(lifetime_secs as i64),
        }
    }

    /// Generate a uniformly random 6-digit code (`000000`–`999999`,
    /// leading zeros preserved) and store its digest, invalidating any
    /// prior challenge for the user.
    pub async fn issue(&self, user_id: Uuid) -> IssuedOtp {
        let code = format!("{:06}", rand::rng().random_range(0..1_000_000u32));
        let now = Utc::now();
        let expires_at = now + self.lifetime;

        let challenge = OtpChallenge {
            user_id,
            code_hash: hash_code(&code),
            issued_at: now,
            expires_at,
        };
        self.challenges.lock().await.insert(user_id, challenge);

        IssuedOtp { code, expires_at }
    }

    /// Verify and consume a challenge.
    ///
    /// A mismatch leaves the challenge in place so the user can retry
    /// until expiry; expiry discards it; a match consumes it — a
    /// consumed challenge cannot be verified again.
    pub async fn verify(&self, user_id: Uuid, submitted: &str) -> Result<(), SettlementError> {
        let mut challenges = self.challenges.lock().await;

        let challenge = challenges.get(&user_id).ok_or(SettlementError::OtpRequired)?;

        if Utc::now() > challenge.expires_at {
            challenges.remove(&user_id);
            return Err(SettlementError::OtpExpired);
        }

        if challenge.code_hash != hash_code(submitted) {
            return Err(SettlementError::OtpMismatch);
        }

        challenges.remove(&user_id);
        Ok(())
    }

    /// Evict expired challenges; returns the number removed.
    /// Idempotent and safe to run concurrently with itself.
    pub async fn sweep_expired(&self) -> usize {
        let mut challenges = self.challenges.lock().await;
        let before = challenges.len();
        let now = Utc::now();
        challenges.retain(|_, challenge| challenge.expires_at >= now);
        before - challenges.len()
    }
}

/// Periodically evict expired challenges until the task is aborted.
pub async fn run_sweeper(manager: Arc<OtpChallengeManager>, period: StdDuration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let evicted = manager.sweep_expired().await;
        if evicted > 0 {
            info!(evicted, "Evicted expired OTP challenges");
        }
    }
}
