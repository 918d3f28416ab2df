//! Wallet configuration.

/// Configuration for the settlement service.
///
/// The conversion rate is the single authoritative constant for a
/// deployment — no other module may derive its own rate.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// EcoCredits minted per rupee (default: 10).
    pub conversion_rate: u64,
    /// EcoCredits granted when an account is first registered
    /// (default: 100).
    pub welcome_bonus: u64,
    /// OTP challenge lifetime in seconds (default: 300 = 5 minutes).
    pub otp_lifetime_secs: u64,
    /// Timeout for external payment/payout/inventory calls in seconds
    /// (default: 30).
    pub external_timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            conversion_rate: 10,
            welcome_bonus: 100,
            otp_lifetime_secs: 300,
            external_timeout_secs: 30,
        }
    }
}
