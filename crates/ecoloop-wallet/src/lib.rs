//! Ecoloop Wallet — OTP challenge management and settlement
//! orchestration over the ledger store.

pub mod config;
pub mod error;
pub mod otp;
pub mod service;

pub use config::WalletConfig;
pub use error::SettlementError;
pub use otp::OtpChallengeManager;
pub use service::SettlementService;
