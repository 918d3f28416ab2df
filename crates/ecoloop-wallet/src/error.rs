//! Settlement error types — the caller-facing failure reasons.

use ecoloop_core::error::EcoloopError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient balance: have {available}, need {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    #[error("account not found")]
    AccountNotFound,

    #[error("account already registered")]
    AccountExists,

    #[error("an OTP challenge is required")]
    OtpRequired,

    #[error("the OTP challenge has expired")]
    OtpExpired,

    #[error("the OTP code does not match")]
    OtpMismatch,

    #[error("OTP delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("payment capture failed: {0}")]
    PaymentFailed(String),

    #[error("payout failed: {0}")]
    PayoutFailed(String),

    #[error("item unavailable: {0}")]
    ItemUnavailable(String),

    #[error("inventory update failed: {0}")]
    InventoryFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SettlementError {
    /// Stable machine-readable reason code for API surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::InvalidAmount(_) => "INVALID_AMOUNT",
            SettlementError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            SettlementError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            SettlementError::AccountExists => "ACCOUNT_EXISTS",
            SettlementError::OtpRequired => "OTP_REQUIRED",
            SettlementError::OtpExpired => "OTP_EXPIRED",
            SettlementError::OtpMismatch => "OTP_MISMATCH",
            SettlementError::DeliveryFailed(_) => "OTP_DELIVERY_FAILED",
            SettlementError::PaymentFailed(_) => "EXTERNAL_PAYMENT_FAILED",
            SettlementError::PayoutFailed(_) => "EXTERNAL_PAYOUT_FAILED",
            SettlementError::ItemUnavailable(_) => "ITEM_UNAVAILABLE",
            SettlementError::InventoryFailed(_) => "INVENTORY_FAILED",
            SettlementError::Internal(_) => "INTERNAL",
        }
    }
}

/// Translate store-layer errors into caller-facing reasons without
/// leaking storage detail.
impl From<EcoloopError> for SettlementError {
    fn from(err: EcoloopError) -> Self {
        match err {
            EcoloopError::NotFound { ref entity, .. } if entity.starts_with("account") => {
                SettlementError::AccountNotFound
            }
            EcoloopError::AlreadyExists { .. } => SettlementError::AccountExists,
            EcoloopError::InsufficientBalance { balance, requested } => {
                SettlementError::InsufficientBalance {
                    available: balance,
                    requested,
                }
            }
            EcoloopError::Validation { message } => SettlementError::InvalidAmount(message),
            other => SettlementError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_translate_to_caller_reasons() {
        let err: SettlementError = EcoloopError::NotFound {
            entity: "account".into(),
            id: "x".into(),
        }
        .into();
        assert!(matches!(err, SettlementError::AccountNotFound));
        assert_eq!(err.code(), "ACCOUNT_NOT_FOUND");

        let err: SettlementError = EcoloopError::InsufficientBalance {
            balance: 5,
            requested: 9,
        }
        .into();
        assert!(matches!(
            err,
            SettlementError::InsufficientBalance {
                available: 5,
                requested: 9,
            }
        ));
    }
}
