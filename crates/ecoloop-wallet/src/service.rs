//! Settlement service — conversion, purchase, and reward
//! orchestration.
//!
//! The sole caller-facing use-case surface: every balance mutation in
//! the system flows through here into the ledger store. Generic over
//! the store and the external collaborators so the wallet layer has no
//! dependency on the database crate or any concrete provider.

use std::sync::Arc;
use std::time::Duration;

use ecoloop_core::gateway::{
    GatewayError, MarketplaceInventory, OtpDelivery, PaymentGateway, PayoutProvider, PayoutStatus,
};
use ecoloop_core::models::account::Account;
use ecoloop_core::models::conversion::{
    ConversionRequest, ConversionTicket, PaymentMethod, PayoutDestination,
};
use ecoloop_core::models::ledger::{CreateLedgerEntry, EntryKind, LedgerEntry};
use ecoloop_core::repository::{LedgerStore, PaginatedResult, Pagination, SettleOutcome};
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::WalletConfig;
use crate::error::SettlementError;
use crate::otp::OtpChallengeManager;

/// Settlement service.
pub struct SettlementService<L, P, Y, I, D>
where
    L: LedgerStore,
    P: PaymentGateway,
    Y: PayoutProvider,
    I: MarketplaceInventory,
    D: OtpDelivery,
{
    ledger: L,
    payments: P,
    payouts: Y,
    inventory: I,
    delivery: D,
    otp: Arc<OtpChallengeManager>,
    config: WalletConfig,
}

impl<L, P, Y, I, D> SettlementService<L, P, Y, I, D>
where
    L: LedgerStore,
    P: PaymentGateway,
    Y: PayoutProvider,
    I: MarketplaceInventory,
    D: OtpDelivery,
{
    pub fn new(
        ledger: L,
        payments: P,
        payouts: Y,
        inventory: I,
        delivery: D,
        config: WalletConfig,
    ) -> Self {
        let otp = Arc::new(OtpChallengeManager::new(config.otp_lifetime_secs));
        Self::with_challenge_manager(ledger, payments, payouts, inventory, delivery, otp, config)
    }

    /// Construct with an externally owned challenge manager (so a
    /// deployment can share it with the periodic sweeper).
    pub fn with_challenge_manager(
        ledger: L,
        payments: P,
        payouts: Y,
        inventory: I,
        delivery: D,
        otp: Arc<OtpChallengeManager>,
        config: WalletConfig,
    ) -> Self {
        Self {
            ledger,
            payments,
            payouts,
            inventory,
            delivery,
            otp,
            config,
        }
    }

    /// Await an external collaborator with the configured timeout.
    async fn external<T>(
        &self,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        match timeout(Duration::from_secs(self.config.external_timeout_secs), fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Unavailable("call timed out".into())),
        }
    }

    /// Credit amount for an inbound conversion of `external_amount`
    /// rupees; rejects zero and overflowing amounts.
    fn inbound_credit_amount(&self, external_amount: u64) -> Result<u64, SettlementError> {
        if external_amount == 0 {
            return Err(SettlementError::InvalidAmount(
                "external amount must be positive".into(),
            ));
        }
        external_amount
            .checked_mul(self.config.conversion_rate)
            .ok_or_else(|| SettlementError::InvalidAmount("external amount out of range".into()))
    }

    /// Validate an outbound `credit_amount`: positive and a multiple
    /// of the rate, so the rupee payout is integral.
    fn outbound_credit_amount(&self, credit_amount: u64) -> Result<u64, SettlementError> {
        let rate = self.config.conversion_rate;
        if credit_amount == 0 {
            return Err(SettlementError::InvalidAmount(
                "credit amount must be positive".into(),
            ));
        }
        if credit_amount % rate != 0 {
            return Err(SettlementError::InvalidAmount(format!(
                "credit amount must be a multiple of {rate}"
            )));
        }
        Ok(credit_amount)
    }

    fn credit_amount_for(&self, request: &ConversionRequest) -> Result<u64, SettlementError> {
        match request {
            ConversionRequest::ToCredits {
                external_amount, ..
            } => self.inbound_credit_amount(*external_amount),
            ConversionRequest::ToMoney { credit_amount, .. } => {
                self.outbound_credit_amount(*credit_amount)
            }
        }
    }

    // -------------------------------------------------------------------
    // Account lifecycle & reads
    // -------------------------------------------------------------------

    /// Create the account for a newly registered user, seeded with the
    /// configured welcome bonus.
    pub async fn register_account(&self, user_id: Uuid) -> Result<Account, SettlementError> {
        let account = self
            .ledger
            .create_account(user_id, self.config.welcome_bonus)
            .await?;
        info!(%user_id, balance = account.balance, "Account registered");
        Ok(account)
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<u64, SettlementError> {
        Ok(self.ledger.get_balance(user_id).await?)
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResult<LedgerEntry>, SettlementError> {
        Ok(self.ledger.list_entries(user_id, pagination).await?)
    }

    // -------------------------------------------------------------------
    // Conversions (OTP-gated)
    // -------------------------------------------------------------------

    /// Start a conversion: validate the request, issue the challenge,
    /// and dispatch the code out-of-band. The returned ticket carries
    /// the expiry only — never the code.
    pub async fn begin_conversion(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionTicket, SettlementError> {
        let user_id = request.user_id();

        // 1. Validate the amount before anything is issued.
        let credit_amount = self.credit_amount_for(request)?;

        // 2. An outbound conversion that cannot succeed must not spend
        //    a challenge: check the balance first.
        if let ConversionRequest::ToMoney { .. } = request {
            let available = self.ledger.get_balance(user_id).await?;
            if available < credit_amount {
                return Err(SettlementError::InsufficientBalance {
                    available,
                    requested: credit_amount,
                });
            }
        } else {
            // Inbound conversions still require an existing account.
            self.ledger.get_account(user_id).await?;
        }

        // 3. Issue (replacing any prior challenge) and deliver.
        let issued = self.otp.issue(user_id).await;
        let expires_at = issued.expires_at;
        self.external(self.delivery.deliver(user_id, &issued.code, expires_at))
            .await
            .map_err(|e| SettlementError::DeliveryFailed(e.to_string()))?;

        info!(%user_id, %expires_at, "Conversion challenge issued");
        Ok(ConversionTicket {
            user_id,
            expires_at,
        })
    }

    /// Resume a conversion with the user-submitted code.
    pub async fn complete_conversion(
        &self,
        request: &ConversionRequest,
        code: &str,
    ) -> Result<(Account, LedgerEntry), SettlementError> {
        match request {
            ConversionRequest::ToCredits {
                user_id,
                external_amount,
                method,
            } => {
                self.convert_to_credits(*user_id, *external_amount, method, code)
                    .await
            }
            ConversionRequest::ToMoney {
                user_id,
                credit_amount,
                destination,
            } => {
                self.convert_to_money(*user_id, *credit_amount, destination, code)
                    .await
            }
        }
    }

    /// Money → credits. The ledger mutation never happens before the
    /// money is confirmed captured.
    pub async fn convert_to_credits(
        &self,
        user_id: Uuid,
        external_amount: u64,
        method: &PaymentMethod,
        code: &str,
    ) -> Result<(Account, LedgerEntry), SettlementError> {
        // 1. Validate and derive the credit amount.
        let credit_amount = self.inbound_credit_amount(external_amount)?;

        // 2. Verify the challenge (consumes it on success).
        self.otp.verify(user_id, code).await?;

        // 3. Capture the money. Nothing is recorded until this
        //    succeeds; a timeout or decline commits nothing.
        let capture = self
            .external(self.payments.capture(user_id, external_amount, method))
            .await
            .map_err(|e| SettlementError::PaymentFailed(e.to_string()))?;

        // 4. Credit the account atomically with its ledger entry.
        let (account, entry) = self
            .ledger
            .apply_entry(CreateLedgerEntry {
                user_id,
                kind: EntryKind::ConvertedToCredits,
                amount: credit_amount,
                description: format!(
                    "Converted Rs {external_amount} to {credit_amount} EcoCredits"
                ),
                payment_reference: Some(capture.reference),
            })
            .await?;

        info!(%user_id, credit_amount, balance = account.balance, "Conversion to credits settled");
        Ok((account, entry))
    }

    /// Credits → money. The credits are held in a `Processing` entry
    /// while the payout runs; an explicit decline releases the hold,
    /// a timeout leaves it for reconciliation via
    /// [`Self::confirm_payout`].
    pub async fn convert_to_money(
        &self,
        user_id: Uuid,
        credit_amount: u64,
        destination: &PayoutDestination,
        code: &str,
    ) -> Result<(Account, LedgerEntry), SettlementError> {
        // 1. Validate; derive the rupee amount.
        let credit_amount = self.outbound_credit_amount(credit_amount)?;
        let rupee_amount = credit_amount / self.config.conversion_rate;

        // 2. Verify the challenge.
        self.otp.verify(user_id, code).await?;

        // 3. Hold the credits. Rejects with InsufficientBalance before
        //    any money moves.
        let reference = format!("payout-{}", Uuid::new_v4());
        let (account, entry) = self
            .ledger
            .apply_processing_entry(CreateLedgerEntry {
                user_id,
                kind: EntryKind::ConvertedToMoney,
                amount: credit_amount,
                description: format!(
                    "Converted {credit_amount} EcoCredits to Rs {rupee_amount}"
                ),
                payment_reference: Some(reference.clone()),
            })
            .await?;

        // 4. Initiate the payout against the hold.
        match self
            .external(
                self.payouts
                    .initiate(user_id, rupee_amount, destination, &reference),
            )
            .await
        {
            Ok(initiation) => match initiation.status {
                PayoutStatus::Completed => {
                    let (account, entry) = self
                        .ledger
                        .settle_entry(user_id, entry.id, SettleOutcome::Completed)
                        .await?;
                    info!(%user_id, credit_amount, "Payout settled");
                    Ok((account, entry))
                }
                PayoutStatus::Pending => {
                    info!(%user_id, entry_id = %entry.id, "Payout pending confirmation");
                    Ok((account, entry))
                }
            },
            Err(GatewayError::Declined(reason)) => {
                // Definitive failure: release the hold.
                self.ledger
                    .settle_entry(user_id, entry.id, SettleOutcome::Failed)
                    .await?;
                warn!(%user_id, entry_id = %entry.id, %reason, "Payout declined, hold released");
                Err(SettlementError::PayoutFailed(reason))
            }
            Err(GatewayError::Unavailable(reason)) => {
                // Indeterminate: money may have left. The entry stays
                // Processing until reconciliation confirms either way.
                warn!(%user_id, entry_id = %entry.id, %reason, "Payout outcome unknown, hold kept");
                Err(SettlementError::PayoutFailed(reason))
            }
        }
    }

    /// Payout confirmation callback: settle the `Processing` hold.
    pub async fn confirm_payout(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        succeeded: bool,
    ) -> Result<(Account, LedgerEntry), SettlementError> {
        let outcome = if succeeded {
            SettleOutcome::Completed
        } else {
            SettleOutcome::Failed
        };
        let (account, entry) = self.ledger.settle_entry(user_id, entry_id, outcome).await?;
        info!(%user_id, %entry_id, succeeded, "Payout confirmation applied");
        Ok((account, entry))
    }

    // -------------------------------------------------------------------
    // Marketplace & rewards
    // -------------------------------------------------------------------

    /// Spend credits on a marketplace item. If the stock decrement
    /// fails after the debit, a compensating refund entry restores the
    /// amount — never a silent loss.
    pub async fn purchase(
        &self,
        user_id: Uuid,
        item_id: &str,
    ) -> Result<(Account, LedgerEntry), SettlementError> {
        // 1. Quote availability and price.
        let quote = self
            .external(self.inventory.quote(item_id))
            .await
            .map_err(|e| SettlementError::InventoryFailed(e.to_string()))?;
        if !quote.available {
            return Err(SettlementError::ItemUnavailable(item_id.into()));
        }

        // 2. Fail fast on balance; the store re-checks under its lock.
        let available = self.ledger.get_balance(user_id).await?;
        if available < quote.price {
            return Err(SettlementError::InsufficientBalance {
                available,
                requested: quote.price,
            });
        }

        // 3. Debit the price.
        let reference = format!("purchase-{}", Uuid::new_v4());
        let (account, entry) = self
            .ledger
            .apply_entry(CreateLedgerEntry {
                user_id,
                kind: EntryKind::Spent,
                amount: quote.price,
                description: format!("Marketplace purchase: {item_id}"),
                payment_reference: Some(reference),
            })
            .await?;

        // 4. Decrement stock; compensate the debit if that fails.
        if let Err(reason) = self.external(self.inventory.decrement_stock(item_id)).await {
            warn!(%user_id, item_id, %reason, "Stock decrement failed, refunding");
            let refund = self
                .ledger
                .apply_entry(CreateLedgerEntry {
                    user_id,
                    kind: EntryKind::Earned,
                    amount: quote.price,
                    description: format!("Refund: purchase of {item_id} was not fulfilled"),
                    payment_reference: Some(entry.id.to_string()),
                })
                .await;
            if let Err(e) = refund {
                // The debit stands without its compensation: manual
                // reconciliation territory, never a silent retry.
                error!(%user_id, entry_id = %entry.id, error = %e, "Compensating refund failed");
                return Err(SettlementError::Internal(format!(
                    "purchase debit {} requires manual reconciliation: {e}",
                    entry.id
                )));
            }
            return Err(SettlementError::InventoryFailed(reason.to_string()));
        }

        info!(%user_id, item_id, price = quote.price, "Purchase settled");
        Ok((account, entry))
    }

    /// Credit an admin-approved pickup reward. A credit in the user's
    /// favor carries no fraud risk against the platform, so no OTP
    /// gate applies.
    pub async fn award_pickup_reward(
        &self,
        user_id: Uuid,
        amount: u64,
        description: &str,
    ) -> Result<(Account, LedgerEntry), SettlementError> {
        if amount == 0 {
            return Err(SettlementError::InvalidAmount(
                "reward amount must be positive".into(),
            ));
        }

        let (account, entry) = self
            .ledger
            .apply_entry(CreateLedgerEntry {
                user_id,
                kind: EntryKind::Earned,
                amount,
                description: description.into(),
                payment_reference: None,
            })
            .await?;

        info!(%user_id, amount, balance = account.balance, "Pickup reward credited");
        Ok((account, entry))
    }

    /// Evict expired OTP challenges; returns the number removed.
    pub async fn sweep_expired_challenges(&self) -> usize {
        self.otp.sweep_expired().await
    }
}
