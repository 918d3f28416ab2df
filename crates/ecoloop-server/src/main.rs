//! Ecoloop Server — application entry point.

use std::sync::Arc;
use std::time::Duration;

use ecoloop_db::{DbConfig, DbManager};
use ecoloop_wallet::{OtpChallengeManager, WalletConfig, otp};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("ecoloop=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Ecoloop wallet service...");

    let db_config = DbConfig::from_env();
    let db = match DbManager::connect(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Database connection failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = ecoloop_db::run_migrations(db.client()).await {
        tracing::error!(error = %e, "Migrations failed");
        std::process::exit(1);
    }

    let wallet_config = WalletConfig::default();
    let challenges = Arc::new(OtpChallengeManager::new(wallet_config.otp_lifetime_secs));
    let sweeper = tokio::spawn(otp::run_sweeper(
        Arc::clone(&challenges),
        Duration::from_secs(60),
    ));

    // TODO: wire payment/payout/inventory/delivery adapters and the
    // REST surface onto SettlementService::with_challenge_manager.

    tracing::info!("Ecoloop wallet service ready");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    sweeper.abort();
    tracing::info!("Ecoloop wallet service stopped.");
}
