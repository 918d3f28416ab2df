//! Ecoloop Database — SurrealDB connection management and the
//! [`LedgerStore`](ecoloop_core::repository::LedgerStore)
//! implementation.
//!
//! This crate provides:
//! - Connection management ([`DbConfig`], [`DbManager`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The ledger store ([`repository::SurrealLedgerStore`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
