//! SurrealDB repository implementations.

mod ledger;

pub use ledger::SurrealLedgerStore;
