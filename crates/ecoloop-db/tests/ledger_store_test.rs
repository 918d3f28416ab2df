//! Integration tests for the ledger store implementation using
//! in-memory SurrealDB.

use std::sync::Arc;

use ecoloop_core::error::EcoloopError;
use ecoloop_core::models::ledger::{CreateLedgerEntry, EntryKind, EntryStatus};
use ecoloop_core::repository::{LedgerStore, Pagination, SettleOutcome};
use ecoloop_db::repository::SurrealLedgerStore;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> SurrealLedgerStore<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    ecoloop_db::run_migrations(&db).await.unwrap();
    SurrealLedgerStore::new(db)
}

fn credit(user_id: Uuid, amount: u64, description: &str) -> CreateLedgerEntry {
    CreateLedgerEntry {
        user_id,
        kind: EntryKind::Earned,
        amount,
        description: description.into(),
        payment_reference: None,
    }
}

fn debit(user_id: Uuid, amount: u64, description: &str) -> CreateLedgerEntry {
    CreateLedgerEntry {
        user_id,
        kind: EntryKind::Spent,
        amount,
        description: description.into(),
        payment_reference: None,
    }
}

// -----------------------------------------------------------------------
// Account lifecycle
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_account() {
    let store = setup().await;
    let user_id = Uuid::new_v4();

    let account = store.create_account(user_id, 500).await.unwrap();
    assert_eq!(account.user_id, user_id);
    assert_eq!(account.balance, 500);
    assert_eq!(account.entry_seq, 0);

    let fetched = store.get_account(user_id).await.unwrap();
    assert_eq!(fetched.balance, 500);
    assert_eq!(store.get_balance(user_id).await.unwrap(), 500);
}

#[tokio::test]
async fn duplicate_account_is_rejected() {
    let store = setup().await;
    let user_id = Uuid::new_v4();

    store.create_account(user_id, 100).await.unwrap();
    let err = store.create_account(user_id, 100).await.unwrap_err();
    assert!(matches!(err, EcoloopError::AlreadyExists { .. }));
}

#[tokio::test]
async fn missing_account_is_not_found() {
    let store = setup().await;
    let err = store.get_balance(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EcoloopError::NotFound { .. }));
}

// -----------------------------------------------------------------------
// Settlement
// -----------------------------------------------------------------------

#[tokio::test]
async fn credits_and_debits_move_the_balance() {
    let store = setup().await;
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 0).await.unwrap();

    let (account, entry) = store
        .apply_entry(credit(user_id, 100, "pickup reward"))
        .await
        .unwrap();
    assert_eq!(account.balance, 100);
    assert_eq!(entry.seq, 1);
    assert_eq!(entry.status, EntryStatus::Completed);
    assert_eq!(entry.kind, EntryKind::Earned);

    let (account, entry) = store
        .apply_entry(debit(user_id, 40, "purchase"))
        .await
        .unwrap();
    assert_eq!(account.balance, 60);
    assert_eq!(entry.seq, 2);
    assert_eq!(account.entry_seq, 2);
}

#[tokio::test]
async fn overdraft_is_rejected_without_partial_application() {
    let store = setup().await;
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 30).await.unwrap();

    let err = store
        .apply_entry(debit(user_id, 31, "too much"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EcoloopError::InsufficientBalance {
            balance: 30,
            requested: 31,
        }
    ));

    // Neither the balance nor the history moved.
    assert_eq!(store.get_balance(user_id).await.unwrap(), 30);
    let entries = store
        .list_entries(user_id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(entries.total, 0);
}

#[tokio::test]
async fn zero_amount_entries_are_rejected() {
    let store = setup().await;
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 10).await.unwrap();

    let err = store
        .apply_entry(credit(user_id, 0, "nothing"))
        .await
        .unwrap_err();
    assert!(matches!(err, EcoloopError::Validation { .. }));
}

#[tokio::test]
async fn balance_is_conserved_over_mixed_entries() {
    let store = setup().await;
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 1000).await.unwrap();

    store
        .apply_entry(credit(user_id, 250, "reward"))
        .await
        .unwrap();
    store
        .apply_entry(debit(user_id, 400, "purchase"))
        .await
        .unwrap();
    store
        .apply_entry(credit(user_id, 50, "reward"))
        .await
        .unwrap();
    store
        .apply_entry(debit(user_id, 150, "purchase"))
        .await
        .unwrap();

    // initial + sum(credits) - sum(debits)
    assert_eq!(
        store.get_balance(user_id).await.unwrap(),
        1000 + 250 + 50 - 400 - 150
    );
}

// -----------------------------------------------------------------------
// History
// -----------------------------------------------------------------------

#[tokio::test]
async fn listing_is_newest_first_and_restartable() {
    let store = setup().await;
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 0).await.unwrap();

    for i in 1..=5u64 {
        store
            .apply_entry(credit(user_id, i * 10, &format!("entry {i}")))
            .await
            .unwrap();
    }

    let page = store
        .list_entries(
            user_id,
            Pagination {
                offset: 0,
                limit: 3,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    let seqs: Vec<u64> = page.items.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![5, 4, 3]);

    let rest = store
        .list_entries(
            user_id,
            Pagination {
                offset: 3,
                limit: 3,
            },
        )
        .await
        .unwrap();
    let seqs: Vec<u64> = rest.items.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![2, 1]);
}

#[tokio::test]
async fn listing_is_idempotent_without_writes() {
    let store = setup().await;
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 0).await.unwrap();
    store
        .apply_entry(credit(user_id, 10, "a"))
        .await
        .unwrap();
    store
        .apply_entry(credit(user_id, 20, "b"))
        .await
        .unwrap();

    let first = store
        .list_entries(user_id, Pagination::default())
        .await
        .unwrap();
    let second = store
        .list_entries(user_id, Pagination::default())
        .await
        .unwrap();

    let ids_first: Vec<_> = first.items.iter().map(|e| e.id).collect();
    let ids_second: Vec<_> = second.items.iter().map(|e| e.id).collect();
    assert_eq!(ids_first, ids_second);
    assert_eq!(first.total, second.total);
}

// -----------------------------------------------------------------------
// Processing holds
// -----------------------------------------------------------------------

#[tokio::test]
async fn processing_debit_holds_funds_until_completed() {
    let store = setup().await;
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 500).await.unwrap();

    let (account, entry) = store
        .apply_processing_entry(CreateLedgerEntry {
            user_id,
            kind: EntryKind::ConvertedToMoney,
            amount: 200,
            description: "payout".into(),
            payment_reference: Some("payout-1".into()),
        })
        .await
        .unwrap();
    assert_eq!(account.balance, 300);
    assert_eq!(entry.status, EntryStatus::Processing);

    let (account, entry) = store
        .settle_entry(user_id, entry.id, SettleOutcome::Completed)
        .await
        .unwrap();
    assert_eq!(account.balance, 300);
    assert_eq!(entry.status, EntryStatus::Completed);
}

#[tokio::test]
async fn failed_settlement_releases_the_hold() {
    let store = setup().await;
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 500).await.unwrap();

    let (_, entry) = store
        .apply_processing_entry(CreateLedgerEntry {
            user_id,
            kind: EntryKind::ConvertedToMoney,
            amount: 200,
            description: "payout".into(),
            payment_reference: Some("payout-2".into()),
        })
        .await
        .unwrap();
    assert_eq!(store.get_balance(user_id).await.unwrap(), 300);

    let (account, entry) = store
        .settle_entry(user_id, entry.id, SettleOutcome::Failed)
        .await
        .unwrap();
    assert_eq!(account.balance, 500);
    assert_eq!(entry.status, EntryStatus::Failed);
}

#[tokio::test]
async fn settling_a_completed_entry_is_rejected() {
    let store = setup().await;
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 100).await.unwrap();

    let (_, entry) = store
        .apply_entry(credit(user_id, 50, "reward"))
        .await
        .unwrap();

    let err = store
        .settle_entry(user_id, entry.id, SettleOutcome::Failed)
        .await
        .unwrap_err();
    assert!(matches!(err, EcoloopError::Validation { .. }));
    assert_eq!(store.get_balance(user_id).await.unwrap(), 150);
}

// -----------------------------------------------------------------------
// Concurrency
// -----------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_unit_debits_never_oversell() {
    let store = Arc::new(setup().await);
    let user_id = Uuid::new_v4();
    store.create_account(user_id, 50).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..100 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .apply_entry(debit(user_id, 1, &format!("debit {i}")))
                .await
        }));
    }

    let mut successes = 0u32;
    let mut insufficient = 0u32;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(EcoloopError::InsufficientBalance { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 50);
    assert_eq!(insufficient, 50);
    assert_eq!(store.get_balance(user_id).await.unwrap(), 0);

    let entries = store
        .list_entries(
            user_id,
            Pagination {
                offset: 0,
                limit: 100,
            },
        )
        .await
        .unwrap();
    assert_eq!(entries.total, 50);

    // Winners are totally ordered: seqs are exactly 50..=1, no gaps.
    let seqs: Vec<u64> = entries.items.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (1..=50).rev().collect::<Vec<u64>>());
}
