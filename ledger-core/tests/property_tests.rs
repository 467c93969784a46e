//! Property-based tests for ledger invariants
//!
//! These tests use proptest and real threads to verify:
//! - Conservation: transfers never change the sum of balances
//! - Non-negativity: a rejected transfer leaves both balances unchanged
//! - Unique, increasing transaction ids under concurrency
//! - End-to-end scenarios for user creation and transfers

use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;
use token_ledger::{
    config::{AdminSecret, HashingConfig},
    Config, Error, Ledger, NewUser, TxnId, UserId,
};

const SECRET: &str = "test-admin-secret";
const GRANT: i64 = 1_000_000;

/// Create test ledger with temp directory
fn create_test_ledger() -> (Ledger, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    config.admin_secret = AdminSecret::new(SECRET);
    config.store.sync_writes = false;
    config.hashing = HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };

    (Ledger::open(config).unwrap(), temp_dir)
}

fn create_users(ledger: &Ledger, count: usize) -> Vec<NewUser> {
    (0..count).map(|_| ledger.create_user(SECRET).unwrap()).collect()
}

/// Strategy for generating transfers between three users: (src, dst, amount)
fn transfer_strategy() -> impl Strategy<Value = (usize, usize, i64)> {
    (0usize..3, 0usize..3, prop_oneof![1i64..1_000, 400_000i64..1_500_000])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: balances follow a simple model and their sum never changes
    #[test]
    fn prop_conservation_and_non_negativity(
        transfers in prop::collection::vec(transfer_strategy(), 1..12)
    ) {
        let (ledger, _temp) = create_test_ledger();
        let users = create_users(&ledger, 3);
        let mut model = vec![GRANT; 3];

        for (src, dst, amount) in transfers {
            let result = ledger.create_transfer(
                users[src].user_id,
                users[dst].user_id,
                amount,
                &users[src].password,
            );

            if src == dst {
                prop_assert!(matches!(result, Err(Error::InvalidArgument(_))));
            } else if amount > model[src] {
                prop_assert!(matches!(result, Err(Error::InsufficientFunds(_))));
            } else {
                prop_assert!(result.is_ok());
                model[src] -= amount;
                model[dst] += amount;
            }

            for (user, expected) in users.iter().zip(&model) {
                let balance = ledger.get_balance(user.user_id).unwrap();
                prop_assert!(balance >= 0);
                prop_assert_eq!(balance, *expected);
            }
            prop_assert_eq!(ledger.total_supply().unwrap(), i128::from(3 * GRANT));
        }
    }

    /// Property: successful transfers get consecutive ids starting at 1
    #[test]
    fn prop_ids_are_consecutive(amounts in prop::collection::vec(1i64..10_000, 1..8)) {
        let (ledger, _temp) = create_test_ledger();
        let users = create_users(&ledger, 2);

        for (i, amount) in amounts.iter().enumerate() {
            let txn_id = ledger
                .create_transfer(users[0].user_id, users[1].user_id, *amount, &users[0].password)
                .unwrap();
            prop_assert_eq!(txn_id, TxnId(i as u64 + 1));
            prop_assert_eq!(ledger.get_transaction(txn_id).unwrap().amount, *amount);
        }
    }
}

#[test]
fn scenario_a_simple_transfer() {
    let (ledger, _temp) = create_test_ledger();
    let users = create_users(&ledger, 2);

    let txn_id = ledger
        .create_transfer(users[0].user_id, users[1].user_id, 100, &users[0].password)
        .unwrap();

    assert_eq!(txn_id, TxnId(1));
    assert_eq!(ledger.get_balance(users[0].user_id).unwrap(), 999_900);
    assert_eq!(ledger.get_balance(users[1].user_id).unwrap(), 1_000_100);
}

#[test]
fn scenario_b_insufficient_funds() {
    let (ledger, _temp) = create_test_ledger();
    let users = create_users(&ledger, 2);
    ledger
        .create_transfer(users[0].user_id, users[1].user_id, 100, &users[0].password)
        .unwrap();

    let result = ledger.create_transfer(
        users[0].user_id,
        users[1].user_id,
        2_000_000,
        &users[0].password,
    );
    assert!(matches!(result, Err(Error::InsufficientFunds(id)) if id == users[0].user_id));

    assert_eq!(ledger.get_balance(users[0].user_id).unwrap(), 999_900);
    assert_eq!(ledger.get_balance(users[1].user_id).unwrap(), 1_000_100);
    assert!(matches!(
        ledger.get_transaction(TxnId(2)),
        Err(Error::TransactionNotFound(_))
    ));
    assert_eq!(ledger.stats().unwrap().latest_txn_id, 1);
}

#[test]
fn scenario_c_wrong_password() {
    let (ledger, _temp) = create_test_ledger();
    let users = create_users(&ledger, 2);

    let result = ledger.create_transfer(users[0].user_id, users[1].user_id, 100, "not-it");
    assert!(matches!(result, Err(Error::Unauthorized)));

    assert_eq!(ledger.get_balance(users[0].user_id).unwrap(), GRANT);
    assert_eq!(ledger.get_balance(users[1].user_id).unwrap(), GRANT);
    assert_eq!(ledger.stats().unwrap().latest_txn_id, 0);
}

#[test]
fn scenario_d_forbidden_user_creation() {
    let (ledger, _temp) = create_test_ledger();

    assert!(matches!(ledger.create_user("guess"), Err(Error::Forbidden)));
    assert!(matches!(ledger.create_user(""), Err(Error::Forbidden)));

    let stats = ledger.stats().unwrap();
    assert_eq!(stats.user_count, 0);
    assert_eq!(stats.total_supply, 0);
    assert!(matches!(
        ledger.get_balance(UserId(1)),
        Err(Error::UserNotFound(_))
    ));

    assert_eq!(ledger.create_user(SECRET).unwrap().user_id, UserId(1));
}

#[test]
fn scenario_e_concurrent_overdraw() {
    let (ledger, _temp) = create_test_ledger();
    let users = create_users(&ledger, 3);
    let ledger = Arc::new(ledger);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [users[1].user_id, users[2].user_id]
        .into_iter()
        .map(|dst| {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            let src = users[0].user_id;
            let password = users[0].password.clone();
            thread::spawn(move || {
                barrier.wait();
                ledger.create_transfer(src, dst, 600_000, &password)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(Error::InsufficientFunds(_))))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 1);

    assert_eq!(ledger.get_balance(users[0].user_id).unwrap(), 400_000);
    let credited = ledger.get_balance(users[1].user_id).unwrap()
        + ledger.get_balance(users[2].user_id).unwrap();
    assert_eq!(credited, 2 * GRANT + 600_000);
}

#[test]
fn concurrent_transfers_get_unique_increasing_ids() {
    let (ledger, _temp) = create_test_ledger();
    let users = create_users(&ledger, 4);
    let ledger = Arc::new(ledger);

    // Each thread sends in a ring so lock order differs between threads
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            let src = users[i].user_id;
            let dst = users[(i + 1) % 4].user_id;
            let password = users[i].password.clone();
            thread::spawn(move || {
                (0..5)
                    .map(|_| ledger.create_transfer(src, dst, 10, &password).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all_ids = Vec::new();
    for handle in handles {
        let ids = handle.join().unwrap();
        // Ids seen by one caller increase in its own commit order
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        all_ids.extend(ids);
    }

    all_ids.sort();
    let expected: Vec<_> = (1..=20).map(TxnId).collect();
    assert_eq!(all_ids, expected);
    assert_eq!(ledger.total_supply().unwrap(), i128::from(4 * GRANT));
}

#[test]
fn reads_are_idempotent() {
    let (ledger, _temp) = create_test_ledger();
    let users = create_users(&ledger, 2);
    let txn_id = ledger
        .create_transfer(users[0].user_id, users[1].user_id, 7, &users[0].password)
        .unwrap();

    let first = (
        ledger.get_balance(users[0].user_id).unwrap(),
        ledger.get_transaction(txn_id).unwrap(),
    );
    for _ in 0..3 {
        let again = (
            ledger.get_balance(users[0].user_id).unwrap(),
            ledger.get_transaction(txn_id).unwrap(),
        );
        assert_eq!(again, first);
    }
}
