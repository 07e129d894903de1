//! Directory scenarios against the fault-injecting in-memory backend.
//!
//! These exercise the store through its public surface only and check the
//! two-table invariants after sequences of steady-state operations:
//!
//! - every login row resolves to an account row carrying that login
//! - every account row is reachable through its login
//! - an interrupted delete leaves a tombstone behind

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashSet;

use account_directory_state::{DeleteOptions, DirectoryError, schema::ATTR_LOGIN};
use account_directory_store::KvError;
use account_directory_test_utils::{
    Operation, TestDirectory, init_test_tracing,
    strategies::{DirectoryOp, arb_directory_ops},
    test_batch_directory_config,
};
use account_directory_types::{Account, Uuid};
use proptest::prelude::*;

fn unavailable() -> KvError {
    KvError::Unavailable { message: "injected".into() }
}

/// Asserts the login index and the account table describe the same accounts.
fn assert_tables_agree(dir: &TestDirectory) {
    let tables = &dir.config().tables;
    let logins = dir.memory().items(&tables.logins);
    assert_eq!(logins.len(), dir.row_count(&tables.accounts), "one login row per account row");

    let mut owners = HashSet::new();
    for row in &logins {
        let login = row.get(ATTR_LOGIN).and_then(|v| v.as_s()).expect("login row has a login");
        let account = dir
            .store
            .get_by_login(login)
            .unwrap()
            .unwrap_or_else(|| panic!("login {login} points at a missing account"));
        assert_eq!(account.login, login);
        assert!(owners.insert(account.uuid), "account {} owns two logins", account.uuid);
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_create_update_delete_lifecycle() {
    init_test_tracing();
    let dir = TestDirectory::new();
    let mut account = Account::new(Uuid::new_v4(), "+14155550100");

    assert!(dir.store.create(&mut account, 1).unwrap());
    assert_eq!(dir.store.directory_version().unwrap(), Some(1));

    account.data.profile_name = Some("alice".into());
    dir.store.update(&account).unwrap();
    assert_eq!(dir.store.get_by_login("+14155550100").unwrap(), Some(account.clone()));
    assert_eq!(dir.store.directory_version().unwrap(), Some(1));

    dir.store.delete(account.uuid, 2).unwrap();
    assert_eq!(dir.store.get_by_uuid(account.uuid).unwrap(), None);
    assert_eq!(dir.store.get_by_login("+14155550100").unwrap(), None);
    assert_eq!(dir.store.tombstones().recently_deleted(10).unwrap(), vec![account.uuid]);
    assert_eq!(dir.store.directory_version().unwrap(), Some(2));
    assert_tables_agree(&dir);
}

#[test]
fn test_second_create_for_login_updates_owner() {
    let dir = TestDirectory::new();
    let mut first = Account::new(Uuid::new_v4(), "+14155550101");
    assert!(dir.store.create(&mut first, 1).unwrap());

    let mut second = Account::new(Uuid::new_v4(), "+14155550101");
    second.data.profile_name = Some("re-registered".into());
    let provisional = second.uuid;
    assert!(!dir.store.create(&mut second, 2).unwrap());

    assert_eq!(second.uuid, first.uuid);
    assert_eq!(dir.store.get_by_uuid(provisional).unwrap(), None);
    let stored = dir.store.get_by_login("+14155550101").unwrap().unwrap();
    assert_eq!(stored.uuid, first.uuid);
    assert_eq!(stored.data.profile_name.as_deref(), Some("re-registered"));
    assert_eq!(dir.store.directory_version().unwrap(), Some(1));
    assert_tables_agree(&dir);
}

#[test]
fn test_failed_login_claim_leaves_retryable_error() {
    let dir = TestDirectory::new();
    dir.backend.fail_times(Operation::Put, Some(&dir.config().tables.logins), unavailable(), 1);

    let mut account = Account::new(Uuid::new_v4(), "+14155550102");
    let err = dir.store.create(&mut account, 1).unwrap_err();
    assert!(matches!(err, DirectoryError::Backend { .. }));
    assert!(err.is_retryable());

    // Retrying the same create completes it.
    assert!(dir.store.create(&mut account, 1).unwrap());
    assert_tables_agree(&dir);
}

#[test]
fn test_interrupted_delete_keeps_tombstone() {
    let dir = TestDirectory::new();
    let mut account = Account::new(Uuid::new_v4(), "+14155550103");
    assert!(dir.store.create(&mut account, 1).unwrap());

    dir.backend.fail(Operation::Delete, Some(&dir.config().tables.accounts), unavailable());
    assert!(dir.store.delete(account.uuid, 2).is_err());
    dir.backend.clear_faults();

    // Login released, account row still present, tombstone recorded.
    assert_eq!(dir.store.logins().get("+14155550103").unwrap(), None);
    assert!(dir.store.get_by_uuid(account.uuid).unwrap().is_some());
    assert_eq!(dir.store.tombstones().recently_deleted(10).unwrap(), vec![account.uuid]);
    assert_eq!(dir.store.directory_version().unwrap(), Some(1));

    dir.store.delete_with(account.uuid, DeleteOptions::reconcile()).unwrap();
    assert_eq!(dir.store.get_by_uuid(account.uuid).unwrap(), None);
    assert_tables_agree(&dir);
}

#[test]
fn test_queue_drain_retries_unprocessed_rounds() {
    let dir = TestDirectory::with_config(test_batch_directory_config().max_attempts(5).call());
    let uuids: Vec<Uuid> = (0..30).map(|_| Uuid::new_v4()).collect();
    for uuid in &uuids {
        dir.store.retries().put(*uuid).unwrap();
    }

    dir.backend.unprocess_batch_rounds(3);
    let outcome = dir.store.retries().remove_all(&uuids).unwrap();

    assert!(outcome.is_complete());
    assert_eq!(dir.row_count(&dir.config().tables.retries), 0);
}

#[test]
fn test_queue_drain_gives_up_after_max_attempts() {
    let dir = TestDirectory::with_config(test_batch_directory_config().max_attempts(2).call());
    let uuids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    for uuid in &uuids {
        dir.store.tombstones().put(*uuid).unwrap();
    }

    dir.backend.unprocess_batch_rounds(u32::MAX);
    let outcome = dir.store.tombstones().remove_all(&uuids).unwrap();

    assert!(!outcome.is_complete());
    assert_eq!(outcome.unprocessed, 3);
    assert_eq!(dir.backend.batch_write_calls(), 3);
    assert_eq!(dir.row_count(&dir.config().tables.tombstones), 3);
}

// ============================================================================
// Property tests
// ============================================================================

fn apply(dir: &TestDirectory, slots: &[Uuid], ops: &[DirectoryOp]) {
    for (version, op) in (1_i64..).zip(ops) {
        match op {
            DirectoryOp::Create { slot, login } => {
                let mut account = Account::new(slots[*slot], login.clone());
                match dir.store.create(&mut account, version) {
                    Ok(_) | Err(DirectoryError::IdentifierCollision { .. }) => {},
                    Err(e) => panic!("create failed: {e}"),
                }
            },
            DirectoryOp::Update { slot, profile_name } => {
                if let Some(mut account) = dir.store.get_by_uuid(slots[*slot]).unwrap() {
                    account.data.profile_name = Some(profile_name.clone());
                    dir.store.update(&account).unwrap();
                }
            },
            DirectoryOp::Delete { slot } => dir.store.delete(slots[*slot], version).unwrap(),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_login_index_matches_accounts(ops in arb_directory_ops(4, 3)) {
        let dir = TestDirectory::new();
        let slots: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

        apply(&dir, &slots, &ops);

        assert_tables_agree(&dir);
        let version = dir.store.directory_version().unwrap().unwrap_or(0);
        prop_assert!(version <= ops.len() as i64);
    }

    #[test]
    fn prop_each_login_has_one_owner(ops in arb_directory_ops(6, 2)) {
        let dir = TestDirectory::new();
        let slots: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();

        apply(&dir, &slots, &ops);

        prop_assert!(dir.row_count(&dir.config().tables.logins) <= 2);
        prop_assert!(dir.row_count(&dir.config().tables.accounts) <= 2);
    }
}
