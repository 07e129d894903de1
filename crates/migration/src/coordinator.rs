//! Online migration into the account directory.
//!
//! Each account is migrated by two independent conditional writes that race
//! safely against steady-state traffic:
//!
//! ```text
//!                    ┌─ accounts[U]  cond: absent OR V < version ─┐
//! migrate_one(A) ────┤                                             ├── join ── a && b
//!                    └─ logins[P]    cond: absent OR U = A ───────┘
//!                          │ unexpected failure
//!                          ▼
//!                     retries[U]
//! ```
//!
//! A condition failure means the write is already applied (or superseded)
//! and resolves to `false`. Any other failure records the UUID in the retry
//! queue before the writes are joined, so one failing write cannot hide the
//! other. Deletes that race with migration are caught by the tombstone sweep
//! that runs after every batch.

use std::sync::Arc;

use account_directory_state::{AccountDirectoryStore, DeleteOptions, DirectoryError, RetryQueue};
use account_directory_types::{Account, config::MigrationConfig};
use futures::{StreamExt, stream};
use snafu::{IntoError, ResultExt};
use tokio::task::spawn_blocking;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{LegacySnafu, MigrationError, QueueSnafu, ReconcileSnafu, Result, WriteSnafu},
    legacy::LegacyAccountSource,
    metrics,
};

/// Counters for one [`MigrationCoordinator::migrate_batch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationBatchReport {
    /// Accounts where both writes landed.
    pub migrated: usize,
    /// Accounts where at least one write was already applied.
    pub already_migrated: usize,
    /// Accounts whose migration failed and was queued for retry.
    pub failed: usize,
    /// Tombstones processed by the sweep that closed the batch.
    pub tombstones_reconciled: usize,
}

/// Outcome of one [`MigrationCoordinator::redrive_retries`] call.
#[derive(Debug, Default)]
pub struct RedriveReport {
    /// Entries migrated (or confirmed migrated) and removed from the queue.
    pub migrated: usize,
    /// Entries removed because the legacy account no longer exists.
    pub dropped: usize,
    /// Entries left in the queue, with the reason.
    pub failures: Vec<MigrationError>,
}

impl RedriveReport {
    /// Number of entries left in the queue.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

enum RedriveOutcome {
    Migrated,
    Dropped,
    Kept(MigrationError),
}

/// Drives account migration, retry re-drive, and tombstone reconciliation.
///
/// Cloning is cheap; clones share the directory backend.
#[derive(Clone)]
pub struct MigrationCoordinator {
    store: AccountDirectoryStore,
    config: MigrationConfig,
}

impl MigrationCoordinator {
    /// Creates a coordinator using the store's migration settings.
    pub fn new(store: AccountDirectoryStore) -> Self {
        let config = store.config().migration;
        Self { store, config }
    }

    /// Returns the directory the coordinator writes to.
    pub fn store(&self) -> &AccountDirectoryStore {
        &self.store
    }

    fn worker_count(&self, requested: usize) -> usize {
        let width = self.config.clamp_worker_count(requested);
        if width != requested {
            warn!(requested, width, max = self.config.max_worker_count, "Clamped worker count");
        }
        width
    }

    /// Migrates `accounts` with at most `worker_count` in flight, then runs
    /// one tombstone reconciliation sweep.
    ///
    /// Individual account failures are counted, logged, and queued for retry;
    /// they do not abort the batch.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Reconcile` or `MigrationError::Join` if the
    /// closing reconciliation sweep fails.
    #[instrument(skip_all, fields(accounts = accounts.len(), worker_count = worker_count))]
    pub async fn migrate_batch(
        &self,
        accounts: Vec<Account>,
        worker_count: usize,
    ) -> Result<MigrationBatchReport> {
        let width = self.worker_count(worker_count);
        let mut report = MigrationBatchReport::default();

        let mut outcomes = stream::iter(accounts)
            .map(|account| async move {
                let uuid = account.uuid;
                (uuid, self.migrate_one(&account).await)
            })
            .buffer_unordered(width);

        while let Some((uuid, outcome)) = outcomes.next().await {
            match outcome {
                Ok(true) => report.migrated += 1,
                Ok(false) => report.already_migrated += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(uuid = %uuid, error = %e, code = %e.code(), "Account migration failed");
                },
            }
        }

        report.tombstones_reconciled = self.reconcile_tombstones().await?;

        info!(
            migrated = report.migrated,
            already_migrated = report.already_migrated,
            failed = report.failed,
            tombstones = report.tombstones_reconciled,
            "Migration batch completed"
        );
        Ok(report)
    }

    /// Migrates one account. Returns `true` only if both the account row and
    /// the login binding were written by this call.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Write` or `MigrationError::Join` if either
    /// write failed unexpectedly. The UUID is queued for retry first.
    #[instrument(skip_all, fields(uuid = %account.uuid))]
    pub async fn migrate_one(&self, account: &Account) -> Result<bool> {
        let uuid = account.uuid;

        let account_write = {
            let accounts = self.store.accounts().clone();
            let retries = self.store.retries().clone();
            let account = account.clone();
            spawn_blocking(move || {
                let result = accounts.migrate(&account);
                enqueue_on_failure(&retries, uuid, &account.login, result)
            })
        };
        let login_write = {
            let logins = self.store.logins().clone();
            let retries = self.store.retries().clone();
            let login = account.login.clone();
            spawn_blocking(move || {
                let result = logins.migrate(&login, uuid);
                enqueue_on_failure(&retries, uuid, &login, result)
            })
        };

        let (account_joined, login_joined) = tokio::join!(account_write, login_write);
        let account_result = self.resolve(uuid, &account.login, account_joined).await;
        let login_result = self.resolve(uuid, &account.login, login_joined).await;

        let outcome = account_result.and_then(|a| login_result.map(|b| a && b));
        metrics::record_account_outcome(outcome.as_ref().ok().copied());
        if let Ok(written) = outcome {
            debug!(written, "Account migration resolved");
        }
        outcome
    }

    /// Flattens a joined write into the migration result, queueing the UUID
    /// for retry if the worker itself failed.
    async fn resolve(
        &self,
        uuid: Uuid,
        login: &str,
        joined: std::result::Result<account_directory_state::Result<bool>, tokio::task::JoinError>,
    ) -> Result<bool> {
        match joined {
            Ok(result) => result.context(WriteSnafu { uuid }),
            Err(join_error) => {
                let retries = self.store.retries().clone();
                let login = login.to_string();
                let recorded = spawn_blocking(move || retries.put_with_login(uuid, &login)).await;
                if !matches!(recorded, Ok(Ok(()))) {
                    error!(uuid = %uuid, "Failed to record migration retry after worker failure");
                } else {
                    metrics::record_retry_enqueued();
                }
                Err(MigrationError::from(join_error))
            },
        }
    }

    /// Drains the tombstone queue, deleting each tombstoned account from the
    /// directory without re-tombstoning it or advancing the directory version.
    /// Returns the number of tombstones processed.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Reconcile` if a scan, delete, or drain fails.
    /// Returns `MigrationError::Join` if the blocking worker fails.
    #[instrument(skip_all)]
    pub async fn reconcile_tombstones(&self) -> Result<usize> {
        let store = self.store.clone();
        let page_size = self.config.reconcile_page_size;
        let processed =
            spawn_blocking(move || sweep_tombstones(&store, page_size)).await?.context(ReconcileSnafu)?;

        metrics::record_tombstones_reconciled(processed);
        if processed > 0 {
            info!(processed, "Reconciled tombstones");
        } else {
            debug!("No tombstones to reconcile");
        }
        Ok(processed)
    }

    /// Re-drives up to `max` retry-queue entries (the configured
    /// `redrive_batch_size` if `None`) from the legacy source.
    ///
    /// An entry is removed once its account migrates (or is confirmed already
    /// migrated) or no longer exists in the legacy store. Failed entries stay
    /// queued and are listed in [`RedriveReport::failures`].
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Queue` if the retry queue cannot be read.
    /// Returns `MigrationError::Join` if the blocking worker fails.
    #[instrument(skip_all, fields(max = ?max))]
    pub async fn redrive_retries(
        &self,
        source: Arc<dyn LegacyAccountSource>,
        max: Option<usize>,
    ) -> Result<RedriveReport> {
        let max = max.unwrap_or(self.config.redrive_batch_size);
        let retries = self.store.retries().clone();
        let uuids = spawn_blocking(move || retries.uuids(max)).await?.context(QueueSnafu)?;

        let width = self.worker_count(self.config.default_worker_count);
        let mut outcomes = stream::iter(uuids)
            .map(|uuid| {
                let source = source.clone();
                async move { self.redrive_one(source, uuid).await }
            })
            .buffer_unordered(width);

        let mut report = RedriveReport::default();
        while let Some(outcome) = outcomes.next().await {
            match outcome {
                RedriveOutcome::Migrated => report.migrated += 1,
                RedriveOutcome::Dropped => report.dropped += 1,
                RedriveOutcome::Kept(e) => {
                    warn!(error = %e, code = %e.code(), "Retry entry kept");
                    report.failures.push(e);
                },
            }
        }

        info!(
            migrated = report.migrated,
            dropped = report.dropped,
            failed = report.failed(),
            "Retry re-drive completed"
        );
        Ok(report)
    }

    async fn redrive_one(&self, source: Arc<dyn LegacyAccountSource>, uuid: Uuid) -> RedriveOutcome {
        let loaded = match spawn_blocking(move || source.load(uuid)).await {
            Ok(loaded) => loaded.context(LegacySnafu { uuid }),
            Err(e) => Err(e.into()),
        };

        let outcome = match loaded {
            Err(e) => return RedriveOutcome::Kept(e),
            Ok(None) => {
                // Gone from the legacy store: clear any partial write.
                let store = self.store.clone();
                match spawn_blocking(move || store.delete_with(uuid, DeleteOptions::reconcile()))
                    .await
                {
                    Ok(Ok(())) => RedriveOutcome::Dropped,
                    Ok(Err(e)) => return RedriveOutcome::Kept(WriteSnafu { uuid }.into_error(e)),
                    Err(e) => return RedriveOutcome::Kept(e.into()),
                }
            },
            Ok(Some(account)) => match self.migrate_one(&account).await {
                Ok(_) => RedriveOutcome::Migrated,
                Err(e) => return RedriveOutcome::Kept(e),
            },
        };

        let retries = self.store.retries().clone();
        match spawn_blocking(move || retries.remove(uuid)).await {
            Ok(Ok(())) => outcome,
            Ok(Err(e)) => RedriveOutcome::Kept(QueueSnafu.into_error(e)),
            Err(e) => RedriveOutcome::Kept(e.into()),
        }
    }
}

/// Records `uuid` and `login` in the retry queue if `result` is an error,
/// then returns `result` unchanged.
fn enqueue_on_failure(
    retries: &RetryQueue,
    uuid: Uuid,
    login: &str,
    result: account_directory_state::Result<bool>,
) -> account_directory_state::Result<bool> {
    if let Err(e) = &result {
        match retries.put_with_login(uuid, login) {
            Ok(()) => {
                metrics::record_retry_enqueued();
                debug!(uuid = %uuid, error = %e, "Queued migration retry");
            },
            Err(put_error) => {
                error!(uuid = %uuid, error = %e, put_error = %put_error, "Failed to record migration retry");
            },
        }
    }
    result
}

/// Pages through the tombstone queue until it is empty or a drain leaves
/// entries behind.
fn sweep_tombstones(
    store: &AccountDirectoryStore,
    page_size: usize,
) -> std::result::Result<usize, DirectoryError> {
    let page_size = page_size.max(1);
    let mut processed = 0;
    loop {
        let uuids = store.tombstones().recently_deleted(page_size)?;
        if uuids.is_empty() {
            break;
        }

        for uuid in &uuids {
            store.delete_with(*uuid, DeleteOptions::reconcile())?;
        }
        let outcome = store.tombstones().remove_all(&uuids)?;
        processed += uuids.len();

        if !outcome.is_complete() || uuids.len() < page_size {
            break;
        }
    }
    Ok(processed)
}
