//! Best-effort bulk writes with bounded retry of unprocessed items.
//!
//! Bulk writes are unconditional and used only by the migration side-queues.
//! Primary-path writes are single-item conditional writes and never come
//! through here.

use std::sync::Arc;

use account_directory_store::{
    BatchWriteItem, KvBackend, KvError, RequestItems, request_count,
};
use account_directory_types::config::BatchWriteConfig;
use tracing::{debug, error};

use crate::metrics;

/// Result of driving one bulk request to completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchWriteOutcome {
    /// Bulk requests sent to the backend, including the first.
    pub attempts: u32,
    /// Write requests still unprocessed when retries ran out.
    pub unprocessed: usize,
}

impl BatchWriteOutcome {
    /// Whether every write request was applied.
    pub fn is_complete(&self) -> bool {
        self.unprocessed == 0
    }

    /// Folds another outcome into this one.
    pub fn merge(&mut self, other: BatchWriteOutcome) {
        self.attempts += other.attempts;
        self.unprocessed += other.unprocessed;
    }
}

/// Issues bulk writes, resubmitting whatever the backend leaves unprocessed.
#[derive(Clone)]
pub struct BatchWriteExecutor {
    backend: Arc<dyn KvBackend>,
    config: BatchWriteConfig,
}

impl BatchWriteExecutor {
    /// Creates an executor over the backend.
    pub fn new(backend: Arc<dyn KvBackend>, config: BatchWriteConfig) -> Self {
        Self { backend, config }
    }

    /// Returns the executor's retry settings.
    pub fn config(&self) -> &BatchWriteConfig {
        &self.config
    }

    /// Sends `request_items` and retries the unprocessed subset up to
    /// `max_attempts` times.
    ///
    /// Items left over after the last retry are logged and counted, not
    /// treated as a failure; the caller sees them in
    /// [`BatchWriteOutcome::unprocessed`].
    ///
    /// # Errors
    ///
    /// Returns the backend error if any bulk request fails outright.
    pub fn execute_until_complete(
        &self,
        request_items: RequestItems,
    ) -> Result<BatchWriteOutcome, KvError> {
        let mut pending = request_items;
        pending.retain(|_, writes| !writes.is_empty());
        if pending.is_empty() {
            return Ok(BatchWriteOutcome::default());
        }

        let mut attempts = 0u32;
        loop {
            metrics::record_batch_write_request(attempts == 0);
            let response =
                self.backend.batch_write_item(BatchWriteItem { request_items: pending })?;
            attempts += 1;

            pending = response.unprocessed_items;
            pending.retain(|_, writes| !writes.is_empty());
            if pending.is_empty() {
                return Ok(BatchWriteOutcome { attempts, unprocessed: 0 });
            }

            // The first request is not a retry.
            if attempts > self.config.max_attempts {
                break;
            }
            debug!(attempts, unprocessed = request_count(&pending), "Retrying unprocessed items");
        }

        let unprocessed = request_count(&pending);
        error!(attempts, unprocessed, "Bulk write left items unprocessed after retry ceiling");
        metrics::record_batch_write_unprocessed(unprocessed);
        Ok(BatchWriteOutcome { attempts, unprocessed })
    }

    /// Groups `items` into chunks of `max_batch_size` and calls `action` on
    /// each non-empty chunk, including a final partial one.
    ///
    /// # Errors
    ///
    /// Returns the first error from `action`; later chunks are not attempted.
    pub fn write_in_batches<T, E>(
        &self,
        items: impl IntoIterator<Item = T>,
        mut action: impl FnMut(Vec<T>) -> Result<(), E>,
    ) -> Result<(), E> {
        let batch_size = self.config.max_batch_size.max(1);
        let mut chunk = Vec::with_capacity(batch_size);
        for item in items {
            chunk.push(item);
            if chunk.len() == batch_size {
                action(std::mem::replace(&mut chunk, Vec::with_capacity(batch_size)))?;
            }
        }
        if !chunk.is_empty() {
            action(chunk)?;
        }
        Ok(())
    }
}
