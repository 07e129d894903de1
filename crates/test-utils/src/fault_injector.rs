//! Fault injection for exercising backend failure paths.
//!
//! [`FaultInjectingBackend`] wraps an [`InMemoryBackend`] and lets a test
//! decide, per operation and table, when a call fails instead of reaching
//! the inner backend:
//!
//! ```text
//! request → armed fault matches? ── yes → return injected KvError
//!                    │
//!                    no → forward to InMemoryBackend
//! ```
//!
//! Bulk writes can additionally be told to leave every item unprocessed for
//! a number of rounds, and puts on one table can be slowed down to observe
//! how many run at once.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU32, AtomicUsize, Ordering},
    },
    time::Duration,
};

use account_directory_store::{
    BatchWriteItem, BatchWriteResponse, DeleteItem, GetItem, InMemoryBackend, Item, KvBackend,
    KvError, PutItem, Result, Scan, ScanPage, UpdateItem,
};
use parking_lot::Mutex;

/// Backend operations a fault can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `put_item`.
    Put,
    /// `update_item`.
    Update,
    /// `delete_item`.
    Delete,
    /// `get_item`.
    Get,
    /// `batch_write_item`.
    BatchWrite,
    /// `scan`.
    Scan,
}

#[derive(Debug)]
struct Fault {
    operation: Operation,
    table: Option<String>,
    error: KvError,
    /// `None` fails every matching call until cleared.
    remaining: Option<u32>,
}

#[derive(Debug)]
struct SlowPuts {
    table: String,
    delay: Duration,
}

/// Backend wrapper that injects failures into an [`InMemoryBackend`].
///
/// # Thread Safety
///
/// All state is behind mutexes or atomics, so one instance can be shared by
/// concurrent migration workers.
#[derive(Debug)]
pub struct FaultInjectingBackend {
    inner: Arc<InMemoryBackend>,
    faults: Mutex<Vec<Fault>>,
    unprocessed_rounds: AtomicU32,
    calls: Mutex<HashMap<Operation, u64>>,
    slow_puts: Mutex<Option<SlowPuts>>,
    puts_in_flight: AtomicUsize,
    max_puts_in_flight: AtomicUsize,
}

impl FaultInjectingBackend {
    /// Wraps `inner` with no faults armed.
    pub fn new(inner: Arc<InMemoryBackend>) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
            unprocessed_rounds: AtomicU32::new(0),
            calls: Mutex::new(HashMap::new()),
            slow_puts: Mutex::new(None),
            puts_in_flight: AtomicUsize::new(0),
            max_puts_in_flight: AtomicUsize::new(0),
        }
    }

    /// Returns the wrapped backend, which bypasses every fault.
    pub fn inner(&self) -> &Arc<InMemoryBackend> {
        &self.inner
    }

    /// Fails every `operation` on `table` (any table if `None`) until cleared.
    pub fn fail(&self, operation: Operation, table: Option<&str>, error: KvError) {
        self.faults.lock().push(Fault {
            operation,
            table: table.map(str::to_string),
            error,
            remaining: None,
        });
    }

    /// Fails the next `times` matching calls, then lets calls through.
    pub fn fail_times(&self, operation: Operation, table: Option<&str>, error: KvError, times: u32) {
        self.faults.lock().push(Fault {
            operation,
            table: table.map(str::to_string),
            error,
            remaining: Some(times),
        });
    }

    /// Disarms every fault.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Makes the next `rounds` bulk writes return all their items unprocessed.
    pub fn unprocess_batch_rounds(&self, rounds: u32) {
        self.unprocessed_rounds.store(rounds, Ordering::SeqCst);
    }

    /// Sleeps for `delay` inside every put on `table`.
    pub fn slow_puts(&self, table: &str, delay: Duration) {
        *self.slow_puts.lock() = Some(SlowPuts { table: table.to_string(), delay });
    }

    /// Highest number of slowed puts observed running at the same time.
    pub fn max_concurrent_slow_puts(&self) -> usize {
        self.max_puts_in_flight.load(Ordering::SeqCst)
    }

    /// Number of calls made for `operation`, including failed ones.
    pub fn calls(&self, operation: Operation) -> u64 {
        self.calls.lock().get(&operation).copied().unwrap_or(0)
    }

    /// Number of bulk write calls made.
    pub fn batch_write_calls(&self) -> u64 {
        self.calls(Operation::BatchWrite)
    }

    fn intercept(&self, operation: Operation, table: &str) -> Result<()> {
        *self.calls.lock().entry(operation).or_insert(0) += 1;

        let mut faults = self.faults.lock();
        let matching = faults.iter_mut().position(|fault| {
            fault.operation == operation
                && fault.table.as_deref().is_none_or(|t| t == table)
                && fault.remaining != Some(0)
        });
        let Some(index) = matching else {
            return Ok(());
        };

        let fault = &mut faults[index];
        if let Some(remaining) = fault.remaining.as_mut() {
            *remaining -= 1;
        }
        Err(fault.error.clone())
    }

    fn slow_put(&self, table: &str) -> Option<Duration> {
        self.slow_puts.lock().as_ref().filter(|slow| slow.table == table).map(|slow| slow.delay)
    }
}

impl KvBackend for FaultInjectingBackend {
    fn put_item(&self, request: PutItem) -> Result<()> {
        self.intercept(Operation::Put, &request.table)?;

        let Some(delay) = self.slow_put(&request.table) else {
            return self.inner.put_item(request);
        };
        let in_flight = self.puts_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_puts_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        std::thread::sleep(delay);
        let result = self.inner.put_item(request);
        self.puts_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn update_item(&self, request: UpdateItem) -> Result<()> {
        self.intercept(Operation::Update, &request.table)?;
        self.inner.update_item(request)
    }

    fn delete_item(&self, request: DeleteItem) -> Result<()> {
        self.intercept(Operation::Delete, &request.table)?;
        self.inner.delete_item(request)
    }

    fn get_item(&self, request: GetItem) -> Result<Option<Item>> {
        self.intercept(Operation::Get, &request.table)?;
        self.inner.get_item(request)
    }

    fn batch_write_item(&self, request: BatchWriteItem) -> Result<BatchWriteResponse> {
        for table in request.request_items.keys() {
            self.intercept(Operation::BatchWrite, table)?;
        }

        let unprocess = self
            .unprocessed_rounds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if unprocess {
            return Ok(BatchWriteResponse { unprocessed_items: request.request_items });
        }
        self.inner.batch_write_item(request)
    }

    fn scan(&self, request: Scan) -> Result<ScanPage> {
        self.intercept(Operation::Scan, &request.table)?;
        self.inner.scan(request)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use account_directory_store::key;

    use super::*;

    fn backend() -> FaultInjectingBackend {
        let inner = Arc::new(InMemoryBackend::new());
        inner.create_table("t", "K");
        inner.create_table("u", "K");
        FaultInjectingBackend::new(inner)
    }

    fn unavailable() -> KvError {
        KvError::Unavailable { message: "injected".into() }
    }

    #[test]
    fn test_starts_transparent() {
        let backend = backend();
        backend.put_item(PutItem::new("t", key("K", "a"))).unwrap();
        assert_eq!(backend.inner().item_count("t"), 1);
        assert_eq!(backend.calls(Operation::Put), 1);
    }

    #[test]
    fn test_fault_targets_table() {
        let backend = backend();
        backend.fail(Operation::Put, Some("t"), unavailable());

        assert_eq!(backend.put_item(PutItem::new("t", key("K", "a"))).unwrap_err(), unavailable());
        backend.put_item(PutItem::new("u", key("K", "a"))).unwrap();

        backend.clear_faults();
        backend.put_item(PutItem::new("t", key("K", "a"))).unwrap();
    }

    #[test]
    fn test_fail_times_expires() {
        let backend = backend();
        backend.fail_times(Operation::Get, None, unavailable(), 2);

        assert!(backend.get_item(GetItem::new("t", key("K", "a"))).is_err());
        assert!(backend.get_item(GetItem::new("u", key("K", "a"))).is_err());
        assert!(backend.get_item(GetItem::new("t", key("K", "a"))).is_ok());
        assert_eq!(backend.calls(Operation::Get), 3);
    }

    #[test]
    fn test_unprocessed_rounds_count_down() {
        let backend = backend();
        backend.unprocess_batch_rounds(1);
        let request = BatchWriteItem {
            request_items: [(
                "t".to_string(),
                vec![account_directory_store::WriteRequest::Put { item: key("K", "a") }],
            )]
            .into(),
        };

        let first = backend.batch_write_item(request.clone()).unwrap();
        assert_eq!(first.unprocessed_items, request.request_items);
        assert_eq!(backend.inner().item_count("t"), 0);

        let second = backend.batch_write_item(request).unwrap();
        assert!(second.unprocessed_items.is_empty());
        assert_eq!(backend.inner().item_count("t"), 1);
    }

    #[test]
    fn test_slow_puts_track_concurrency() {
        let backend = Arc::new(backend());
        backend.slow_puts("t", Duration::from_millis(20));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let backend = backend.clone();
                std::thread::spawn(move || {
                    backend.put_item(PutItem::new("t", key("K", format!("k{i}")))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(backend.max_concurrent_slow_puts() >= 1);
        assert!(backend.max_concurrent_slow_puts() <= 4);
        assert_eq!(backend.inner().item_count("t"), 4);
    }
}
