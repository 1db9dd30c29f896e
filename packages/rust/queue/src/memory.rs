//! In-memory [`TaskQueue`] for tests and dry runs.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use pressline_shared::{PresslineError, Result};

use crate::{CellUpdate, TaskQueue};

/// A queue held in memory. Writes are applied to the rows and also recorded
/// batch by batch.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    rows: Mutex<Vec<Vec<String>>>,
    writes: Mutex<Vec<Vec<CellUpdate>>>,
    reads: AtomicU32,
    pending_read_failures: AtomicU32,
    fail_writes: AtomicBool,
}

impl MemoryQueue {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Build from string slices, header first.
    pub fn from_table(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    /// Make the next `n` reads fail with a transient error.
    pub fn fail_next_reads(&self, n: u32) {
        self.pending_read_failures.store(n, Ordering::SeqCst);
    }

    /// Make every write fail with a fatal error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of read attempts, failed ones included.
    pub fn read_count(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Successful write batches, in order.
    pub fn write_batches(&self) -> Vec<Vec<CellUpdate>> {
        lock(&self.writes).clone()
    }

    /// Current cell value, if the cell exists.
    pub fn cell(&self, row: u32, column: usize) -> Option<String> {
        let rows = lock(&self.rows);
        let index = (row as usize).checked_sub(1)?;
        rows.get(index)?.get(column).cloned()
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let pending = self.pending_read_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.pending_read_failures.store(pending - 1, Ordering::SeqCst);
            return Err(PresslineError::queue_transient("HTTP 503 Service Unavailable"));
        }

        Ok(lock(&self.rows).clone())
    }

    async fn write_cells(&self, updates: &[CellUpdate]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PresslineError::queue_fatal("HTTP 403 Forbidden"));
        }

        let mut rows = lock(&self.rows);
        for update in updates {
            let index = (update.row as usize).saturating_sub(1);
            if rows.len() <= index {
                rows.resize(index + 1, Vec::new());
            }
            let row = &mut rows[index];
            if row.len() <= update.column {
                row.resize(update.column + 1, String::new());
            }
            row[update.column] = update.value.clone();
        }
        drop(rows);

        lock(&self.writes).push(updates.to_vec());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
