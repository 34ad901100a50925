//! Holder for the snapshot currently served to readers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::loader::RawTables;
use crate::pipeline::clean;
use crate::snapshot::Snapshot;
use crate::types::EngineResult;

/// Publishes snapshots atomically.
///
/// Readers call [`current`](Self::current) and keep the returned `Arc` for
/// the duration of a request. A rebuild runs without holding the lock and
/// swaps the new snapshot in only once it is complete.
#[derive(Debug)]
pub struct SnapshotRegistry {
    current: RwLock<Arc<Snapshot>>,
    generation: AtomicU64,
}

impl Default for SnapshotRegistry {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

impl SnapshotRegistry {
    /// Creates a registry serving `snapshot`.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            generation: AtomicU64::new(0),
        }
    }

    /// The snapshot currently served.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Number of snapshots published since creation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Replaces the served snapshot and returns the previous one.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(generation, "Snapshot published");
        previous
    }

    /// Cleans `raw` and publishes the result.
    ///
    /// # Errors
    /// Propagates the cleaning error; the served snapshot is left unchanged.
    pub fn rebuild(&self, raw: RawTables) -> EngineResult<Arc<Snapshot>> {
        let snapshot = clean(raw).map_err(|e| {
            tracing::warn!(error = %e, "Snapshot rebuild failed, keeping current snapshot");
            e
        })?;
        self.publish(snapshot);
        Ok(self.current())
    }
}
