use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::NaiveDate;
use database::{DatabaseError, PgPool};
use tokio::sync::Mutex;

use crate::loader::load_snapshot;
use crate::snapshot::Snapshot;

/// Returned by every read until the first load completes. A partially loaded
/// store is never observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotLoaded;

impl fmt::Display for NotLoaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schedule store not loaded yet")
    }
}

impl std::error::Error for NotLoaded {}

/// Process-wide handle to the current schedule snapshot.
///
/// Readers clone the `Arc` once per request and keep using their snapshot
/// even while a reload swaps in a new one. The reload mutex serializes
/// concurrent reload requests; the swap itself is a single reference write.
pub struct ScheduleStore {
    current: RwLock<Option<Arc<Snapshot>>>,
    reload_lock: Mutex<()>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().expect("snapshot lock poisoned").is_some()
    }

    /// The current snapshot, or `NotLoaded` before the first load.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, NotLoaded> {
        self.current
            .read()
            .expect("snapshot lock poisoned")
            .clone()
            .ok_or(NotLoaded)
    }

    /// Build a fresh snapshot from the database and swap it in. Safe to call
    /// both for the initial load and for later reloads; readers of the old
    /// snapshot are unaffected.
    pub async fn load(&self, pool: &PgPool, today: NaiveDate) -> Result<(), DatabaseError> {
        let _guard = self.reload_lock.lock().await;

        let started = Instant::now();
        let snapshot = load_snapshot(pool, today).await?;
        let elapsed = started.elapsed();

        log::info!(
            "schedule store loaded in {:.1}s: {} stops, {} routes, {} trips, {} transfers",
            elapsed.as_secs_f64(),
            snapshot.stop_count(),
            snapshot.route_count(),
            snapshot.trip_count(),
            snapshot.transfer_count(),
        );

        let mut current = self.current.write().expect("snapshot lock poisoned");
        *current = Some(Arc::new(snapshot));
        Ok(())
    }

    /// Install a pre-built snapshot. Test seam and import-tool hook.
    pub fn install(&self, snapshot: Snapshot) {
        let mut current = self.current.write().expect("snapshot lock poisoned");
        *current = Some(Arc::new(snapshot));
    }
}

impl Default for ScheduleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_refuses_reads_before_first_load() {
        let store = ScheduleStore::new();
        assert!(!store.is_loaded());
        assert_eq!(store.snapshot().unwrap_err(), NotLoaded);
    }

    #[test]
    fn readers_keep_old_snapshot_across_swap() {
        let store = ScheduleStore::new();

        let mut builder = Snapshot::builder();
        builder.add_stop("A", "Alpha", 0.0, 0.0, None);
        store.install(builder.build());

        let held = store.snapshot().unwrap();
        assert!(held.stop_info("A").is_some());

        let mut builder = Snapshot::builder();
        builder.add_stop("B", "Beta", 0.0, 0.0, None);
        store.install(builder.build());

        // The held reference still serves the old data; new readers see B.
        assert!(held.stop_info("A").is_some());
        assert!(store.snapshot().unwrap().stop_info("B").is_some());
        assert!(store.snapshot().unwrap().stop_info("A").is_none());
    }
}
