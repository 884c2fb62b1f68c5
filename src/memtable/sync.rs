//! Periodic WAL sync
//!
//! Fsyncs a memtable's WAL once per interval so the durability lag stays
//! bounded under low write volume.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Result;
use crate::task::PeriodicTask;
use crate::wal::WalWriter;

/// Start the sync task for one generation's WAL
///
/// The task exits by itself once the WAL has been taken out (closed).
pub(crate) fn spawn_wal_sync(
    generation: u32,
    wal: Arc<Mutex<Option<WalWriter>>>,
    interval: Duration,
) -> Result<PeriodicTask> {
    PeriodicTask::spawn(
        format!("driftkv-wal-sync-{:05}", generation),
        interval,
        move || {
            // Appends hold the same lock, so only whole records are synced
            let mut guard = wal.lock();
            let Some(writer) = guard.as_mut() else {
                return ControlFlow::Break(());
            };
            match writer.sync() {
                Ok(()) => tracing::trace!(generation, bytes = writer.len(), "WAL synced"),
                Err(e) => tracing::error!(generation, error = %e, "WAL sync failed"),
            }
            ControlFlow::Continue(())
        },
    )
}
