//! Memtable rotation
//!
//! The rotation monitor wakes up once per interval and:
//! - retries the flush of a retiring memtable whose previous flush failed
//! - otherwise, rotates the active memtable once its record count exceeds the
//!   configured threshold
//!
//! A rotation swaps a fresh memtable into the active slot under the exclusive
//! slot lock (O(1)), then flushes the retired one with no slot lock held, and
//! finally clears the retiring slot. Rotations are serialized by
//! `DbInner::rotation_lock`, and a retiring memtable that has not been
//! flushed blocks the next rotation.

use std::ops::ControlFlow;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::{DriftError, Result};
use crate::memtable::Memtable;
use crate::storage::SSTable;
use crate::task::PeriodicTask;

use super::{DbInner, Health};

/// Start the rotation monitor for a store
pub(super) fn spawn_monitor(inner: Arc<DbInner>) -> Result<PeriodicTask> {
    let interval = inner.config.rotation_check_interval;
    PeriodicTask::spawn("driftkv-rotation".to_string(), interval, move || {
        if let Err(e) = inner.rotate(false) {
            tracing::error!(error = %e, "rotation failed");
        }
        ControlFlow::Continue(())
    })
}

impl DbInner {
    /// Rotate the active memtable and flush it
    ///
    /// Without `force`, only rotates once the record count exceeds the
    /// threshold. Returns the new sorted file, or `None` if nothing rotated.
    pub(super) fn rotate(&self, force: bool) -> Result<Option<SSTable>> {
        let _rotation = self.rotation_lock.lock();

        let pending = self.slots.read().retiring.clone();
        if let Some(pending) = pending {
            self.complete_retirement(&pending)?;
        }

        match self.retire_active(force)? {
            Some(retired) => self.complete_retirement(&retired).map(Some),
            None => Ok(None),
        }
    }

    /// Swap a fresh memtable into the active slot; caller holds `rotation_lock`
    pub(super) fn retire_active(&self, force: bool) -> Result<Option<Arc<Memtable>>> {
        let (next_generation, records) = {
            let slots = self.slots.read();
            debug_assert!(slots.retiring.is_none());
            (slots.generation + 1, slots.active.record_count())
        };

        let due = if force {
            records > 0
        } else {
            records > self.config.rotation_threshold
        };
        if !due {
            return Ok(None);
        }

        let fresh = Arc::new(Memtable::create(&self.dir, next_generation, &self.config)?);

        let retired = {
            let mut slots = self.slots.write();
            slots.generation = next_generation;
            let retired = std::mem::replace(&mut slots.active, fresh);
            slots.retiring = Some(Arc::clone(&retired));
            retired
        };
        self.rotations.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            retired = retired.generation(),
            active = next_generation,
            records,
            "rotated memtable"
        );
        Ok(Some(retired))
    }

    /// Flush a retiring memtable and release it from the retiring slot
    ///
    /// On failure the memtable stays in the slot (and readable), the store is
    /// marked degraded, and the next monitor tick retries.
    pub(super) fn complete_retirement(&self, memtable: &Arc<Memtable>) -> Result<SSTable> {
        let generation = memtable.generation();

        match memtable.finalize() {
            Ok(sstable) => {
                {
                    let mut slots = self.slots.write();
                    if slots
                        .retiring
                        .as_ref()
                        .is_some_and(|retiring| Arc::ptr_eq(retiring, memtable))
                    {
                        slots.retiring = None;
                    }
                }
                let mut health = self.health.lock();
                if *health != Health::Healthy {
                    tracing::info!(generation, "flush recovered, store healthy again");
                    *health = Health::Healthy;
                }
                Ok(sstable)
            }
            Err(e) => {
                tracing::error!(
                    generation,
                    error = %e,
                    "flush failed; generation stays readable and will be retried"
                );
                *self.health.lock() = Health::Degraded { generation };
                Err(DriftError::Flush {
                    generation,
                    reason: e.to_string(),
                })
            }
        }
    }
}
