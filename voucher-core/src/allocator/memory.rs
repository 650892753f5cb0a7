//! In-process slot counter store.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{AcquireOutcome, AllocatorError, SlotAllocator};
use crate::domain::SimulationId;

/// Slot store backed by per-simulation atomic counters.
///
/// Mirrors the network store's primitives: each decrement and each
/// compensating increment is a single atomic operation, so concurrent
/// callers observe the same semantics as against a shared Redis key.
#[derive(Debug, Default)]
pub struct InMemorySlotStore {
    counters: RwLock<HashMap<SimulationId, Arc<AtomicI64>>>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live counters.
    pub fn counter_count(&self) -> usize {
        self.counters.read().len()
    }

    fn counter(&self, id: SimulationId) -> Result<Arc<AtomicI64>, AllocatorError> {
        self.counters
            .read()
            .get(&id)
            .cloned()
            .ok_or(AllocatorError::NotInitialized { id })
    }
}

/// Converts a slot amount to the signed counter domain.
fn as_delta(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl SlotAllocator for InMemorySlotStore {
    async fn init(&self, id: SimulationId, capacity: u64) -> Result<(), AllocatorError> {
        let mut counters = self.counters.write();
        match counters.entry(id) {
            Entry::Occupied(_) => Err(AllocatorError::AlreadyInitialized { id }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(AtomicI64::new(as_delta(capacity))));
                Ok(())
            }
        }
    }

    async fn try_acquire(
        &self,
        id: SimulationId,
        n: u64,
    ) -> Result<AcquireOutcome, AllocatorError> {
        let counter = self.counter(id)?;
        let delta = as_delta(n);

        let after = counter.fetch_sub(delta, Ordering::AcqRel).saturating_sub(delta);
        if after < 0 {
            counter.fetch_add(delta, Ordering::AcqRel);
            return Ok(AcquireOutcome::Denied);
        }

        Ok(AcquireOutcome::Granted)
    }

    async fn release(&self, id: SimulationId, n: u64) -> Result<(), AllocatorError> {
        self.counter(id)?.fetch_add(as_delta(n), Ordering::AcqRel);
        Ok(())
    }

    async fn remaining(&self, id: SimulationId) -> Result<Option<i64>, AllocatorError> {
        Ok(self
            .counters
            .read()
            .get(&id)
            .map(|counter| counter.load(Ordering::Acquire)))
    }

    async fn clear(&self, id: SimulationId) -> Result<(), AllocatorError> {
        self.counters.write().remove(&id);
        Ok(())
    }
}
